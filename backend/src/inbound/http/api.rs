//! Data API handler.
//!
//! ```text
//! GET /api/v1/locations.json?bbox=-2.6404,51.4698,-2.5417,51.4926&zoom=15
//! GET /api/v1/calculate.json?geojson={"type":"FeatureCollection",...}
//! GET /api/v1/desirelines.csv?line=[[-2.6,51.4],[-2.5,51.5]]
//! GET /api/v1/documentation
//! ```
//!
//! Every call is validated in full before any port is touched.

use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, get, web};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;
use utoipa::IntoParams;

use crate::domain::{
    ApiAction, ApiFormat, ApiOperation, ApiRequest, Error, MaterialSiteDistance, RawParameters,
    Row, validate,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::documentation;
use crate::inbound::http::formats::{csv_response, geojson_response, json_response};
use crate::inbound::http::state::HttpState;

/// Query parameters accepted by every call. Which ones are required depends
/// on the call.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ApiQuery {
    /// Output format (`json`, `geojson`, `csv`); overrides the extension.
    pub format: Option<String>,
    /// Bounding box `w,s,e,n`.
    pub bbox: Option<String>,
    /// Map zoom level.
    pub zoom: Option<String>,
    /// Drawn scheme as a GeoJSON `FeatureCollection`.
    pub geojson: Option<String>,
    /// Legacy single-line scheme as a coordinate array.
    pub line: Option<String>,
    /// `1` selects the alternative zone tables.
    pub beta: Option<String>,
}

impl From<ApiQuery> for RawParameters {
    fn from(query: ApiQuery) -> Self {
        Self {
            format: query.format,
            bbox: query.bbox,
            zoom: query.zoom,
            geojson: query.geojson,
            line: query.line,
            beta: query.beta,
        }
    }
}

/// Runs one API call.
#[utoipa::path(
    get,
    path = "/api/v1/{call}",
    params(
        ("call" = String, Path, description = "Call name with optional format extension, e.g. `locations.json`"),
        ApiQuery
    ),
    responses(
        (status = 200, description = "Call result as JSON, GeoJSON, CSV or HTML"),
        (status = 400, description = "Invalid request", body = crate::inbound::http::error::ErrorBody),
        (status = 408, description = "Intervention too large", body = crate::inbound::http::error::ErrorBody),
        (status = 502, description = "Calculation failed", body = crate::inbound::http::error::ErrorBody),
        (status = 503, description = "Reference data unavailable", body = crate::inbound::http::error::ErrorBody),
        (status = 504, description = "Calculation timed out", body = crate::inbound::http::error::ErrorBody)
    ),
    tags = ["api"],
    operation_id = "apiCall"
)]
#[get("/{call}")]
pub async fn api_call(
    state: web::Data<HttpState>,
    call: web::Path<String>,
    query: web::Query<ApiQuery>,
) -> ApiResult<HttpResponse> {
    let params = RawParameters::from(query.into_inner());
    match validate(call.as_str(), &params)? {
        ApiRequest::Documentation => Ok(HttpResponse::Ok()
            .content_type(ContentType::html())
            .body(documentation::render())),
        ApiRequest::Data { format, operation } => run(&state, format, operation).await,
    }
}

/// Answers requests under the API scope that name no call, such as
/// `/api/v1/` or `/api/v1/.json`.
pub async fn unnamed_call(query: web::Query<ApiQuery>) -> ApiResult<HttpResponse> {
    let params = RawParameters::from(query.into_inner());
    validate("", &params)?;
    Err(Error::invalid_request("No API call was specified."))
}

async fn run(
    state: &HttpState,
    format: ApiFormat,
    operation: ApiOperation,
) -> ApiResult<HttpResponse> {
    let action = operation.action();
    debug!(action = action.name(), format = format.name(), "api call");
    match operation {
        ApiOperation::Calculate(scheme) => {
            let result = state.assessment.calculate(&scheme).await?;
            Ok(json_response(&result.into_value()))
        }
        ApiOperation::DesireLines(scheme) => {
            let rows = state.assessment.desire_lines(&scheme).await?;
            render_rows(state, action, format, rows)
        }
        ApiOperation::MaterialSites(scheme) => {
            let sites = state.assessment.material_sites(&scheme).await?;
            render_rows(state, action, format, material_rows(sites))
        }
        ApiOperation::Locations { viewport, tables } => {
            let rows = state.assessment.locations(&viewport.bbox, tables).await?;
            render_rows(state, action, format, rows)
        }
    }
}

fn render_rows(
    state: &HttpState,
    action: ApiAction,
    format: ApiFormat,
    rows: Vec<Row>,
) -> ApiResult<HttpResponse> {
    match format {
        ApiFormat::Json => Ok(json_response(&Value::Array(
            rows.into_iter().map(Value::Object).collect(),
        ))),
        ApiFormat::Geojson => geojson_response(action, &rows),
        ApiFormat::Csv => Ok(csv_response(action, &rows, &state.clock.local())),
    }
}

fn material_rows(sites: Vec<MaterialSiteDistance>) -> Vec<Row> {
    sites
        .into_iter()
        .map(|site| {
            let mut row = Map::new();
            row.insert("type".to_owned(), Value::String(site.material_type));
            row.insert("distance_km".to_owned(), Value::from(site.distance_km));
            row
        })
        .collect()
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
