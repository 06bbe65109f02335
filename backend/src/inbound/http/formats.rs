//! Response shaping for the data API.
//!
//! Handlers produce JSON values or row sets; this module renders them as
//! JSON, GeoJSON attachments or CSV attachments. Every data response allows
//! any origin.

use std::borrow::Cow;

use actix_web::HttpResponse;
use actix_web::http::header::{self, ContentDisposition, DispositionParam, DispositionType};
use chrono::{DateTime, TimeZone};
use serde_json::Value;

use crate::domain::{ApiAction, Error, Row, feature_collection};

/// Quotes `value` only when it contains a double quote, doubling the quotes.
///
/// Commas and line breaks are left as they are, so a value such as `a,b`
/// spills into the next column. Clients of the CSV downloads rely on this
/// exact output; see [`csv_escape_rfc4180`] for the strict variant.
///
/// # Examples
/// ```
/// use sdca_backend::inbound::http::formats::csv_escape;
///
/// assert_eq!(csv_escape(r#"He said "hi""#), r#""He said ""hi""""#);
/// assert_eq!(csv_escape("a,b"), "a,b");
/// ```
pub fn csv_escape(value: &str) -> Cow<'_, str> {
    if value.contains('"') {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// RFC 4180 quoting: also quotes values holding commas or line breaks.
pub fn csv_escape_rfc4180(value: &str) -> Cow<'_, str> {
    if value.contains(['"', ',', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn cell_text(value: Option<&Value>) -> Cow<'_, str> {
    match value {
        None | Some(Value::Null) => Cow::Borrowed(""),
        Some(Value::String(text)) => Cow::Borrowed(text.as_str()),
        Some(other) => Cow::Owned(other.to_string()),
    }
}

/// Renders rows as CSV: a header line from the first row's columns, then
/// one line per row, joined by `\n` without a trailing newline.
///
/// Rows are expected to share the first row's shape; a missing column
/// renders as an empty cell. No rows renders as an empty document.
///
/// # Examples
/// ```
/// use sdca_backend::domain::Row;
/// use sdca_backend::inbound::http::formats::to_csv;
/// use serde_json::json;
///
/// let row: Row = serde_json::from_value(json!({ "type": "steel", "distance_km": 3.5 }))
///     .expect("row");
/// assert_eq!(to_csv(&[row]), "type,distance_km\nsteel,3.5");
/// ```
pub fn to_csv(rows: &[Row]) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };
    let columns: Vec<&String> = first.keys().collect();
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        columns
            .iter()
            .map(|column| column.as_str())
            .collect::<Vec<_>>()
            .join(","),
    );
    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| csv_escape(&cell_text(row.get(column.as_str()))).into_owned())
            .collect();
        lines.push(cells.join(","));
    }
    lines.join("\n")
}

/// Name of a CSV download: `<action>_savedAt<YYYYMMDD-HHMMSS>.csv`.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use sdca_backend::domain::ApiAction;
/// use sdca_backend::inbound::http::formats::csv_filename;
///
/// let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 7).single().expect("time");
/// assert_eq!(
///     csv_filename(ApiAction::Locations, &at),
///     "locations_savedAt20240301-090507.csv"
/// );
/// ```
pub fn csv_filename<Tz>(action: ApiAction, saved_at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}_savedAt{}.csv",
        action.name(),
        saved_at.format("%Y%m%d-%H%M%S")
    )
}

fn attachment(filename: String) -> ContentDisposition {
    ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(filename)],
    }
}

/// JSON body with open CORS.
pub fn json_response(body: &Value) -> HttpResponse {
    HttpResponse::Ok()
        .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .json(body)
}

/// Row set as a GeoJSON `FeatureCollection` download named
/// `<action>.geojson`.
///
/// A geometry column that cannot be decoded is an internal error: the
/// database produced it, not the user.
pub fn geojson_response(action: ApiAction, rows: &[Row]) -> Result<HttpResponse, Error> {
    let collection = feature_collection(rows).map_err(|err| {
        tracing::error!(error = %err, action = action.name(), "row geometry unusable");
        Error::internal(err.to_string())
    })?;
    Ok(HttpResponse::Ok()
        .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .insert_header(attachment(format!("{}.geojson", action.name())))
        .json(collection))
}

/// Row set as a CSV download stamped with `saved_at`.
pub fn csv_response<Tz>(action: ApiAction, rows: &[Row], saved_at: &DateTime<Tz>) -> HttpResponse
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    HttpResponse::Ok()
        .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .content_type("application/octet-stream")
        .insert_header(attachment(csv_filename(action, saved_at)))
        .body(to_csv(rows))
}

#[cfg(test)]
mod tests {
    use actix_web::body::to_bytes;
    use chrono::Utc;
    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;

    fn row(value: Value) -> Row {
        serde_json::from_value(value).expect("row object")
    }

    #[fixture]
    fn desire_lines() -> Vec<Row> {
        vec![
            row(json!({
                "from": "E02003043",
                "to": "E02003044",
                "cycle": 12,
                "geometry": "{\"type\":\"LineString\",\"coordinates\":[[-2.6,51.4],[-2.5,51.5]]}"
            })),
            row(json!({
                "from": "E02003045",
                "to": "E02003046",
                "cycle": null,
                "geometry": "{\"type\":\"LineString\",\"coordinates\":[[-2.4,51.4],[-2.3,51.5]]}"
            })),
        ]
    }

    #[rstest]
    #[case(r#"He said "hi""#, r#""He said ""hi""""#)]
    #[case("plain", "plain")]
    #[case("a,b", "a,b")]
    #[case("line\nbreak", "line\nbreak")]
    fn csv_escape_quotes_only_on_double_quote(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(csv_escape(input), expected);
    }

    #[rstest]
    #[case(r#"He said "hi""#, r#""He said ""hi""""#)]
    #[case("a,b", "\"a,b\"")]
    #[case("line\nbreak", "\"line\nbreak\"")]
    #[case("plain", "plain")]
    fn rfc4180_escape_quotes_separators(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(csv_escape_rfc4180(input), expected);
    }

    #[rstest]
    fn csv_header_follows_first_row(desire_lines: Vec<Row>) {
        let csv = to_csv(&desire_lines);
        let mut lines = csv.lines();

        assert_eq!(lines.next(), Some("from,to,cycle,geometry"));
        assert!(lines.next().is_some_and(|line| line.starts_with("E02003043,E02003044,12,")));
        assert!(lines.next().is_some_and(|line| line.starts_with("E02003045,E02003046,,")));
        assert!(!csv.ends_with('\n'));
    }

    #[rstest]
    fn csv_quotes_geometry_text(desire_lines: Vec<Row>) {
        let csv = to_csv(&desire_lines[..1]);

        assert!(csv.contains(r#","{""type"":""LineString"","#), "{csv}");
    }

    #[rstest]
    fn empty_row_set_is_empty_csv() {
        assert_eq!(to_csv(&[]), "");
    }

    #[rstest]
    #[actix_web::test]
    async fn csv_response_is_a_stamped_attachment(desire_lines: Vec<Row>) {
        let saved_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().expect("time");

        let response = csv_response(ApiAction::DesireLines, &desire_lines, &saved_at);

        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .expect("disposition");
        assert_eq!(
            disposition,
            "attachment; filename=\"desirelines_savedAt20240301-120000.csv\""
        );
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("application/octet-stream")
        );
        let body = to_bytes(response.into_body()).await.expect("body");
        assert!(body.starts_with(b"from,to,cycle,geometry\n"));
    }

    #[rstest]
    #[actix_web::test]
    async fn geojson_response_lifts_geometry(desire_lines: Vec<Row>) {
        let response =
            geojson_response(ApiAction::DesireLines, &desire_lines).expect("valid geometry");

        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
        assert!(
            response
                .headers()
                .get(header::CONTENT_DISPOSITION)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.contains("desirelines.geojson"))
        );
        let body = to_bytes(response.into_body()).await.expect("body");
        let value: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(value["features"][0]["geometry"]["type"], "LineString");
        assert_eq!(value["features"][0]["properties"]["from"], "E02003043");
        assert!(value["features"][0]["properties"].get("geometry").is_none());
    }

    #[rstest]
    fn broken_geometry_is_internal() {
        let rows = vec![row(json!({ "geometry": "{not json" }))];

        let error = geojson_response(ApiAction::Locations, &rows).expect_err("rejected");

        assert_eq!(error.code(), crate::domain::ErrorCode::InternalError);
    }
}
