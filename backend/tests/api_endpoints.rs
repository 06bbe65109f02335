//! End-to-end tests for the data API: HTTP validation, the assessment
//! pipeline and a real child-process calculator that echoes its payload.

use std::sync::Arc;
use std::time::Duration;

use actix_http::Request;
use actix_web::{
    App,
    body::BoxBody,
    dev::{Service, ServiceResponse},
    http::{StatusCode, header},
    test, web,
};
use async_trait::async_trait;
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use sdca_backend::Trace;
use sdca_backend::domain::ports::{
    FixtureReferenceDataRepository, SchemeAssessment, SpatialRepository, SpatialRepositoryError,
};
use sdca_backend::domain::{
    Bbox, FeatureBuffer, MaterialSiteDistance, RasterPaths, Row, SchemeAssessmentService,
    TableSet,
};
use sdca_backend::inbound::http::api::api_call;
use sdca_backend::inbound::http::state::HttpState;
use sdca_backend::outbound::calculator::{ProcessCalculator, ProcessCalculatorConfig};
use sdca_scheme::InterventionLexicon;
use serde_json::{Value, json};

const LEXICON: &str = r#"[{
    "infrastructure_type": "Rail",
    "mode_class": "Rail",
    "mode": "High speed rail",
    "intervention_class": "New build",
    "intervention_name": "High speed line",
    "intervention": "hsr_line",
    "geometry": "line"
}]"#;

const SCHEME: &str = "%7B%22type%22%3A%22FeatureCollection%22%2C%22features%22%3A%5B%7B%22_interventionTypeIndex%22%3A0%2C%22type%22%3A%22Feature%22%2C%22properties%22%3A%7B%22intervention%22%3A%22hsr_line%22%7D%2C%22geometry%22%3A%7B%22type%22%3A%22LineString%22%2C%22coordinates%22%3A%5B%5B-2.6%2C51.45%5D%2C%5B-2.55%2C51.47%5D%5D%7D%7D%5D%7D";

/// Reference layers holding one desire line, two material sites and one
/// zone.
struct StubLayers;

#[async_trait]
impl SpatialRepository for StubLayers {
    async fn desire_lines_near(
        &self,
        buffers: &[FeatureBuffer],
    ) -> Result<Vec<Row>, SpatialRepositoryError> {
        assert_eq!(buffers.len(), 1, "one buffer per drawn feature");
        Ok(vec![row(json!({
            "from": "E02003012",
            "to": "E02003043",
            "cycle": 12,
            "geometry": "{\"type\":\"LineString\",\"coordinates\":[[-2.59,51.45],[-2.56,51.46]]}"
        }))])
    }

    async fn material_site_distances(
        &self,
        _geometries: &[Value],
    ) -> Result<Vec<MaterialSiteDistance>, SpatialRepositoryError> {
        Ok(vec![
            MaterialSiteDistance {
                material_type: "steel".into(),
                distance_km: 41.2,
            },
            MaterialSiteDistance {
                material_type: "cement".into(),
                distance_km: 18.7,
            },
        ])
    }

    async fn zones_in_view(
        &self,
        _bbox: &Bbox,
        tables: TableSet,
    ) -> Result<Vec<Row>, SpatialRepositoryError> {
        Ok(vec![row(json!({
            "zone": tables.prefix(),
            "geometry": "{\"type\":\"Point\",\"coordinates\":[-2.6,51.47]}"
        }))])
    }
}

fn row(value: Value) -> Row {
    serde_json::from_value(value).expect("row object")
}

#[fixture]
fn state() -> HttpState {
    let lexicon = InterventionLexicon::from_json(LEXICON).expect("lexicon");
    let calculator = ProcessCalculator::new(
        ProcessCalculatorConfig::new("/bin/sh")
            .with_args(vec!["-c".to_owned(), "cat".to_owned()])
            .with_timeout(Duration::from_secs(10)),
    );
    let rasters = RasterPaths {
        dem: "/data/dem.tif".into(),
        ..RasterPaths::default()
    };
    let assessment: Arc<dyn SchemeAssessment> = Arc::new(
        SchemeAssessmentService::new(
            Arc::new(lexicon),
            Arc::new(FixtureReferenceDataRepository),
            Arc::new(StubLayers),
            Arc::new(calculator),
        )
        .with_rasters(rasters),
    );
    HttpState::new(assessment, Arc::new(DefaultClock))
}

async fn init_app(
    state: HttpState,
) -> impl Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error> {
    test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .wrap(Trace)
            .service(web::scope("/api/v1").service(api_call)),
    )
    .await
}

#[rstest]
#[actix_web::test]
async fn calculation_payload_reaches_the_calculator(state: HttpState) {
    let app = init_app(state).await;
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/calculate.json?geojson={SCHEME}"))
        .to_request();

    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::OK);
    let echoed: Value = test::read_body_json(res).await;
    assert_eq!(echoed["user_input"]["features"][0]["_interventionTypeIndex"], 0);
    assert_eq!(echoed["desire_lines"]["type"], "FeatureCollection");
    assert_eq!(
        echoed["desire_lines"]["features"][0]["properties"]["from"],
        "E02003012"
    );
    assert_eq!(
        echoed["material_sites"],
        json!([
            { "type": "cement", "distance_km": 18.7 },
            { "type": "steel", "distance_km": 41.2 }
        ])
    );
    assert_eq!(echoed["path_dem"], "/data/dem.tif");
    assert_eq!(echoed["assets"], json!([]));
}

#[rstest]
#[actix_web::test]
async fn desire_lines_download_as_csv(state: HttpState) {
    let app = init_app(state).await;
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/desirelines.csv?geojson={SCHEME}"))
        .to_request();

    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::OK);
    let disposition = res
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .expect("attachment header")
        .to_owned();
    assert!(disposition.contains("desirelines_savedAt"), "{disposition}");
    let body = test::read_body(res).await;
    let text = std::str::from_utf8(&body).expect("utf8");
    assert!(text.starts_with("from,to,cycle,geometry\nE02003012,E02003043,12,"));
}

#[rstest]
#[case("/api/v1/locations.geojson?bbox=-2.64,51.46,-2.54,51.49&zoom=15", "")]
#[case("/api/v1/locations.geojson?bbox=-2.64,51.46,-2.54,51.49&zoom=15&beta=1", "alt_")]
#[actix_web::test]
async fn locations_choose_the_zone_tables(
    state: HttpState,
    #[case] uri: &str,
    #[case] prefix: &str,
) {
    let app = init_app(state).await;

    let res = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["features"][0]["properties"]["zone"], prefix);
    assert_eq!(body["features"][0]["geometry"]["type"], "Point");
}

#[rstest]
#[actix_web::test]
async fn unknown_intervention_type_is_rejected_with_a_trace_id(state: HttpState) {
    let app = init_app(state).await;
    let scheme = SCHEME.replace("Index%22%3A0", "Index%22%3A9");
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/calculate.json?geojson={scheme}"))
        .to_request();

    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let trace_header = res
        .headers()
        .get("trace-id")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .expect("trace id header");
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["code"], "invalid_request");
    assert_eq!(body["traceId"], trace_header);
}
