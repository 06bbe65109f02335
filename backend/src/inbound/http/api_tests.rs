//! Handler tests for the data API.

use std::sync::Arc;

use actix_web::http::{StatusCode, header};
use actix_web::{App, test};
use chrono::{Local, TimeZone};
use mockable::MockClock;
use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::domain::ports::MockSchemeAssessment;
use crate::domain::{CalculationResult, Error, TableSet};

const LINE: &str = "%5B%5B-2.6%2C51.4%5D%2C%5B-2.5%2C51.5%5D%5D";
const SCHEME: &str = "%7B%22type%22%3A%22FeatureCollection%22%2C%22features%22%3A%5B%7B%22_interventionTypeIndex%22%3A0%2C%22type%22%3A%22Feature%22%2C%22properties%22%3A%7B%22intervention%22%3A%22hsr_line%22%7D%2C%22geometry%22%3A%7B%22type%22%3A%22LineString%22%2C%22coordinates%22%3A%5B%5B-2.6%2C51.45%5D%2C%5B-2.55%2C51.47%5D%5D%7D%7D%5D%7D";

#[fixture]
fn clock() -> MockClock {
    let mut clock = MockClock::new();
    let saved_at = Local
        .with_ymd_and_hms(2024, 3, 1, 12, 30, 5)
        .single()
        .expect("unambiguous local time");
    clock.expect_local().return_const(saved_at);
    clock
}

fn zone_rows() -> Vec<Row> {
    vec![
        serde_json::from_value(json!({
            "lsoa11": "E01014485",
            "geometry": "{\"type\":\"Point\",\"coordinates\":[-2.6,51.47]}"
        }))
        .expect("row"),
    ]
}

async fn call(assessment: MockSchemeAssessment, clock: MockClock, uri: &str) -> TestResponse {
    let state = HttpState::new(Arc::new(assessment), Arc::new(clock));
    let app = test::init_service(
        App::new().app_data(web::Data::new(state)).service(
            web::scope("/api/v1")
                .service(api_call)
                .default_service(web::to(unnamed_call)),
        ),
    )
    .await;
    let res = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
    let status = res.status();
    let headers = res.headers().clone();
    let body = test::read_body(res).await;
    TestResponse {
        status,
        headers,
        body: String::from_utf8(body.to_vec()).expect("utf8 body"),
    }
}

struct TestResponse {
    status: StatusCode,
    headers: header::HeaderMap,
    body: String,
}

impl TestResponse {
    fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("json body")
    }
}

#[rstest]
#[actix_web::test]
async fn documentation_needs_no_ports(clock: MockClock) {
    let res = call(MockSchemeAssessment::new(), clock, "/api/v1/documentation").await;

    assert_eq!(res.status, StatusCode::OK);
    assert!(res.header(header::CONTENT_TYPE).is_some_and(|v| v.starts_with("text/html")));
    assert!(res.body.contains("SDCA API documentation"));
}

#[rstest]
#[actix_web::test]
async fn locations_json_passes_rows_through(clock: MockClock) {
    let mut assessment = MockSchemeAssessment::new();
    assessment
        .expect_locations()
        .withf(|bbox, tables| bbox.west == -2.6404 && *tables == TableSet::Standard)
        .times(1)
        .returning(|_, _| Ok(zone_rows()));

    let res = call(
        assessment,
        clock,
        "/api/v1/locations.json?bbox=-2.6404,51.4698,-2.5417,51.4926&zoom=15",
    )
    .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.header(header::ACCESS_CONTROL_ALLOW_ORIGIN), Some("*"));
    assert_eq!(res.json()[0]["lsoa11"], "E01014485");
}

#[rstest]
#[actix_web::test]
async fn beta_locations_as_csv_attachment(clock: MockClock) {
    let mut assessment = MockSchemeAssessment::new();
    assessment
        .expect_locations()
        .withf(|_, tables| *tables == TableSet::Beta)
        .times(1)
        .returning(|_, _| Ok(zone_rows()));

    let res = call(
        assessment,
        clock,
        "/api/v1/locations?format=csv&beta=1&bbox=-2.6404,51.4698,-2.5417,51.4926&zoom=15",
    )
    .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(
        res.header(header::CONTENT_DISPOSITION),
        Some("attachment; filename=\"locations_savedAt20240301-123005.csv\"")
    );
    assert!(res.body.starts_with("lsoa11,geometry\nE01014485,"));
}

#[rstest]
#[actix_web::test]
async fn desire_lines_as_geojson(clock: MockClock) {
    let mut assessment = MockSchemeAssessment::new();
    assessment
        .expect_desire_lines()
        .withf(|scheme| scheme.features().len() == 1)
        .times(1)
        .returning(|_| Ok(zone_rows()));

    let res = call(
        assessment,
        clock,
        &format!("/api/v1/desirelines.geojson?line={LINE}"),
    )
    .await;

    assert_eq!(res.status, StatusCode::OK);
    let body = res.json();
    assert_eq!(body["type"], "FeatureCollection");
    assert_eq!(body["features"][0]["geometry"]["type"], "Point");
}

#[rstest]
#[actix_web::test]
async fn material_sites_as_csv(clock: MockClock) {
    let mut assessment = MockSchemeAssessment::new();
    assessment.expect_material_sites().times(1).returning(|_| {
        Ok(vec![MaterialSiteDistance {
            material_type: "steel".into(),
            distance_km: 3.5,
        }])
    });

    let res = call(
        assessment,
        clock,
        &format!("/api/v1/materialsites.csv?geojson={SCHEME}"),
    )
    .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, "type,distance_km\nsteel,3.5");
}

#[rstest]
#[actix_web::test]
async fn calculate_returns_calculator_object(clock: MockClock) {
    let mut assessment = MockSchemeAssessment::new();
    assessment.expect_calculate().times(1).returning(|_| {
        CalculationResult::from_value(json!({ "payback_time": 7 }))
            .map_err(|err| Error::internal(err.to_string()))
    });

    let res = call(
        assessment,
        clock,
        &format!("/api/v1/calculate.json?geojson={SCHEME}"),
    )
    .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json(), json!({ "payback_time": 7 }));
}

#[rstest]
#[case("/api/v1/locations?bbox=1,2,3,4&zoom=1", "No API format was specified.")]
#[case("/api/v1/locations.xml?bbox=1,2,3,4&zoom=1", "An invalid API format was specified.")]
#[case("/api/v1/nothing.json", "An invalid API call was specified.")]
#[case("/api/v1/calculate.csv?line=%5B%5B0%2C0%5D%5D", "An invalid API format was specified.")]
#[case("/api/v1/locations.json?zoom=1", "No bbox was supplied.")]
#[case("/api/v1/locations.json?bbox=1,2,3&zoom=1", "An invalid bbox was supplied.")]
#[case("/api/v1/locations.json?bbox=1,2,3,4&zoom=near", "An invalid zoom was supplied.")]
#[case("/api/v1/desirelines.json", "No scheme was supplied.")]
#[case("/api/v1/.json", "No API call was specified.")]
#[case("/api/v1/?format=csv", "No API call was specified.")]
#[case("/api/v1/", "No API format was specified.")]
#[actix_web::test]
async fn invalid_requests_never_reach_the_service(
    clock: MockClock,
    #[case] uri: &str,
    #[case] message: &str,
) {
    let res = call(MockSchemeAssessment::new(), clock, uri).await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()["error"], message);
}

#[rstest]
#[case(Error::intervention_too_large("too large"), StatusCode::REQUEST_TIMEOUT)]
#[case(Error::service_unavailable("Unable to connect to the database."), StatusCode::SERVICE_UNAVAILABLE)]
#[case(Error::calculation_timeout("slow"), StatusCode::GATEWAY_TIMEOUT)]
#[actix_web::test]
async fn service_failures_keep_their_status(
    clock: MockClock,
    #[case] error: Error,
    #[case] status: StatusCode,
) {
    let mut assessment = MockSchemeAssessment::new();
    let message = error.message().to_owned();
    assessment
        .expect_calculate()
        .times(1)
        .returning(move |_| Err(error.clone()));

    let res = call(
        assessment,
        clock,
        &format!("/api/v1/calculate.json?geojson={SCHEME}"),
    )
    .await;

    assert_eq!(res.status, status);
    assert_eq!(res.json()["error"], message);
}
