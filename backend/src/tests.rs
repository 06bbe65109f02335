//! Tests for the backend bootstrap, covering adapter selection and
//! readiness signalling.

use std::ffi::OsString;
use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::{http::StatusCode, test, web};
use env_lock::lock_env;
use ortho_config::OrthoConfig;
use rstest::{fixture, rstest};

use super::server::{AppDependencies, ServerConfig, build_app, build_http_state, create_server};
use super::server_config;
use sdca_backend::inbound::http::health::{AdapterKind, AdapterReport, HealthState};
use sdca_backend::settings::AppSettings;
use sdca_scheme::InterventionLexicon;

const LEXICON: &str = r#"[{
    "infrastructure_type": "Rail",
    "mode_class": "Rail",
    "mode": "High speed rail",
    "intervention_class": "New build",
    "intervention_name": "High speed line",
    "intervention": "hsr_line"
}]"#;

#[fixture]
fn health_state() -> web::Data<HealthState> {
    web::Data::new(HealthState::new())
}

#[fixture]
fn config() -> ServerConfig {
    let lexicon = InterventionLexicon::from_json(LEXICON).expect("lexicon");
    let bind_addr: SocketAddr = "127.0.0.1:0".parse().expect("socket address");
    ServerConfig::new(bind_addr, Arc::new(lexicon))
}

#[rstest]
#[actix_rt::test]
async fn create_server_marks_ready(health_state: web::Data<HealthState>, config: ServerConfig) {
    assert!(!health_state.is_ready(), "state should start unready");

    let _server = create_server(health_state.clone(), config).expect("server should build");

    assert_eq!(
        health_state.adapters(),
        Some(AdapterReport {
            reference_data: AdapterKind::Fixture,
            calculator: AdapterKind::Fixture,
        }),
        "server creation should mark readiness with the fixture adapters"
    );
}

#[rstest]
#[actix_rt::test]
async fn fixture_wiring_serves_calculations(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) {
    let app = test::init_service(build_app(AppDependencies {
        health_state,
        http_state: build_http_state(&config),
    }))
    .await;
    let scheme = "%7B%22type%22%3A%22FeatureCollection%22%2C%22features%22%3A%5B%7B%22_interventionTypeIndex%22%3A0%2C%22type%22%3A%22Feature%22%2C%22properties%22%3A%7B%22intervention%22%3A%22hsr_line%22%7D%2C%22geometry%22%3A%7B%22type%22%3A%22LineString%22%2C%22coordinates%22%3A%5B%5B-2.6%2C51.45%5D%2C%5B-2.55%2C51.47%5D%5D%7D%7D%5D%7D";
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/calculate.json?geojson={scheme}"))
        .to_request();

    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("trace-id"));
    let body: serde_json::Value = test::read_body_json(res).await;
    assert!(body.get("pas2080").is_some());
}

#[rstest]
#[actix_rt::test]
async fn unnamed_calls_get_a_json_error(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) {
    let app = test::init_service(build_app(AppDependencies {
        health_state,
        http_state: build_http_state(&config),
    }))
    .await;
    let req = test::TestRequest::get()
        .uri("/api/v1/?format=json")
        .to_request();

    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "No API call was specified.");
}

#[rstest]
#[actix_rt::test]
async fn settings_without_database_use_fixtures() {
    let lexicon = tempfile::NamedTempFile::new().expect("temp file");
    std::fs::write(lexicon.path(), LEXICON).expect("write lexicon");
    let _guard = lock_env([
        ("SDCA_DATABASE_URL", None::<String>),
        ("SDCA_CALCULATOR_PROGRAM", None),
        ("SDCA_BIND_ADDR", Some("127.0.0.1:9100".to_owned())),
        ("SDCA_LEXICON_PATH", Some(lexicon.path().display().to_string())),
    ]);
    let settings =
        AppSettings::load_from_iter([OsString::from("sdca-backend")]).expect("settings");

    let config = server_config(&settings).await.expect("config");

    assert_eq!(config.bind_addr().port(), 9100);
    assert!(config.db_pool.is_none());
    assert!(config.calculator.is_none());
}

#[rstest]
#[actix_rt::test]
async fn missing_lexicon_is_a_startup_error() {
    let _guard = lock_env([
        ("SDCA_DATABASE_URL", None::<String>),
        ("SDCA_LEXICON_PATH", Some("/nonexistent/interventions.json".to_owned())),
    ]);
    let settings =
        AppSettings::load_from_iter([OsString::from("sdca-backend")]).expect("settings");

    let error = server_config(&settings).await.expect_err("lexicon missing");

    assert!(error.to_string().contains("failed to load lexicon"));
}
