//! HTTP server assembly: routes, middleware and shared state.

mod config;
mod state_builders;

pub use config::ServerConfig;

pub(crate) use state_builders::{adapter_report, build_http_state};

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use tracing::info;

use sdca_backend::Trace;
#[cfg(debug_assertions)]
use sdca_backend::doc::ApiDoc;
use sdca_backend::inbound::http::api::{api_call, unnamed_call};
use sdca_backend::inbound::http::health::{HealthState, live, ready};
use sdca_backend::inbound::http::state::HttpState;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

/// Path prefix of the data API.
pub(crate) const API_PREFIX: &str = "/api/v1";

/// State shared by every worker.
#[derive(Clone)]
pub(crate) struct AppDependencies {
    pub(crate) health_state: web::Data<HealthState>,
    pub(crate) http_state: web::Data<HttpState>,
}

/// Registers the data API under [`API_PREFIX`]. Paths in the scope that
/// name no call still get a JSON validation error.
fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope(API_PREFIX)
            .service(api_call)
            .default_service(web::to(unnamed_call)),
    );
}

pub(crate) fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let app = App::new()
        .app_data(deps.health_state)
        .app_data(deps.http_state)
        .wrap(Trace)
        .configure(api_routes)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Bind the server and mark it ready once the socket is open.
///
/// # Errors
/// Returns the bind failure.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let deps = AppDependencies {
        health_state: health_state.clone(),
        http_state: build_http_state(&config),
    };

    let server = HttpServer::new(move || build_app(deps.clone()))
        .bind(config.bind_addr)?
        .run();

    let adapters = adapter_report(&config);
    info!(
        bind_addr = %config.bind_addr,
        api = API_PREFIX,
        reference_data = ?adapters.reference_data,
        calculator = ?adapters.calculator,
        "listening"
    );
    health_state.mark_ready(adapters);
    Ok(server)
}
