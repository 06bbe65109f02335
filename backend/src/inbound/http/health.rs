//! Readiness and liveness probes.
//!
//! The server can run against fixture adapters when no database or
//! calculator is configured, which is easy to miss from outside. The
//! readiness body therefore names the adapter behind each driven port, so a
//! deployment probe can tell a real assessment service from a demo one.

use std::sync::OnceLock;

use actix_web::{HttpResponse, get, http::header, web};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

/// Which implementation serves a driven port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    /// External infrastructure (PostGIS, the calculator process).
    Live,
    /// Built-in fixture returning canned data.
    Fixture,
}

impl AdapterKind {
    /// `Live` when the infrastructure is configured.
    pub const fn from_configured(configured: bool) -> Self {
        if configured { Self::Live } else { Self::Fixture }
    }
}

/// Adapters wired at startup, reported by the readiness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdapterReport {
    /// Reference tables and spatial layers.
    pub reference_data: AdapterKind,
    /// Carbon calculator.
    pub calculator: AdapterKind,
}

/// Readiness state shared between the bootstrap and the probes.
#[derive(Debug, Default)]
pub struct HealthState {
    adapters: OnceLock<AdapterReport>,
}

impl HealthState {
    /// Not ready until [`HealthState::mark_ready`] runs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the wired adapters. Later calls are ignored.
    pub fn mark_ready(&self, adapters: AdapterReport) {
        if self.adapters.set(adapters).is_err() {
            warn!("readiness already recorded; keeping the first adapter report");
        }
    }

    /// Whether the server has finished wiring.
    pub fn is_ready(&self) -> bool {
        self.adapters.get().is_some()
    }

    /// Adapters recorded at startup.
    pub fn adapters(&self) -> Option<AdapterReport> {
        self.adapters.get().copied()
    }
}

fn no_store(mut response: actix_web::HttpResponseBuilder) -> actix_web::HttpResponseBuilder {
    response.insert_header((header::CACHE_CONTROL, "no-store"));
    response
}

/// Readiness probe: 200 with the adapter report once wired, 503 before.
#[utoipa::path(
    get,
    path = "/health/ready",
    tags = ["health"],
    responses(
        (status = 200, description = "Server is ready", body = AdapterReport),
        (status = 503, description = "Server is still starting")
    )
)]
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    match state.adapters() {
        Some(report) => no_store(HttpResponse::Ok()).json(report),
        None => no_store(HttpResponse::ServiceUnavailable()).finish(),
    }
}

/// Liveness probe: 200 whenever the process answers.
#[utoipa::path(
    get,
    path = "/health/live",
    tags = ["health"],
    responses((status = 200, description = "Server is alive"))
)]
#[get("/health/live")]
pub async fn live() -> HttpResponse {
    no_store(HttpResponse::Ok()).finish()
}
