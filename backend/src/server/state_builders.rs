//! Builders choosing real or fixture adapters for the HTTP state.

use std::sync::Arc;

use actix_web::web;
use mockable::DefaultClock;
use tracing::info;

use sdca_backend::domain::SchemeAssessmentService;
use sdca_backend::domain::ports::{
    CarbonCalculator, FixtureCarbonCalculator, FixtureReferenceDataRepository,
    FixtureSpatialRepository, ReferenceDataRepository, SpatialRepository,
};
use sdca_backend::inbound::http::health::{AdapterKind, AdapterReport};
use sdca_backend::inbound::http::state::HttpState;
use sdca_backend::outbound::calculator::ProcessCalculator;
use sdca_backend::outbound::persistence::{
    DbPool, DieselReferenceDataRepository, PostgisSpatialRepository,
};

use super::ServerConfig;

type DataPorts = (
    Arc<dyn ReferenceDataRepository>,
    Arc<dyn SpatialRepository>,
);

/// Database-backed adapters when a pool is available, fixtures otherwise.
fn build_data_ports(pool: Option<&DbPool>) -> DataPorts {
    match pool {
        Some(pool) => (
            Arc::new(DieselReferenceDataRepository::new(pool.clone())),
            Arc::new(PostgisSpatialRepository::new(pool.clone())),
        ),
        None => {
            info!("no database configured; serving fixture reference data");
            (
                Arc::new(FixtureReferenceDataRepository),
                Arc::new(FixtureSpatialRepository),
            )
        }
    }
}

fn build_calculator(config: &ServerConfig) -> Arc<dyn CarbonCalculator> {
    match &config.calculator {
        Some(calculator) => Arc::new(ProcessCalculator::new(calculator.clone())),
        None => {
            info!("no calculator configured; serving fixture calculations");
            Arc::new(FixtureCarbonCalculator)
        }
    }
}

/// Which adapters [`build_http_state`] wires for `config`.
pub(crate) fn adapter_report(config: &ServerConfig) -> AdapterReport {
    AdapterReport {
        reference_data: AdapterKind::from_configured(config.db_pool.is_some()),
        calculator: AdapterKind::from_configured(config.calculator.is_some()),
    }
}

/// Assemble the assessment service and wrap it for handlers.
pub(crate) fn build_http_state(config: &ServerConfig) -> web::Data<HttpState> {
    let (reference_data, spatial) = build_data_ports(config.db_pool.as_ref());
    let service = SchemeAssessmentService::new(
        Arc::clone(&config.lexicon),
        reference_data,
        spatial,
        build_calculator(config),
    )
    .with_buffer_policy(config.buffer_policy)
    .with_rasters(config.rasters.clone());

    web::Data::new(HttpState::new(Arc::new(service), Arc::new(DefaultClock)))
}
