//! Backend entry-point: loads settings and the lexicon, wires adapters and
//! serves the data API.

mod server;

use std::sync::Arc;

use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use sdca_backend::inbound::http::health::HealthState;
use sdca_backend::outbound::calculator::ProcessCalculatorConfig;
use sdca_backend::outbound::persistence::{DbPool, PoolConfig};
use sdca_backend::settings::AppSettings;
use sdca_scheme::InterventionLexicon;
use server::{ServerConfig, create_server};

/// Translate loaded settings into a server configuration, connecting the
/// database pool when one is configured.
async fn server_config(settings: &AppSettings) -> std::io::Result<ServerConfig> {
    let lexicon_path = settings.lexicon_path();
    let lexicon = InterventionLexicon::from_file(&lexicon_path).map_err(|err| {
        std::io::Error::other(format!(
            "failed to load lexicon at {}: {err}",
            lexicon_path.display()
        ))
    })?;
    info!(path = %lexicon_path.display(), entries = lexicon.len(), "lexicon loaded");

    let buffer_policy = settings.buffer_policy().map_err(std::io::Error::other)?;
    let mut config = ServerConfig::new(settings.bind_addr(), Arc::new(lexicon))
        .with_buffer_policy(buffer_policy)
        .with_rasters(settings.rasters());

    if let Some(url) = settings.database_url.as_deref() {
        let pool_config = PoolConfig::new(url)
            .with_max_size(settings.pool_max_size())
            .with_statement_timeout(Some(settings.statement_timeout()));
        let pool = DbPool::new(pool_config)
            .await
            .map_err(|err| std::io::Error::other(format!("database pool: {err}")))?;
        config = config.with_db_pool(pool);
    }

    if let Some(program) = settings.calculator_program.clone() {
        config = config.with_calculator(
            ProcessCalculatorConfig::new(program)
                .with_args(settings.calculator_args())
                .with_timeout(settings.calculator_timeout())
                .with_limits(settings.max_payload_bytes(), settings.max_output_bytes()),
        );
    }

    Ok(config)
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load_from_iter(std::env::args_os())
        .map_err(|err| std::io::Error::other(format!("configuration: {err}")))?;
    let config = server_config(&settings).await?;
    info!(bind_addr = %config.bind_addr(), "starting server");

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, config)?;
    server.await
}

#[cfg(test)]
mod tests;
