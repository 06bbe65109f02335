//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::sync::Arc;

use sdca_backend::domain::{BufferPolicy, RasterPaths};
use sdca_backend::outbound::calculator::ProcessCalculatorConfig;
use sdca_backend::outbound::persistence::DbPool;
use sdca_scheme::InterventionLexicon;

/// Builder-style configuration for creating the HTTP server.
#[derive(Debug)]
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) lexicon: Arc<InterventionLexicon>,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) calculator: Option<ProcessCalculatorConfig>,
    pub(crate) buffer_policy: BufferPolicy,
    pub(crate) rasters: RasterPaths,
}

impl ServerConfig {
    /// Construct a server configuration serving fixture data.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, lexicon: Arc<InterventionLexicon>) -> Self {
        Self {
            bind_addr,
            lexicon,
            db_pool: None,
            calculator: None,
            buffer_policy: BufferPolicy::default(),
            rasters: RasterPaths::default(),
        }
    }

    /// Attach a database connection pool for the PostGIS adapters.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// Run calculations in the configured external program.
    #[must_use]
    pub fn with_calculator(mut self, calculator: ProcessCalculatorConfig) -> Self {
        self.calculator = Some(calculator);
        self
    }

    /// Override the desire-line buffer policy.
    #[must_use]
    pub fn with_buffer_policy(mut self, policy: BufferPolicy) -> Self {
        self.buffer_policy = policy;
        self
    }

    /// Set the raster datasets handed to the calculator.
    #[must_use]
    pub fn with_rasters(mut self, rasters: RasterPaths) -> Self {
        self.rasters = rasters;
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
