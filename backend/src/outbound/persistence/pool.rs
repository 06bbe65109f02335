//! Connection pool for the reference database.
//!
//! The assessment only reads: reference tables and spatial layers are loaded
//! out of band. Every pooled session is therefore opened read-only, and
//! carries a statement timeout so PostGIS cancels a runaway buffer or
//! intersection query instead of pinning a connection. Both settings travel
//! as libpq startup options on the connection URL.

use std::time::Duration;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use tracing::info;

const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(30);

/// Pool failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// No connection became available in time.
    #[error("failed to get connection from pool: {message}")]
    Checkout {
        /// Underlying failure.
        message: String,
    },

    /// The pool could not be created.
    #[error("failed to build connection pool: {message}")]
    Build {
        /// Underlying failure.
        message: String,
    },
}

impl PoolError {
    /// Checkout failure.
    pub fn checkout(message: impl Into<String>) -> Self {
        Self::Checkout {
            message: message.into(),
        }
    }

    /// Build failure.
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }
}

/// Database location and session limits.
///
/// ```
/// use std::time::Duration;
///
/// use sdca_backend::outbound::persistence::PoolConfig;
///
/// let config = PoolConfig::new("postgres://sdca@localhost/sdca")
///     .with_max_size(4)
///     .with_statement_timeout(Some(Duration::from_secs(5)));
/// assert!(config.connection_url().contains("statement_timeout%3D5000"));
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    database_url: String,
    max_size: u32,
    statement_timeout: Option<Duration>,
}

impl PoolConfig {
    /// Ten connections and a sixty second statement timeout.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_size: 10,
            statement_timeout: Some(Duration::from_secs(60)),
        }
    }

    /// Cap the number of open connections.
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    /// Per-statement limit; `None` keeps the server default.
    pub fn with_statement_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.statement_timeout = timeout;
        self
    }

    /// Database URL with the session options appended.
    pub fn connection_url(&self) -> String {
        let mut options = vec!["-c%20default_transaction_read_only%3Don".to_owned()];
        if let Some(timeout) = self.statement_timeout {
            options.push(format!(
                "-c%20statement_timeout%3D{}",
                timeout.as_millis()
            ));
        }
        let separator = if self.database_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{separator}options={}",
            self.database_url,
            options.join("%20")
        )
    }
}

/// Shared `bb8` pool of async Diesel connections.
#[derive(Clone, Debug)]
pub struct DbPool {
    inner: Pool<AsyncPgConnection>,
}

impl DbPool {
    /// Build the pool. Connections are opened lazily by `bb8`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Build`] when the URL is unusable or the first
    /// connection cannot be made.
    pub async fn new(config: PoolConfig) -> Result<Self, PoolError> {
        let manager =
            AsyncDieselConnectionManager::<AsyncPgConnection>::new(config.connection_url());
        let inner = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(CHECKOUT_TIMEOUT)
            .build(manager)
            .await
            .map_err(|err| PoolError::build(err.to_string()))?;
        info!(
            max_size = config.max_size,
            statement_timeout_ms = config.statement_timeout.map(|t| t.as_millis()),
            "reference database pool ready"
        );
        Ok(Self { inner })
    }

    /// Check out a connection.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Checkout`] when none frees up within thirty
    /// seconds.
    pub async fn get(&self) -> Result<PooledConnection<'_, AsyncPgConnection>, PoolError> {
        self.inner
            .get()
            .await
            .map_err(|err| PoolError::checkout(err.to_string()))
    }
}
