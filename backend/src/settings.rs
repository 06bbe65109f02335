//! Service configuration loaded via OrthoConfig.
//!
//! Values come from command-line flags, `SDCA_*` environment variables and
//! an optional configuration file. Every field is optional; accessors supply
//! the defaults so a bare start serves fixture data on port 8080.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{BufferPolicy, BufferPolicyError, RasterPaths};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_POOL_MAX_SIZE: u32 = 10;
const DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CALCULATOR_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_PAYLOAD_BYTES: usize = 8 * 1024 * 1024;
const DEFAULT_MAX_OUTPUT_BYTES: usize = 32 * 1024 * 1024;

fn default_lexicon_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join("lexicon")
        .join("interventions.json")
}

/// Service settings.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SDCA")]
pub struct AppSettings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<SocketAddr>,
    /// PostGIS connection string. Fixture adapters serve when absent.
    pub database_url: Option<String>,
    /// Maximum pooled database connections.
    pub pool_max_size: Option<u32>,
    /// Server-side statement timeout for spatial queries, in seconds.
    pub statement_timeout_secs: Option<u64>,
    /// Calculator executable. The fixture calculator serves when absent.
    pub calculator_program: Option<PathBuf>,
    /// Whitespace-separated arguments passed to the calculator.
    pub calculator_args: Option<String>,
    /// Seconds before a running calculation is killed.
    pub calculator_timeout_secs: Option<u64>,
    /// Largest payload written to the calculator, in bytes.
    pub max_payload_bytes: Option<usize>,
    /// Largest output accepted from the calculator, in bytes.
    pub max_output_bytes: Option<usize>,
    /// Intervention lexicon JSON file.
    pub lexicon_path: Option<PathBuf>,
    /// Digital elevation model raster.
    pub dem_path: Option<PathBuf>,
    /// Land cover raster.
    pub landcover_path: Option<PathBuf>,
    /// Bedrock geology raster.
    pub bedrock_path: Option<PathBuf>,
    /// Superficial deposits raster.
    pub superficial_path: Option<PathBuf>,
    /// Buffer degrees per kilometre of feature length.
    pub buffer_degrees_per_km: Option<f64>,
    /// Divisor applied to feature length before buffering.
    pub buffer_length_divisor: Option<f64>,
    /// Minimum scaled length used for buffering, in kilometres.
    pub buffer_minimum_km: Option<f64>,
}

impl AppSettings {
    /// Bind address, defaulting to all interfaces on port 8080.
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
            .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)))
    }

    /// Pool size.
    pub fn pool_max_size(&self) -> u32 {
        self.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE)
    }

    /// Statement timeout applied to every pooled connection.
    pub fn statement_timeout(&self) -> Duration {
        Duration::from_secs(
            self.statement_timeout_secs
                .unwrap_or(DEFAULT_STATEMENT_TIMEOUT_SECS),
        )
    }

    /// Calculator arguments split on whitespace.
    pub fn calculator_args(&self) -> Vec<String> {
        self.calculator_args
            .as_deref()
            .map(|args| args.split_whitespace().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    /// Calculator timeout.
    pub fn calculator_timeout(&self) -> Duration {
        Duration::from_secs(
            self.calculator_timeout_secs
                .unwrap_or(DEFAULT_CALCULATOR_TIMEOUT_SECS),
        )
    }

    /// Payload cap in bytes.
    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes.unwrap_or(DEFAULT_MAX_PAYLOAD_BYTES)
    }

    /// Output cap in bytes.
    pub fn max_output_bytes(&self) -> usize {
        self.max_output_bytes.unwrap_or(DEFAULT_MAX_OUTPUT_BYTES)
    }

    /// Lexicon path, defaulting to the bundled fixture.
    pub fn lexicon_path(&self) -> PathBuf {
        self.lexicon_path
            .clone()
            .unwrap_or_else(default_lexicon_path)
    }

    /// Raster datasets handed to the calculator.
    pub fn rasters(&self) -> RasterPaths {
        let or_default = |path: &Option<PathBuf>, name: &str| {
            path.clone()
                .unwrap_or_else(|| PathBuf::from("data").join(name))
        };
        RasterPaths {
            dem: or_default(&self.dem_path, "dem.tif"),
            landcover: or_default(&self.landcover_path, "landcover.tif"),
            bedrock: or_default(&self.bedrock_path, "bedrock.tif"),
            superficial: or_default(&self.superficial_path, "superficial.tif"),
        }
    }

    /// Buffer policy with any configured overrides.
    ///
    /// # Errors
    /// Returns [`BufferPolicyError`] when an override is not a positive
    /// finite number.
    pub fn buffer_policy(&self) -> Result<BufferPolicy, BufferPolicyError> {
        BufferPolicy::new(
            self.buffer_degrees_per_km
                .unwrap_or(BufferPolicy::DEFAULT_DEGREES_PER_KM),
            self.buffer_length_divisor
                .unwrap_or(BufferPolicy::DEFAULT_LENGTH_DIVISOR),
            self.buffer_minimum_km
                .unwrap_or(BufferPolicy::DEFAULT_MINIMUM_KM),
        )
    }
}
