//! PostgreSQL/PostGIS persistence adapters using Diesel.
//!
//! This module provides the driven-port implementations for reference data
//! and spatial queries, backed by PostgreSQL via `diesel-async` and `bb8`
//! connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: repositories only translate between SQL rows and
//!   domain types. Buffer sizing and result normalisation live in the
//!   domain.
//! - **Opaque rows**: reference tables are read with `row_to_json`, so the
//!   calculator sees every column without schema changes here.
//! - **Bounded queries**: every pooled connection carries a statement
//!   timeout; PostGIS cancellations surface as resource exhaustion.
//!
//! # Example
//!
//! ```ignore
//! use sdca_backend::outbound::persistence::{DbPool, PoolConfig, PostgisSpatialRepository};
//!
//! let config = PoolConfig::new("postgres://localhost/sdca");
//! let pool = DbPool::new(config).await?;
//! let repo = PostgisSpatialRepository::new(pool);
//! ```

pub(crate) mod diesel_helpers;
mod diesel_reference_data_repository;
mod pool;
mod postgis_spatial_repository;

pub use diesel_reference_data_repository::DieselReferenceDataRepository;
pub use pool::{DbPool, PoolConfig, PoolError};
pub use postgis_spatial_repository::PostgisSpatialRepository;
