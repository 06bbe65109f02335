//! HTTP inbound adapter exposing the data API and health probes.

pub mod api;
pub mod documentation;
pub mod error;
pub mod formats;
pub mod health;
pub mod state;

pub use error::ApiResult;
