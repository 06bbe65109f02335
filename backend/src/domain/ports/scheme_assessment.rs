//! Driving port for the assessment pipeline.
//!
//! Inbound adapters validate a request, then call one of these operations.
//! Every operation either completes or fails with a domain [`Error`]; no
//! partial result is ever returned.

use async_trait::async_trait;

use crate::domain::{
    Bbox, CalculationResult, Error, MaterialSiteDistance, Row, Scheme, TableSet,
};

/// Operations offered by the assessment service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SchemeAssessment: Send + Sync {
    /// Runs the full calculation for `scheme`.
    async fn calculate(&self, scheme: &Scheme) -> Result<CalculationResult, Error>;

    /// Desire lines near `scheme`, as rows with a `geometry` column.
    async fn desire_lines(&self, scheme: &Scheme) -> Result<Vec<Row>, Error>;

    /// Nearest site of each material type to the centre of `scheme`.
    async fn material_sites(&self, scheme: &Scheme) -> Result<Vec<MaterialSiteDistance>, Error>;

    /// Carbon zones inside `bbox`.
    async fn locations(&self, bbox: &Bbox, tables: TableSet) -> Result<Vec<Row>, Error>;
}
