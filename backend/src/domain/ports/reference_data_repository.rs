//! Driven port for the read-only reference tables behind enrichment.
//!
//! Each lookup is a plain membership filter on one table. Adapters return
//! whole rows as JSON objects so new columns reach the calculator without
//! code changes.

use async_trait::async_trait;

use crate::domain::Row;

use super::define_port_error;

define_port_error! {
    /// Errors raised when reading reference data.
    pub enum ReferenceDataRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "reference data connection failed: {message}",
        /// Query failed during execution or row conversion.
        Query { message: String } =>
            "reference data query failed: {message}",
    }
}

/// Port for the asset, component and carbon-factor tables.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReferenceDataRepository: Send + Sync {
    /// Assets whose `intervention` is one of `interventions`.
    async fn assets_for(
        &self,
        interventions: &[String],
    ) -> Result<Vec<Row>, ReferenceDataRepositoryError>;

    /// Asset parameter rows for `asset_ids`, duplicates included.
    async fn asset_parameters_for(
        &self,
        asset_ids: &[String],
    ) -> Result<Vec<Row>, ReferenceDataRepositoryError>;

    /// Components of `asset_ids`.
    async fn components_for(
        &self,
        asset_ids: &[String],
    ) -> Result<Vec<Row>, ReferenceDataRepositoryError>;

    /// Carbon factors named by `cf_names`.
    async fn carbon_factors_for(
        &self,
        cf_names: &[String],
    ) -> Result<Vec<Row>, ReferenceDataRepositoryError>;
}

/// Fixture implementation that knows no reference data.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureReferenceDataRepository;

#[async_trait]
impl ReferenceDataRepository for FixtureReferenceDataRepository {
    async fn assets_for(
        &self,
        _interventions: &[String],
    ) -> Result<Vec<Row>, ReferenceDataRepositoryError> {
        Ok(Vec::new())
    }

    async fn asset_parameters_for(
        &self,
        _asset_ids: &[String],
    ) -> Result<Vec<Row>, ReferenceDataRepositoryError> {
        Ok(Vec::new())
    }

    async fn components_for(
        &self,
        _asset_ids: &[String],
    ) -> Result<Vec<Row>, ReferenceDataRepositoryError> {
        Ok(Vec::new())
    }

    async fn carbon_factors_for(
        &self,
        _cf_names: &[String],
    ) -> Result<Vec<Row>, ReferenceDataRepositoryError> {
        Ok(Vec::new())
    }
}
