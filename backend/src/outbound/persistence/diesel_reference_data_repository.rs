//! PostgreSQL-backed `ReferenceDataRepository` implementation.
//!
//! Each lookup is a membership filter on one reference table. Keys are
//! compared as text so integer and text key columns behave the same.

use async_trait::async_trait;
use diesel::sql_types::{Array, Text};
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::domain::Row;
use crate::domain::ports::{ReferenceDataRepository, ReferenceDataRepositoryError};

use super::diesel_helpers::{JsonRow, into_rows, map_pool_error_message, map_reference_error};
use super::pool::DbPool;

const ASSETS_SQL: &str = "SELECT row_to_json(t) AS row FROM \
     (SELECT * FROM assets WHERE intervention = ANY($1)) t";
const ASSET_PARAMETERS_SQL: &str = "SELECT row_to_json(t) AS row FROM \
     (SELECT * FROM assets_parameters WHERE asset_id::text = ANY($1)) t";
const COMPONENTS_SQL: &str = "SELECT row_to_json(t) AS row FROM \
     (SELECT * FROM components WHERE asset_id::text = ANY($1)) t";
const CARBON_FACTORS_SQL: &str = "SELECT row_to_json(t) AS row FROM \
     (SELECT * FROM carbon_factors WHERE cf_name::text = ANY($1)) t";

/// Diesel-backed reference data adapter.
#[derive(Clone)]
pub struct DieselReferenceDataRepository {
    pool: DbPool,
}

impl DieselReferenceDataRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch(
        &self,
        sql: &'static str,
        keys: &[String],
        operation: &'static str,
    ) -> Result<Vec<Row>, ReferenceDataRepositoryError> {
        let mut conn = self.pool.get().await.map_err(|err| {
            ReferenceDataRepositoryError::connection(map_pool_error_message(err))
        })?;

        let rows: Vec<JsonRow> = diesel::sql_query(sql)
            .bind::<Array<Text>, _>(keys)
            .load(&mut conn)
            .await
            .map_err(|err| map_reference_error(err, operation))?;

        let rows = into_rows(rows).map_err(ReferenceDataRepositoryError::query)?;
        debug!(operation, keys = keys.len(), rows = rows.len(), "reference rows loaded");
        Ok(rows)
    }
}

#[async_trait]
impl ReferenceDataRepository for DieselReferenceDataRepository {
    async fn assets_for(
        &self,
        interventions: &[String],
    ) -> Result<Vec<Row>, ReferenceDataRepositoryError> {
        self.fetch(ASSETS_SQL, interventions, "assets").await
    }

    async fn asset_parameters_for(
        &self,
        asset_ids: &[String],
    ) -> Result<Vec<Row>, ReferenceDataRepositoryError> {
        self.fetch(ASSET_PARAMETERS_SQL, asset_ids, "assets_parameters")
            .await
    }

    async fn components_for(
        &self,
        asset_ids: &[String],
    ) -> Result<Vec<Row>, ReferenceDataRepositoryError> {
        self.fetch(COMPONENTS_SQL, asset_ids, "components").await
    }

    async fn carbon_factors_for(
        &self,
        cf_names: &[String],
    ) -> Result<Vec<Row>, ReferenceDataRepositoryError> {
        self.fetch(CARBON_FACTORS_SQL, cf_names, "carbon_factors")
            .await
    }
}
