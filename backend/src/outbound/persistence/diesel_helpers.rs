//! Shared helpers for the raw-SQL repository implementations.
//!
//! Reference tables are read whole, so queries wrap each row in
//! `row_to_json` and the adapters hand the resulting objects to the domain
//! untouched. The `json` type (not `jsonb`) keeps column order.

use diesel::QueryableByName;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::Json;
use serde_json::Value;
use tracing::debug;

use crate::domain::Row;
use crate::domain::ports::{ReferenceDataRepositoryError, SpatialRepositoryError};

use super::pool::PoolError;

/// One result row encoded by `row_to_json`.
#[derive(Debug, QueryableByName)]
pub(crate) struct JsonRow {
    #[diesel(sql_type = Json)]
    pub(crate) row: Value,
}

/// Extract a readable message from a pool error.
pub(crate) fn map_pool_error_message(error: PoolError) -> String {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    }
}

/// Extract a readable message from a Diesel error and emit debug context.
pub(crate) fn map_diesel_error_message(error: &DieselError, operation: &str) -> String {
    let error_message = error.to_string();
    debug!(%error_message, %operation, "diesel operation failed");
    error_message
}

/// Whether PostGIS gave up on the statement for lack of time or memory.
pub(crate) fn is_resource_exhaustion(error: &DieselError) -> bool {
    let DieselError::DatabaseError(_, info) = error else {
        return false;
    };
    let message = info.message().to_lowercase();
    message.contains("statement timeout")
        || message.contains("out of memory")
        || message.contains("canceling statement")
}

fn is_connection_failure(error: &DieselError) -> bool {
    matches!(
        error,
        DieselError::DatabaseError(
            DatabaseErrorKind::ClosedConnection | DatabaseErrorKind::UnableToSendCommand,
            _
        ) | DieselError::BrokenTransactionManager
    )
}

/// Map Diesel errors to reference data repository errors.
pub(crate) fn map_reference_error(
    error: DieselError,
    operation: &str,
) -> ReferenceDataRepositoryError {
    let message = map_diesel_error_message(&error, operation);
    if is_connection_failure(&error) {
        ReferenceDataRepositoryError::connection(message)
    } else {
        ReferenceDataRepositoryError::query(message)
    }
}

/// Map Diesel errors to spatial repository errors.
pub(crate) fn map_spatial_error(error: DieselError, operation: &str) -> SpatialRepositoryError {
    let message = map_diesel_error_message(&error, operation);
    if is_resource_exhaustion(&error) {
        SpatialRepositoryError::resource_exhausted(message)
    } else if is_connection_failure(&error) {
        SpatialRepositoryError::connection(message)
    } else {
        SpatialRepositoryError::query(message)
    }
}

/// Unwrap `row_to_json` results into domain rows.
///
/// # Errors
/// Returns the position of the first value that is not a JSON object.
pub(crate) fn into_rows(rows: Vec<JsonRow>) -> Result<Vec<Row>, String> {
    rows.into_iter()
        .enumerate()
        .map(|(index, JsonRow { row })| match row {
            Value::Object(map) => Ok(map),
            _ => Err(format!("row {index} is not a JSON object")),
        })
        .collect()
}
