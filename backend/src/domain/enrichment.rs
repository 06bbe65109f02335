//! Expands intervention identifiers into the reference data the calculator
//! needs: interventions select assets, assets select parameters and
//! components, and components select carbon factors by `cf_name`.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::debug;

use super::Row;
use super::ports::{ReferenceDataRepository, ReferenceDataRepositoryError};

/// Column joining assets to parameters and components.
pub const ASSET_ID_COLUMN: &str = "asset_id";
/// Column joining components to carbon factors.
pub const CARBON_FACTOR_COLUMN: &str = "cf_name";

/// Reference rows gathered for one scheme.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceData {
    /// Asset rows.
    pub assets: Vec<Row>,
    /// Asset parameter rows, de-duplicated.
    pub asset_parameters: Vec<Row>,
    /// Component rows.
    pub components: Vec<Row>,
    /// Carbon factor rows.
    pub carbon_factors: Vec<Row>,
}

/// Fetches the reference graph for `interventions`.
///
/// An empty identifier list returns empty tables without touching the
/// repository. Any lookup failure aborts the whole expansion.
pub async fn enrich<R>(
    repository: &R,
    interventions: &[String],
) -> Result<ReferenceData, ReferenceDataRepositoryError>
where
    R: ReferenceDataRepository + ?Sized,
{
    if interventions.is_empty() {
        return Ok(ReferenceData::default());
    }

    let assets = repository.assets_for(interventions).await?;
    let asset_ids = column_keys(&assets, ASSET_ID_COLUMN);
    if asset_ids.is_empty() {
        debug!(interventions = interventions.len(), "no assets matched");
        return Ok(ReferenceData {
            assets,
            ..ReferenceData::default()
        });
    }

    let raw_parameters = repository.asset_parameters_for(&asset_ids).await?;
    let raw_count = raw_parameters.len();
    let asset_parameters = dedupe_rows(raw_parameters);
    let components = repository.components_for(&asset_ids).await?;
    let cf_names = column_keys(&components, CARBON_FACTOR_COLUMN);
    let carbon_factors = if cf_names.is_empty() {
        Vec::new()
    } else {
        repository.carbon_factors_for(&cf_names).await?
    };

    debug!(
        assets = assets.len(),
        asset_parameters = asset_parameters.len(),
        duplicate_parameters = raw_count - asset_parameters.len(),
        components = components.len(),
        carbon_factors = carbon_factors.len(),
        "reference data gathered"
    );
    Ok(ReferenceData {
        assets,
        asset_parameters,
        components,
        carbon_factors,
    })
}

/// Drops rows equal to an earlier row, keeping first-occurrence order.
///
/// Equality covers every column, so two rows for the same asset and
/// parameter that differ anywhere are both kept. Column order does not
/// matter.
pub fn dedupe_rows(rows: Vec<Row>) -> Vec<Row> {
    let mut unique: Vec<Row> = Vec::with_capacity(rows.len());
    for row in rows {
        if !unique.contains(&row) {
            unique.push(row);
        }
    }
    unique
}

/// Sorted distinct non-null values of `column`, rendered as text.
fn column_keys(rows: &[Row], column: &str) -> Vec<String> {
    rows.iter()
        .filter_map(|row| match row.get(column)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
