//! PostGIS-backed `SpatialRepository` implementation.
//!
//! Drawn geometries travel to the database as a single JSON array parameter
//! and are decoded there with `ST_GeomFromGeoJSON`, so no geometry SQL is
//! ever assembled from user input. Zone table names come only from the
//! closed [`TableSet`] prefixes.

use async_trait::async_trait;
use diesel::QueryableByName;
use diesel::sql_types::{Double, Text};
use diesel_async::RunQueryDsl;
use serde_json::Value;
use tracing::debug;

use crate::domain::ports::{SpatialRepository, SpatialRepositoryError};
use crate::domain::{Bbox, FeatureBuffer, MaterialSiteDistance, Row, TableSet};

use super::diesel_helpers::{JsonRow, into_rows, map_pool_error_message, map_spatial_error};
use super::pool::DbPool;

const DESIRE_LINES_SQL: &str = r#"
WITH buffers AS (
    SELECT ST_Buffer(
               ST_SetSRID(ST_GeomFromGeoJSON(b ->> 'geometry'), 4326),
               (b ->> 'distance')::float8
           ) AS area
    FROM json_array_elements($1::json) AS b
)
SELECT row_to_json(t) AS row FROM (
    SELECT d."from", d."to", d.cycle, d.drive, d.passenger, d.walk,
           d.rail, d.bus, d.lgv, d.hgv,
           ST_AsGeoJSON(d.geometry, 5) AS geometry
    FROM desire_lines AS d
    WHERE EXISTS (SELECT 1 FROM buffers WHERE ST_Intersects(d.geometry, buffers.area))
) t
"#;

const MATERIAL_SITES_SQL: &str = r#"
WITH centre AS (
    SELECT ST_Centroid(ST_Union(ST_SetSRID(ST_GeomFromGeoJSON(g::text), 4326))) AS point
    FROM json_array_elements($1::json) AS g
)
SELECT m.type AS material_type,
       MIN(ST_DistanceSphere(m.geometry, centre.point)) / 1000.0 AS distance_km
FROM materialsites AS m, centre
GROUP BY m.type
ORDER BY m.type
"#;

#[derive(Debug, QueryableByName)]
struct MaterialSiteRow {
    #[diesel(sql_type = Text)]
    material_type: String,
    #[diesel(sql_type = Double)]
    distance_km: f64,
}

impl From<MaterialSiteRow> for MaterialSiteDistance {
    fn from(row: MaterialSiteRow) -> Self {
        Self {
            material_type: row.material_type,
            distance_km: row.distance_km,
        }
    }
}

/// Zone query for the given table set.
fn zones_sql(tables: TableSet) -> String {
    format!(
        "SELECT row_to_json(t) AS row FROM (\
         SELECT lsoa11, ST_AsGeoJSON(geometry, 5) AS geometry \
         FROM {}carbon_full \
         WHERE geometry && ST_MakeEnvelope($1, $2, $3, $4, 4326)\
         ) t",
        tables.prefix()
    )
}

/// Diesel-backed spatial adapter.
#[derive(Clone)]
pub struct PostgisSpatialRepository {
    pool: DbPool,
}

impl PostgisSpatialRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn encode<T: serde::Serialize>(value: &T) -> Result<String, SpatialRepositoryError> {
        serde_json::to_string(value).map_err(|err| SpatialRepositoryError::query(err.to_string()))
    }
}

#[async_trait]
impl SpatialRepository for PostgisSpatialRepository {
    async fn desire_lines_near(
        &self,
        buffers: &[FeatureBuffer],
    ) -> Result<Vec<Row>, SpatialRepositoryError> {
        let encoded = Self::encode(&buffers)?;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| SpatialRepositoryError::connection(map_pool_error_message(err)))?;

        let rows: Vec<JsonRow> = diesel::sql_query(DESIRE_LINES_SQL)
            .bind::<Text, _>(encoded)
            .load(&mut conn)
            .await
            .map_err(|err| map_spatial_error(err, "desire_lines"))?;

        let rows = into_rows(rows).map_err(SpatialRepositoryError::query)?;
        debug!(buffers = buffers.len(), rows = rows.len(), "desire lines loaded");
        Ok(rows)
    }

    async fn material_site_distances(
        &self,
        geometries: &[Value],
    ) -> Result<Vec<MaterialSiteDistance>, SpatialRepositoryError> {
        let encoded = Self::encode(&geometries)?;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| SpatialRepositoryError::connection(map_pool_error_message(err)))?;

        let rows: Vec<MaterialSiteRow> = diesel::sql_query(MATERIAL_SITES_SQL)
            .bind::<Text, _>(encoded)
            .load(&mut conn)
            .await
            .map_err(|err| map_spatial_error(err, "materialsites"))?;

        Ok(rows.into_iter().map(MaterialSiteDistance::from).collect())
    }

    async fn zones_in_view(
        &self,
        bbox: &Bbox,
        tables: TableSet,
    ) -> Result<Vec<Row>, SpatialRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| SpatialRepositoryError::connection(map_pool_error_message(err)))?;

        let rows: Vec<JsonRow> = diesel::sql_query(zones_sql(tables))
            .bind::<Double, _>(bbox.west)
            .bind::<Double, _>(bbox.south)
            .bind::<Double, _>(bbox.east)
            .bind::<Double, _>(bbox.north)
            .load(&mut conn)
            .await
            .map_err(|err| map_spatial_error(err, "carbon_full"))?;

        into_rows(rows).map_err(SpatialRepositoryError::query)
    }
}
