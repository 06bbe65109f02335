//! Driven port for spatial queries against the reference layers.

use async_trait::async_trait;

use crate::domain::{Bbox, FeatureBuffer, MaterialSiteDistance, Row, TableSet};

use super::define_port_error;

define_port_error! {
    /// Errors raised by spatial queries.
    pub enum SpatialRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "spatial query connection failed: {message}",
        /// Query failed during execution or row conversion.
        Query { message: String } =>
            "spatial query failed: {message}",
        /// The store ran out of memory or time evaluating the geometry.
        ResourceExhausted { message: String } =>
            "spatial query exhausted resources: {message}",
    }
}

/// Port for geometry-driven lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpatialRepository: Send + Sync {
    /// Desire lines intersecting any buffered geometry, each returned once.
    ///
    /// Rows carry the origin and destination node, the modal trip counts and
    /// a `geometry` column.
    async fn desire_lines_near(
        &self,
        buffers: &[FeatureBuffer],
    ) -> Result<Vec<Row>, SpatialRepositoryError>;

    /// Great-circle distance from the centroid of `geometries` to the
    /// nearest site of each material type.
    async fn material_site_distances(
        &self,
        geometries: &[serde_json::Value],
    ) -> Result<Vec<MaterialSiteDistance>, SpatialRepositoryError>;

    /// Carbon zones intersecting `bbox`.
    async fn zones_in_view(
        &self,
        bbox: &Bbox,
        tables: TableSet,
    ) -> Result<Vec<Row>, SpatialRepositoryError>;
}

/// Fixture implementation with empty reference layers.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureSpatialRepository;

#[async_trait]
impl SpatialRepository for FixtureSpatialRepository {
    async fn desire_lines_near(
        &self,
        _buffers: &[FeatureBuffer],
    ) -> Result<Vec<Row>, SpatialRepositoryError> {
        Ok(Vec::new())
    }

    async fn material_site_distances(
        &self,
        _geometries: &[serde_json::Value],
    ) -> Result<Vec<MaterialSiteDistance>, SpatialRepositoryError> {
        Ok(Vec::new())
    }

    async fn zones_in_view(
        &self,
        _bbox: &Bbox,
        _tables: TableSet,
    ) -> Result<Vec<Row>, SpatialRepositoryError> {
        Ok(Vec::new())
    }
}
