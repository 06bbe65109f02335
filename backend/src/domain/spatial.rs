//! Geometry-derived inputs for the calculation payload.
//!
//! Each drawn feature is buffered by a distance derived from its geodesic
//! length before desire lines are matched against it. Material-site
//! distances arrive from the store and are normalised to one row per type.

use std::collections::BTreeMap;

use geo::{HaversineLength, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Scheme;

/// How drawn features are buffered for desire-line selection.
///
/// `buffer_distance(length_km)` is
/// `max(length_km / length_divisor, minimum_km) * degrees_per_km`. The
/// degrees-per-kilometre factor is a flat approximation for Great Britain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BufferPolicy {
    degrees_per_km: f64,
    length_divisor: f64,
    minimum_km: f64,
}

/// Rejected buffer policy values.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum BufferPolicyError {
    /// A factor was zero, negative or not finite.
    #[error("buffer policy {field} must be positive and finite, got {value}")]
    NotPositive {
        /// Offending field.
        field: &'static str,
        /// Offending value.
        value: f64,
    },
}

impl BufferPolicy {
    /// Degrees of buffer per kilometre.
    pub const DEFAULT_DEGREES_PER_KM: f64 = 0.02;
    /// Divisor applied to the feature length.
    pub const DEFAULT_LENGTH_DIVISOR: f64 = 5.0;
    /// Floor on the scaled length, in kilometres.
    pub const DEFAULT_MINIMUM_KM: f64 = 3.0;

    /// Builds a policy from explicit factors.
    pub fn new(
        degrees_per_km: f64,
        length_divisor: f64,
        minimum_km: f64,
    ) -> Result<Self, BufferPolicyError> {
        for (field, value) in [
            ("degrees_per_km", degrees_per_km),
            ("length_divisor", length_divisor),
            ("minimum_km", minimum_km),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(BufferPolicyError::NotPositive { field, value });
            }
        }
        Ok(Self {
            degrees_per_km,
            length_divisor,
            minimum_km,
        })
    }

    /// Buffer distance in degrees for a feature `length_km` long.
    ///
    /// # Examples
    /// ```
    /// use sdca_backend::domain::BufferPolicy;
    ///
    /// let policy = BufferPolicy::default();
    /// assert!((policy.buffer_distance(6.0) - 0.06).abs() < 1e-12);
    /// assert!((policy.buffer_distance(50.0) - 0.2).abs() < 1e-12);
    /// ```
    pub fn buffer_distance(&self, length_km: f64) -> f64 {
        (length_km / self.length_divisor).max(self.minimum_km) * self.degrees_per_km
    }
}

impl Default for BufferPolicy {
    fn default() -> Self {
        Self {
            degrees_per_km: Self::DEFAULT_DEGREES_PER_KM,
            length_divisor: Self::DEFAULT_LENGTH_DIVISOR,
            minimum_km: Self::DEFAULT_MINIMUM_KM,
        }
    }
}

/// Geodesic length of a shape in kilometres.
///
/// Lines measure along their vertices, polygons along every ring, and
/// points measure zero.
pub fn length_km(shape: &geo::Geometry<f64>) -> f64 {
    haversine_metres(shape) / 1000.0
}

fn haversine_metres(shape: &geo::Geometry<f64>) -> f64 {
    fn rings(polygon: &Polygon<f64>) -> f64 {
        polygon.exterior().haversine_length()
            + polygon
                .interiors()
                .iter()
                .map(|ring| ring.haversine_length())
                .sum::<f64>()
    }
    match shape {
        geo::Geometry::LineString(line) => line.haversine_length(),
        geo::Geometry::MultiLineString(lines) => lines.haversine_length(),
        geo::Geometry::Polygon(polygon) => rings(polygon),
        geo::Geometry::MultiPolygon(polygons) => polygons.iter().map(rings).sum(),
        geo::Geometry::GeometryCollection(collection) => {
            collection.iter().map(haversine_metres).sum()
        }
        _ => 0.0,
    }
}

/// A drawn geometry with the buffer to apply around it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureBuffer {
    /// GeoJSON geometry object.
    pub geometry: Value,
    /// Buffer radius in degrees.
    pub distance: f64,
}

/// Buffers for every feature of `scheme`, in feature order.
pub fn feature_buffers(scheme: &Scheme, policy: &BufferPolicy) -> Vec<FeatureBuffer> {
    scheme
        .features()
        .iter()
        .map(|feature| FeatureBuffer {
            geometry: feature.geometry_json(),
            distance: policy.buffer_distance(length_km(feature.shape())),
        })
        .collect()
}

/// GeoJSON geometry objects of every feature, for centroid queries.
pub fn scheme_geometries(scheme: &Scheme) -> Vec<Value> {
    scheme
        .features()
        .iter()
        .map(super::SchemeFeature::geometry_json)
        .collect()
}

/// Distance from the scheme centroid to the nearest site of one material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSiteDistance {
    /// Material type, for example `cement`.
    #[serde(rename = "type")]
    pub material_type: String,
    /// Great-circle distance in kilometres.
    pub distance_km: f64,
}

/// Keeps the minimum distance per material type, ordered by type name.
///
/// # Examples
/// ```
/// use sdca_backend::domain::{MaterialSiteDistance, nearest_per_type};
///
/// let rows = vec![
///     MaterialSiteDistance { material_type: "steel".into(), distance_km: 12.0 },
///     MaterialSiteDistance { material_type: "cement".into(), distance_km: 4.0 },
///     MaterialSiteDistance { material_type: "steel".into(), distance_km: 3.5 },
/// ];
/// let nearest = nearest_per_type(rows);
/// assert_eq!(nearest.len(), 2);
/// assert_eq!(nearest[0].material_type, "cement");
/// assert_eq!(nearest[1].distance_km, 3.5);
/// ```
pub fn nearest_per_type(rows: Vec<MaterialSiteDistance>) -> Vec<MaterialSiteDistance> {
    let mut nearest: BTreeMap<String, f64> = BTreeMap::new();
    for row in rows {
        nearest
            .entry(row.material_type)
            .and_modify(|distance| *distance = distance.min(row.distance_km))
            .or_insert(row.distance_km);
    }
    nearest
        .into_iter()
        .map(|(material_type, distance_km)| MaterialSiteDistance {
            material_type,
            distance_km,
        })
        .collect()
}
