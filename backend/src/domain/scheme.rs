//! Submitted schemes: structurally checked GeoJSON feature collections.
//!
//! Validation is structural only. Every feature needs a `type`, an object
//! `properties` and a `geometry` with a `type` and a non-empty `coordinates`
//! array whose positions each hold at least two numbers. Coordinate ranges
//! and ring closure are not checked. The first bad feature rejects the whole
//! scheme.

use geojson::{Geometry, Value as GeometryValue};
use serde_json::{Map, Value, json};

/// Reasons a submitted scheme is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemeError {
    /// The input was not JSON.
    #[error("the scheme is not valid JSON: {message}")]
    NotJson {
        /// Parser message.
        message: String,
    },
    /// The top level was not a `FeatureCollection` with a `features` array.
    #[error("the scheme must be a GeoJSON FeatureCollection")]
    NotFeatureCollection,
    /// The collection held no features.
    #[error("the scheme contains no features")]
    NoFeatures,
    /// A feature lacked its `type` member.
    #[error("feature {index} has no type")]
    MissingType {
        /// Feature position.
        index: usize,
    },
    /// A feature lacked an object `properties` member.
    #[error("feature {index} has no properties")]
    MissingProperties {
        /// Feature position.
        index: usize,
    },
    /// A feature lacked a `geometry` object.
    #[error("feature {index} has no geometry")]
    MissingGeometry {
        /// Feature position.
        index: usize,
    },
    /// A geometry lacked its `type`.
    #[error("feature {index} geometry has no type")]
    MissingGeometryType {
        /// Feature position.
        index: usize,
    },
    /// A geometry lacked a non-empty `coordinates` array.
    #[error("feature {index} geometry has no coordinates")]
    MissingCoordinates {
        /// Feature position.
        index: usize,
    },
    /// The coordinates do not fit the declared geometry type.
    #[error("feature {index} geometry is malformed: {message}")]
    MalformedGeometry {
        /// Feature position.
        index: usize,
        /// Description of the problem.
        message: String,
    },
}

impl SchemeError {
    /// Position of the offending feature, when one is to blame.
    pub fn feature_index(&self) -> Option<usize> {
        match self {
            Self::MissingType { index }
            | Self::MissingProperties { index }
            | Self::MissingGeometry { index }
            | Self::MissingGeometryType { index }
            | Self::MissingCoordinates { index }
            | Self::MalformedGeometry { index, .. } => Some(*index),
            Self::NotJson { .. } | Self::NotFeatureCollection | Self::NoFeatures => None,
        }
    }
}

/// One drawn intervention from a submitted scheme.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemeFeature {
    type_index: Option<Value>,
    properties: Map<String, Value>,
    geometry: Geometry,
    shape: geo::Geometry<f64>,
}

impl SchemeFeature {
    /// Raw `_interventionTypeIndex`, which may be a number or numeric text.
    pub fn type_index(&self) -> Option<&Value> {
        self.type_index.as_ref()
    }

    /// Feature properties as submitted.
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// The `intervention` property, when present as text.
    pub fn intervention(&self) -> Option<&str> {
        self.properties.get("intervention").and_then(Value::as_str)
    }

    /// GeoJSON geometry.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// The same geometry as a `geo` shape for measurement.
    pub fn shape(&self) -> &geo::Geometry<f64> {
        &self.shape
    }

    /// Geometry as a JSON object, ready for binding into spatial SQL.
    pub fn geometry_json(&self) -> Value {
        Value::Object(geojson::JsonObject::from(&self.geometry))
    }
}

/// A structurally valid scheme.
#[derive(Debug, Clone, PartialEq)]
pub struct Scheme {
    collection: Value,
    features: Vec<SchemeFeature>,
}

impl Scheme {
    /// Parses the `geojson` request parameter.
    ///
    /// # Examples
    /// ```
    /// use sdca_backend::domain::Scheme;
    ///
    /// let scheme = Scheme::from_geojson(
    ///     r#"{"type":"FeatureCollection","features":[{"type":"Feature",
    ///         "properties":{"intervention":"hsr_line"},
    ///         "geometry":{"type":"LineString","coordinates":[[0,51],[0.1,51.1]]}}]}"#,
    /// )
    /// .expect("valid scheme");
    /// assert_eq!(scheme.features().len(), 1);
    /// ```
    pub fn from_geojson(text: &str) -> Result<Self, SchemeError> {
        let collection: Value = serde_json::from_str(text).map_err(|e| SchemeError::NotJson {
            message: e.to_string(),
        })?;
        Self::from_value(collection)
    }

    /// Wraps the legacy `line` parameter, a bare coordinate array, into a
    /// one-feature collection with empty properties.
    pub fn from_line(text: &str) -> Result<Self, SchemeError> {
        let coordinates: Value = serde_json::from_str(text).map_err(|e| SchemeError::NotJson {
            message: e.to_string(),
        })?;
        Self::from_value(json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {},
                "geometry": { "type": "LineString", "coordinates": coordinates },
            }],
        }))
    }

    /// Validates an already decoded collection.
    pub fn from_value(collection: Value) -> Result<Self, SchemeError> {
        let raw_features = collection
            .as_object()
            .filter(|object| object.get("type").and_then(Value::as_str) == Some("FeatureCollection"))
            .and_then(|object| object.get("features"))
            .and_then(Value::as_array)
            .ok_or(SchemeError::NotFeatureCollection)?;
        if raw_features.is_empty() {
            return Err(SchemeError::NoFeatures);
        }

        let features = raw_features
            .iter()
            .enumerate()
            .map(|(index, feature)| parse_feature(index, feature))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            collection,
            features,
        })
    }

    /// The collection exactly as submitted.
    pub fn collection(&self) -> &Value {
        &self.collection
    }

    /// Features in submission order.
    pub fn features(&self) -> &[SchemeFeature] {
        &self.features
    }
}

fn parse_feature(index: usize, feature: &Value) -> Result<SchemeFeature, SchemeError> {
    let object = feature
        .as_object()
        .ok_or(SchemeError::MissingType { index })?;
    if !object.get("type").is_some_and(Value::is_string) {
        return Err(SchemeError::MissingType { index });
    }
    let properties = object
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .ok_or(SchemeError::MissingProperties { index })?;
    let geometry_object = object
        .get("geometry")
        .and_then(Value::as_object)
        .ok_or(SchemeError::MissingGeometry { index })?;
    if !geometry_object.get("type").is_some_and(Value::is_string) {
        return Err(SchemeError::MissingGeometryType { index });
    }
    let has_coordinates = geometry_object
        .get("coordinates")
        .and_then(Value::as_array)
        .is_some_and(|coordinates| !coordinates.is_empty());
    if !has_coordinates {
        return Err(SchemeError::MissingCoordinates { index });
    }

    let geometry = Geometry::from_json_object(geometry_object.clone()).map_err(|e| {
        SchemeError::MalformedGeometry {
            index,
            message: e.to_string(),
        }
    })?;
    if !positions_complete(&geometry.value) {
        return Err(SchemeError::MalformedGeometry {
            index,
            message: "every position needs a longitude and a latitude".to_owned(),
        });
    }
    let shape = geo::Geometry::<f64>::try_from(geometry.value.clone()).map_err(|e| {
        SchemeError::MalformedGeometry {
            index,
            message: e.to_string(),
        }
    })?;

    Ok(SchemeFeature {
        type_index: object.get("_interventionTypeIndex").cloned(),
        properties,
        geometry,
        shape,
    })
}

/// Every position has two or more ordinates and no part is empty.
fn positions_complete(value: &GeometryValue) -> bool {
    fn position_ok(position: &[f64]) -> bool {
        position.len() >= 2
    }
    fn line_ok(line: &[Vec<f64>]) -> bool {
        !line.is_empty() && line.iter().all(|p| position_ok(p))
    }
    match value {
        GeometryValue::Point(position) => position_ok(position),
        GeometryValue::MultiPoint(line) | GeometryValue::LineString(line) => line_ok(line),
        GeometryValue::MultiLineString(lines) | GeometryValue::Polygon(lines) => {
            !lines.is_empty() && lines.iter().all(|l| line_ok(l))
        }
        GeometryValue::MultiPolygon(polygons) => {
            !polygons.is_empty()
                && polygons
                    .iter()
                    .all(|rings| !rings.is_empty() && rings.iter().all(|l| line_ok(l)))
        }
        GeometryValue::GeometryCollection(_) => false,
    }
}
