//! The user's scheme: an ordered registry of drawn interventions.
//!
//! Interventions are held in a plain vector. The id of an intervention is
//! its position, and removal shifts later entries down and renumbers them so
//! ids stay dense and unique. Every mutation bumps the [`RegistryStamp`],
//! which the calculation gate compares to decide whether a fresh submission
//! is needed.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use geo::{Coord, HaversineLength, LineString};
use geojson::{Geometry, JsonObject, Value as GeometryValue};
use mockable::Clock;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::error::RegistryError;
use crate::lexicon::InterventionLexicon;

/// Revision marker for the registry contents.
///
/// Two stamps compare equal only when no mutation happened between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStamp {
    revision: u64,
    modified_at: Option<DateTime<Utc>>,
}

impl RegistryStamp {
    /// Monotonic mutation counter.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Wall-clock time of the last mutation, absent for a fresh registry.
    #[must_use]
    pub const fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }
}

/// A drawn intervention.
#[derive(Debug, Clone, PartialEq)]
pub struct Intervention {
    id: usize,
    type_index: usize,
    properties: Map<String, Value>,
    geometry: Geometry,
}

impl Intervention {
    /// Position of this intervention in the registry.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Index of the intervention type in the lexicon.
    #[must_use]
    pub const fn type_index(&self) -> usize {
        self.type_index
    }

    /// Taxonomy properties copied from the lexicon.
    #[must_use]
    pub const fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// Drawn geometry.
    #[must_use]
    pub const fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    fn property(&self, key: &str) -> &str {
        self.properties
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Length label shown in the scheme summary.
    ///
    /// Line strings report their great-circle length in kilometres to two
    /// decimal places; every other geometry reports `N/A`.
    #[must_use]
    pub fn length_label(&self) -> String {
        match &self.geometry.value {
            GeometryValue::LineString(positions) => {
                let line: LineString<f64> = positions
                    .iter()
                    .filter_map(|position| match position.as_slice() {
                        [x, y, ..] => Some(Coord { x: *x, y: *y }),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .into();
                format!("{:.2} kilometres", metres_to_kilometres(line.haversine_length()))
            }
            _ => "N/A".to_owned(),
        }
    }

    fn to_feature(&self) -> Value {
        json!({
            "_interventionTypeIndex": self.type_index,
            "type": "Feature",
            "id": self.id,
            "properties": self.properties,
            "geometry": Value::Object(JsonObject::from(&self.geometry)),
        })
    }
}

#[expect(clippy::float_arithmetic, reason = "unit conversion for display")]
fn metres_to_kilometres(metres: f64) -> f64 {
    metres / 1000.0
}

/// One row of the scheme summary list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterventionSummary {
    /// Registry position, used as the edit target.
    pub index: usize,
    /// Intervention name from the lexicon.
    pub intervention_name: String,
    /// Transport mode from the lexicon.
    pub mode: String,
    /// Length label, see [`Intervention::length_label`].
    pub length: String,
}

/// Outcome of importing a scheme file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    /// Features accepted into the registry.
    pub imported: usize,
    /// Features dropped because they could not be tied to the lexicon.
    pub discarded: usize,
}

/// Ordered registry of the user's interventions.
pub struct InterventionRegistry {
    interventions: Vec<Intervention>,
    stamp: RegistryStamp,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for InterventionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterventionRegistry")
            .field("interventions", &self.interventions)
            .field("stamp", &self.stamp)
            .finish_non_exhaustive()
    }
}

impl InterventionRegistry {
    /// Creates an empty registry stamped by `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            interventions: Vec::new(),
            stamp: RegistryStamp::default(),
            clock,
        }
    }

    /// Current revision stamp.
    #[must_use]
    pub const fn stamp(&self) -> RegistryStamp {
        self.stamp
    }

    /// Number of interventions.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.interventions.len()
    }

    /// Whether the scheme is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.interventions.is_empty()
    }

    /// Intervention at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Intervention> {
        self.interventions.get(index)
    }

    /// Iterates interventions in drawing order.
    pub fn iter(&self) -> impl Iterator<Item = &Intervention> {
        self.interventions.iter()
    }

    fn touch(&mut self) {
        self.stamp = RegistryStamp {
            revision: self.stamp.revision.saturating_add(1),
            modified_at: Some(self.clock.utc()),
        };
    }

    /// Appends a drawn intervention and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownInterventionType`] if `type_index` is
    /// not in `lexicon`, [`RegistryError::EmptyGeometry`] if the drawing has
    /// no coordinates, or [`RegistryError::GeometryMismatch`] if its shape
    /// is not the entry's drawing geometry.
    pub fn add(
        &mut self,
        lexicon: &InterventionLexicon,
        type_index: usize,
        geometry: Geometry,
    ) -> Result<usize, RegistryError> {
        let entry = lexicon
            .get(type_index)
            .ok_or(RegistryError::UnknownInterventionType { index: type_index })?;
        if !has_coordinates(&geometry.value) {
            return Err(RegistryError::EmptyGeometry);
        }
        ensure_kind(entry.geometry.geojson_type(), &geometry.value)?;
        let id = self.interventions.len();
        self.interventions.push(Intervention {
            id,
            type_index,
            properties: entry.feature_properties(),
            geometry,
        });
        self.touch();
        Ok(id)
    }

    /// Replaces the geometry of the intervention at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IndexOutOfRange`],
    /// [`RegistryError::EmptyGeometry`], or
    /// [`RegistryError::GeometryMismatch`] when the new shape is of a
    /// different kind from the one it replaces.
    pub fn replace_geometry(
        &mut self,
        index: usize,
        geometry: Geometry,
    ) -> Result<(), RegistryError> {
        if !has_coordinates(&geometry.value) {
            return Err(RegistryError::EmptyGeometry);
        }
        let len = self.interventions.len();
        let intervention = self
            .interventions
            .get_mut(index)
            .ok_or(RegistryError::IndexOutOfRange { index, len })?;
        ensure_kind(geometry_type(&intervention.geometry.value), &geometry.value)?;
        intervention.geometry = geometry;
        self.touch();
        Ok(())
    }

    /// Removes and returns the intervention at `index`.
    ///
    /// Later interventions move down one place and take their new position
    /// as their id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IndexOutOfRange`] if nothing is at `index`.
    pub fn remove(&mut self, index: usize) -> Result<Intervention, RegistryError> {
        let len = self.interventions.len();
        if index >= len {
            return Err(RegistryError::IndexOutOfRange { index, len });
        }
        let removed = self.interventions.remove(index);
        self.renumber();
        self.touch();
        Ok(removed)
    }

    /// Removes every intervention.
    pub fn clear(&mut self) {
        self.interventions.clear();
        self.touch();
    }

    fn renumber(&mut self) {
        for (position, intervention) in self.interventions.iter_mut().enumerate() {
            intervention.id = position;
        }
    }

    /// Replaces the registry with the contents of a GeoJSON scheme file.
    ///
    /// Features that cannot be tied to a lexicon entry, that carry no
    /// coordinates, or whose shape is not the entry's drawing geometry are
    /// dropped and counted in the report. The type is taken
    /// from `_interventionTypeIndex` (a number or numeric string) and falls
    /// back to the `intervention` property. Taxonomy properties are rewritten
    /// from the lexicon.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ImportError`] if `json` is not a GeoJSON
    /// `FeatureCollection`. The registry is unchanged on error.
    pub fn import_geojson(
        &mut self,
        json: &str,
        lexicon: &InterventionLexicon,
    ) -> Result<ImportReport, RegistryError> {
        let collection: CollectionRecord =
            serde_json::from_str(json).map_err(|e| RegistryError::ImportError {
                message: e.to_string(),
            })?;
        if collection.kind != "FeatureCollection" {
            return Err(RegistryError::ImportError {
                message: format!("expected a FeatureCollection, found {}", collection.kind),
            });
        }

        let total = collection.features.len();
        let accepted: Vec<Intervention> = collection
            .features
            .into_iter()
            .filter_map(|feature| import_feature(feature, lexicon))
            .enumerate()
            .map(|(id, (type_index, properties, geometry))| Intervention {
                id,
                type_index,
                properties,
                geometry,
            })
            .collect();

        let report = ImportReport {
            imported: accepted.len(),
            discarded: total.saturating_sub(accepted.len()),
        };
        self.interventions = accepted;
        self.touch();
        Ok(report)
    }

    /// Exports the registry as a GeoJSON `FeatureCollection`.
    ///
    /// `_timestamp` holds the last modification time in epoch milliseconds,
    /// or null for an untouched registry.
    #[must_use]
    pub fn to_geojson(&self) -> Value {
        json!({
            "_timestamp": self.stamp.modified_at.map(|at| at.timestamp_millis()),
            "type": "FeatureCollection",
            "features": self
                .interventions
                .iter()
                .map(Intervention::to_feature)
                .collect::<Vec<_>>(),
        })
    }

    /// Summary rows for the scheme list.
    #[must_use]
    pub fn summaries(&self) -> Vec<InterventionSummary> {
        self.interventions
            .iter()
            .map(|intervention| InterventionSummary {
                index: intervention.id,
                intervention_name: intervention.property("intervention_name").to_owned(),
                mode: intervention.property("mode").to_owned(),
                length: intervention.length_label(),
            })
            .collect()
    }
}

#[derive(Deserialize)]
struct CollectionRecord {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<Value>,
}

#[derive(Deserialize)]
struct FeatureRecord {
    #[serde(rename = "_interventionTypeIndex", default)]
    type_index: Option<Value>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    geometry: Option<Geometry>,
}

fn import_feature(
    feature: Value,
    lexicon: &InterventionLexicon,
) -> Option<(usize, Map<String, Value>, Geometry)> {
    let record: FeatureRecord = serde_json::from_value(feature).ok()?;
    let properties = record.properties.filter(|props| !props.is_empty())?;
    let type_index = record
        .type_index
        .as_ref()
        .and_then(parse_type_index)
        .or_else(|| {
            properties
                .get("intervention")
                .and_then(Value::as_str)
                .and_then(|name| lexicon.index_of(name))
        })?;
    let entry = lexicon.get(type_index)?;
    let geometry = record.geometry.filter(|g| {
        has_coordinates(&g.value) && ensure_kind(entry.geometry.geojson_type(), &g.value).is_ok()
    })?;
    Some((type_index, entry.feature_properties(), geometry))
}

/// Reads an `_interventionTypeIndex` stored as a non-negative integer or a
/// numeric string.
///
/// ```
/// use sdca_scheme::parse_type_index;
/// use serde_json::json;
///
/// assert_eq!(parse_type_index(&json!("4")), Some(4));
/// assert_eq!(parse_type_index(&json!(-1)), None);
/// ```
#[must_use]
pub fn parse_type_index(value: &Value) -> Option<usize> {
    match value {
        Value::Number(number) => number.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// GeoJSON `type` member of a geometry value.
pub(crate) const fn geometry_type(value: &GeometryValue) -> &'static str {
    match value {
        GeometryValue::Point(_) => "Point",
        GeometryValue::MultiPoint(_) => "MultiPoint",
        GeometryValue::LineString(_) => "LineString",
        GeometryValue::MultiLineString(_) => "MultiLineString",
        GeometryValue::Polygon(_) => "Polygon",
        GeometryValue::MultiPolygon(_) => "MultiPolygon",
        GeometryValue::GeometryCollection(_) => "GeometryCollection",
    }
}

fn ensure_kind(expected: &str, value: &GeometryValue) -> Result<(), RegistryError> {
    let found = geometry_type(value);
    if found == expected {
        Ok(())
    } else {
        Err(RegistryError::GeometryMismatch {
            expected: expected.to_owned(),
            found: found.to_owned(),
        })
    }
}

/// Whether a geometry carries at least one position.
pub(crate) fn has_coordinates(value: &GeometryValue) -> bool {
    match value {
        GeometryValue::Point(position) => !position.is_empty(),
        GeometryValue::MultiPoint(positions) | GeometryValue::LineString(positions) => {
            !positions.is_empty()
        }
        GeometryValue::MultiLineString(lines) | GeometryValue::Polygon(lines) => {
            lines.iter().any(|line| !line.is_empty())
        }
        GeometryValue::MultiPolygon(polygons) => polygons
            .iter()
            .flatten()
            .any(|ring| !ring.is_empty()),
        GeometryValue::GeometryCollection(geometries) => geometries
            .iter()
            .any(|geometry| has_coordinates(&geometry.value)),
    }
}
