//! Intervention lexicon loading.
//!
//! The lexicon is a JSON array of intervention types. Position in the array
//! is the identity used everywhere else: drawn features carry it as
//! `_interventionTypeIndex` and the backend resolves it against the same
//! file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::LexiconError;

/// Geometry a user draws for an intervention type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawingGeometry {
    /// A route drawn as a line string.
    #[default]
    Line,
    /// A single location.
    Point,
    /// A closed area.
    Polygon,
}

impl DrawingGeometry {
    /// GeoJSON geometry type produced when drawing this kind of shape.
    #[must_use]
    pub const fn geojson_type(self) -> &'static str {
        match self {
            Self::Line => "LineString",
            Self::Point => "Point",
            Self::Polygon => "Polygon",
        }
    }
}

/// One entry of the intervention lexicon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionType {
    /// Broad infrastructure family, for example "Rail".
    pub infrastructure_type: String,
    /// Transport mode class.
    pub mode_class: String,
    /// Transport mode, used to group the picker.
    pub mode: String,
    /// Intervention class within the mode.
    pub intervention_class: String,
    /// Human-readable intervention name.
    pub intervention_name: String,
    /// Machine identifier used to look up assets.
    pub intervention: String,
    /// Longer description shown when drawing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intervention_description: Option<String>,
    /// Shape drawn for this intervention.
    #[serde(default)]
    pub geometry: DrawingGeometry,
}

impl InterventionType {
    /// The six taxonomy properties copied onto every drawn feature.
    #[must_use]
    pub fn feature_properties(&self) -> Map<String, Value> {
        [
            ("infrastructure_type", &self.infrastructure_type),
            ("mode_class", &self.mode_class),
            ("mode", &self.mode),
            ("intervention_class", &self.intervention_class),
            ("intervention_name", &self.intervention_name),
            ("intervention", &self.intervention),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_owned(), Value::String(value.clone())))
        .collect()
    }
}

/// Ordered, immutable collection of intervention types.
///
/// # Example
///
/// ```
/// use sdca_scheme::InterventionLexicon;
///
/// let json = r#"[{
///     "infrastructure_type": "Rail",
///     "mode_class": "Rail",
///     "mode": "High speed rail",
///     "intervention_class": "New build",
///     "intervention_name": "High speed line",
///     "intervention": "hsr_line",
///     "geometry": "line"
/// }]"#;
///
/// let lexicon = InterventionLexicon::from_json(json).expect("valid lexicon");
/// assert_eq!(lexicon.len(), 1);
/// assert_eq!(lexicon.index_of("hsr_line"), Some(0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterventionLexicon {
    entries: Vec<InterventionType>,
}

impl InterventionLexicon {
    /// Builds a lexicon from already parsed entries.
    ///
    /// # Errors
    ///
    /// Returns [`LexiconError::Empty`] when `entries` is empty.
    pub fn new(entries: Vec<InterventionType>) -> Result<Self, LexiconError> {
        if entries.is_empty() {
            return Err(LexiconError::Empty);
        }
        Ok(Self { entries })
    }

    /// Parses a lexicon from a JSON array.
    ///
    /// Unknown fields on entries are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`LexiconError`] if the JSON is malformed, an entry lacks a
    /// taxonomy field, or the array is empty.
    pub fn from_json(json: &str) -> Result<Self, LexiconError> {
        let entries: Vec<InterventionType> =
            serde_json::from_str(json).map_err(|e| LexiconError::ParseError {
                message: e.to_string(),
            })?;
        Self::new(entries)
    }

    /// Loads a lexicon from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`LexiconError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, LexiconError> {
        let contents = fs::read_to_string(path).map_err(|e| LexiconError::IoError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&contents)
    }

    /// Returns the intervention type at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&InterventionType> {
        self.entries.get(index)
    }

    /// Position of the entry whose identifier is `intervention`.
    #[must_use]
    pub fn index_of(&self, intervention: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.intervention == intervention)
    }

    /// Number of intervention types.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a constructed lexicon.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in lexicon order.
    pub fn iter(&self) -> impl Iterator<Item = &InterventionType> {
        self.entries.iter()
    }
}
