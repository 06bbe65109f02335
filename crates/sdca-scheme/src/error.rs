//! Error types for the sdca-scheme crate.
//!
//! Each concern gets its own enum so callers can match on the failure they
//! can actually handle.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading the intervention lexicon.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexiconError {
    /// The lexicon file could not be read.
    #[error("failed to read lexicon file at '{path}': {message}")]
    IoError {
        /// Path to the lexicon file.
        path: PathBuf,
        /// Description of the I/O error.
        message: String,
    },

    /// The lexicon JSON is malformed or missing required fields.
    #[error("invalid lexicon JSON: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
    },

    /// The lexicon contains no intervention types.
    #[error("lexicon contains no intervention types")]
    Empty,
}

/// Errors raised by registry mutations and imports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No intervention exists at the requested position.
    #[error("no intervention at index {index}; registry holds {len}")]
    IndexOutOfRange {
        /// Requested position.
        index: usize,
        /// Number of interventions in the registry.
        len: usize,
    },

    /// The intervention type index is not present in the lexicon.
    #[error("unknown intervention type index {index}")]
    UnknownInterventionType {
        /// Offending type index.
        index: usize,
    },

    /// A drawing with no coordinates was committed.
    #[error("geometry has no coordinates")]
    EmptyGeometry,

    /// The drawn shape is not the kind the intervention type expects.
    #[error("expected a {expected} geometry, found {found}")]
    GeometryMismatch {
        /// GeoJSON type the intervention type is drawn as.
        expected: String,
        /// GeoJSON type that was supplied.
        found: String,
    },

    /// An imported scheme file could not be understood.
    #[error("invalid scheme file: {message}")]
    ImportError {
        /// Description of the problem.
        message: String,
    },
}

/// Errors raised when an action is not valid in the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// A drawing was committed before an intervention type was chosen.
    #[error("no intervention type is selected")]
    NoInterventionTypeSelected,

    /// An edit-only action was dispatched while not editing.
    #[error("no intervention is being edited")]
    NotEditing,

    /// Calculation was requested for an empty scheme.
    #[error("the scheme has no interventions to assess")]
    EmptyScheme,

    /// The registry rejected the change.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
