//! Scheme design state for the carbon assessment tool.
//!
//! This crate holds everything the map front end needs to know about the
//! scheme a user is drawing, independent of any UI toolkit:
//!
//! - the intervention lexicon, loaded from JSON
//! - the ordered registry of drawn interventions, with GeoJSON import and
//!   export
//! - a single application state value mutated only through actions, with
//!   subscribers notified after each change
//! - a gate that skips recalculation when the scheme has not changed
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use geojson::{Geometry, Value};
//! use sdca_scheme::{Action, AppState, CalculationRequest, InterventionLexicon};
//!
//! let lexicon = InterventionLexicon::from_json(r#"[{
//!     "infrastructure_type": "Rail",
//!     "mode_class": "Rail",
//!     "mode": "High speed rail",
//!     "intervention_class": "New build",
//!     "intervention_name": "High speed line",
//!     "intervention": "hsr_line"
//! }]"#).expect("valid lexicon");
//!
//! let mut state = AppState::new(Arc::new(lexicon), Arc::new(mockable::DefaultClock));
//! state.dispatch(Action::SelectInterventionType(0)).expect("select");
//! let line = Geometry::new(Value::LineString(vec![vec![0.0, 51.0], vec![0.1, 51.1]]));
//! state.dispatch(Action::CommitDrawing(line)).expect("commit");
//!
//! assert!(matches!(
//!     state.prepare_calculation(),
//!     Ok(CalculationRequest::Submit { .. })
//! ));
//! ```

mod error;
mod gate;
mod lexicon;
mod registry;
mod state;

#[cfg(test)]
mod test_support;

pub use error::{LexiconError, RegistryError, StateError};
pub use gate::{CalculationGate, GateDecision};
pub use lexicon::{DrawingGeometry, InterventionLexicon, InterventionType};
pub use registry::{
    ImportReport, Intervention, InterventionRegistry, InterventionSummary, RegistryStamp,
    parse_type_index,
};
pub use state::{
    Action, AppState, CalculationRequest, MapMode, Panel, StateChange, SubscriptionId,
};
