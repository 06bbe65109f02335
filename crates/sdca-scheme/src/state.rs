//! Front-end application state driven by explicit actions.
//!
//! All UI state lives in one [`AppState`] value. Views send [`Action`]s to
//! [`AppState::dispatch`] and learn about the outcome through subscribed
//! callbacks, each receiving the [`StateChange`] and the updated state.

use std::fmt;
use std::sync::Arc;

use geojson::Geometry;
use mockable::Clock;
use serde_json::Value;

use crate::error::{RegistryError, StateError};
use crate::gate::{CalculationGate, GateDecision};
use crate::lexicon::InterventionLexicon;
use crate::registry::{Intervention, InterventionRegistry, RegistryStamp};

/// What the map is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapMode {
    /// Every registered intervention, nothing being drawn.
    #[default]
    ViewAll,
    /// Redrawing an existing intervention.
    Edit,
    /// Drawing a new intervention.
    New,
}

/// Side panel in view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Panel {
    /// Scheme overview, shown at startup.
    #[default]
    DesignScheme,
    /// Intervention picker.
    SearchForIntervention,
    /// Drawing or editing an intervention.
    DrawIntervention,
    /// Calculation results.
    ViewResults,
    /// Temporary data layer browser.
    DataLayers,
}

impl Panel {
    /// Temporary panels are left by returning to the previous panel.
    #[must_use]
    pub const fn is_temporary(self) -> bool {
        matches!(self, Self::DataLayers)
    }
}

/// User intent sent to [`AppState::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Choose a lexicon entry to draw.
    SelectInterventionType(usize),
    /// Start redrawing the intervention at this registry index.
    BeginEdit(usize),
    /// Abandon the current drawing or edit.
    CancelEdit,
    /// Finish the current drawing with this geometry.
    CommitDrawing(Geometry),
    /// Delete the intervention being edited.
    DeleteEditedIntervention,
    /// Empty the scheme.
    ClearScheme,
    /// Replace the scheme with the contents of a GeoJSON file.
    ImportScheme(String),
    /// Change the map mode directly.
    SetMapMode(MapMode),
    /// Show a panel.
    SwitchPanel(Panel),
    /// Return to the previous panel.
    Back,
}

/// Notification delivered to subscribers after a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    /// A lexicon entry was chosen for drawing.
    InterventionTypeSelected {
        /// Lexicon index.
        index: usize,
    },
    /// An existing intervention is being edited.
    EditingStarted {
        /// Registry index.
        index: usize,
    },
    /// Drawing or editing was abandoned.
    EditingCancelled,
    /// A new intervention joined the scheme.
    InterventionAdded {
        /// Assigned id.
        id: usize,
    },
    /// An intervention was redrawn.
    InterventionUpdated {
        /// Registry index.
        index: usize,
    },
    /// An intervention was deleted.
    InterventionDeleted {
        /// Former registry index.
        index: usize,
    },
    /// The scheme was emptied.
    SchemeCleared,
    /// The scheme was replaced from a file.
    SchemeImported {
        /// Features accepted.
        imported: usize,
        /// Features dropped.
        discarded: usize,
    },
    /// The map mode changed.
    MapModeChanged(MapMode),
    /// The panel in view changed.
    PanelChanged {
        /// Panel left.
        from: Panel,
        /// Panel shown.
        to: Panel,
    },
    /// A calculation result is available.
    ResultsReady,
}

/// Handle returned by [`AppState::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&StateChange, &AppState)>;

/// Outcome of [`AppState::prepare_calculation`].
#[derive(Debug, Clone, PartialEq)]
pub enum CalculationRequest<'a> {
    /// The scheme is unchanged since the last success.
    UseCached(&'a Value),
    /// Submit `scheme` and report back with `stamp`.
    Submit {
        /// Registry stamp to pass to [`AppState::complete_calculation`].
        stamp: RegistryStamp,
        /// Scheme as a GeoJSON `FeatureCollection`.
        scheme: Value,
    },
}

/// Complete front-end state.
pub struct AppState {
    lexicon: Arc<InterventionLexicon>,
    registry: InterventionRegistry,
    selected_type: Option<usize>,
    editing: Option<usize>,
    map_mode: MapMode,
    panel: Panel,
    previous_panel: Option<Panel>,
    gate: CalculationGate,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("registry", &self.registry)
            .field("selected_type", &self.selected_type)
            .field("editing", &self.editing)
            .field("map_mode", &self.map_mode)
            .field("panel", &self.panel)
            .field("previous_panel", &self.previous_panel)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Creates the startup state: empty scheme, overview panel, view-all map.
    #[must_use]
    pub fn new(lexicon: Arc<InterventionLexicon>, clock: Arc<dyn Clock>) -> Self {
        Self {
            lexicon,
            registry: InterventionRegistry::new(clock),
            selected_type: None,
            editing: None,
            map_mode: MapMode::ViewAll,
            panel: Panel::DesignScheme,
            previous_panel: None,
            gate: CalculationGate::new(),
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Intervention lexicon.
    #[must_use]
    pub fn lexicon(&self) -> &InterventionLexicon {
        &self.lexicon
    }

    /// The user's scheme.
    #[must_use]
    pub const fn registry(&self) -> &InterventionRegistry {
        &self.registry
    }

    /// Lexicon index chosen for drawing.
    #[must_use]
    pub const fn selected_type(&self) -> Option<usize> {
        self.selected_type
    }

    /// Registry index being edited.
    #[must_use]
    pub const fn editing(&self) -> Option<usize> {
        self.editing
    }

    /// Current map mode.
    #[must_use]
    pub const fn map_mode(&self) -> MapMode {
        self.map_mode
    }

    /// Panel in view.
    #[must_use]
    pub const fn panel(&self) -> Panel {
        self.panel
    }

    /// Panel shown before the current one.
    #[must_use]
    pub const fn previous_panel(&self) -> Option<Panel> {
        self.previous_panel
    }

    /// Last successful calculation result.
    #[must_use]
    pub fn results(&self) -> Option<&Value> {
        self.gate.cached_result()
    }

    /// Registers a callback invoked after every successful dispatch.
    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&StateChange, &Self) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription = self.next_subscription.saturating_add(1);
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Removes a callback. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    /// Applies `action` and notifies subscribers of each resulting change.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when the action does not apply to the current
    /// state. Nothing changes and no subscriber runs in that case.
    pub fn dispatch(&mut self, action: Action) -> Result<Vec<StateChange>, StateError> {
        let changes = self.apply(action)?;
        for change in &changes {
            self.notify(change);
        }
        Ok(changes)
    }

    fn apply(&mut self, action: Action) -> Result<Vec<StateChange>, StateError> {
        match action {
            Action::SelectInterventionType(index) => {
                if self.lexicon.get(index).is_none() {
                    return Err(RegistryError::UnknownInterventionType { index }.into());
                }
                self.selected_type = Some(index);
                self.editing = None;
                let mut changes = vec![StateChange::InterventionTypeSelected { index }];
                changes.extend(self.set_map_mode(MapMode::New));
                changes.extend(self.show_panel(Panel::DrawIntervention));
                Ok(changes)
            }
            Action::BeginEdit(index) => {
                let type_index = self
                    .registry
                    .get(index)
                    .map(Intervention::type_index)
                    .ok_or(RegistryError::IndexOutOfRange {
                        index,
                        len: self.registry.len(),
                    })?;
                self.selected_type = Some(type_index);
                self.editing = Some(index);
                let mut changes = vec![StateChange::EditingStarted { index }];
                changes.extend(self.set_map_mode(MapMode::Edit));
                changes.extend(self.show_panel(Panel::DrawIntervention));
                Ok(changes)
            }
            Action::CancelEdit => {
                let mut changes = vec![StateChange::EditingCancelled];
                changes.extend(self.finish_drawing());
                Ok(changes)
            }
            Action::CommitDrawing(geometry) => {
                let change = if let Some(index) = self.editing {
                    self.registry.replace_geometry(index, geometry)?;
                    StateChange::InterventionUpdated { index }
                } else {
                    let type_index = self
                        .selected_type
                        .ok_or(StateError::NoInterventionTypeSelected)?;
                    let id = self.registry.add(&self.lexicon, type_index, geometry)?;
                    StateChange::InterventionAdded { id }
                };
                let mut changes = vec![change];
                changes.extend(self.finish_drawing());
                Ok(changes)
            }
            Action::DeleteEditedIntervention => {
                let index = self.editing.ok_or(StateError::NotEditing)?;
                self.registry.remove(index)?;
                let mut changes = vec![StateChange::InterventionDeleted { index }];
                changes.extend(self.finish_drawing());
                Ok(changes)
            }
            Action::ClearScheme => {
                self.registry.clear();
                let mut changes = vec![StateChange::SchemeCleared];
                changes.extend(self.finish_drawing());
                Ok(changes)
            }
            Action::ImportScheme(json) => {
                let report = self.registry.import_geojson(&json, &self.lexicon)?;
                let mut changes = vec![StateChange::SchemeImported {
                    imported: report.imported,
                    discarded: report.discarded,
                }];
                changes.extend(self.finish_drawing());
                Ok(changes)
            }
            Action::SetMapMode(mode) => Ok(self.set_map_mode(mode).into_iter().collect()),
            Action::SwitchPanel(panel) => Ok(self.show_panel(panel)),
            Action::Back => Ok(match self.previous_panel {
                Some(panel) => self.show_panel(panel),
                None => Vec::new(),
            }),
        }
    }

    fn finish_drawing(&mut self) -> Vec<StateChange> {
        self.selected_type = None;
        self.editing = None;
        let mut changes: Vec<StateChange> = self.set_map_mode(MapMode::ViewAll).into_iter().collect();
        changes.extend(self.show_panel(Panel::DesignScheme));
        changes
    }

    fn set_map_mode(&mut self, mode: MapMode) -> Option<StateChange> {
        if self.map_mode == mode {
            return None;
        }
        if mode != MapMode::Edit {
            self.editing = None;
        }
        self.map_mode = mode;
        Some(StateChange::MapModeChanged(mode))
    }

    fn show_panel(&mut self, panel: Panel) -> Vec<StateChange> {
        if self.panel == panel {
            return Vec::new();
        }
        let from = self.panel;
        self.previous_panel = Some(from);
        self.panel = panel;
        let mut changes = vec![StateChange::PanelChanged { from, to: panel }];
        // Only the drawing panel keeps a drawing in progress.
        if panel != Panel::DrawIntervention {
            self.selected_type = None;
            changes.extend(self.set_map_mode(MapMode::ViewAll));
        }
        changes
    }

    fn notify(&mut self, change: &StateChange) {
        let mut subscribers = std::mem::take(&mut self.subscribers);
        for (_, callback) in &mut subscribers {
            callback(change, self);
        }
        subscribers.append(&mut self.subscribers);
        self.subscribers = subscribers;
    }

    /// Decides whether the scheme needs submitting for calculation.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::EmptyScheme`] when there is nothing to assess.
    pub fn prepare_calculation(&self) -> Result<CalculationRequest<'_>, StateError> {
        if self.registry.is_empty() {
            return Err(StateError::EmptyScheme);
        }
        Ok(match self.gate.decide(self.registry.stamp()) {
            GateDecision::UseCached(result) => CalculationRequest::UseCached(result),
            GateDecision::Submit(stamp) => CalculationRequest::Submit {
                stamp,
                scheme: self.registry.to_geojson(),
            },
        })
    }

    /// Stores a successful result and moves to the results panel.
    ///
    /// A result for a stale stamp is still shown but will not satisfy the
    /// next [`AppState::prepare_calculation`].
    pub fn complete_calculation(&mut self, stamp: RegistryStamp, result: Value) {
        self.gate.record_success(stamp, result);
        let mut changes = vec![StateChange::ResultsReady];
        changes.extend(self.show_panel(Panel::ViewResults));
        for change in &changes {
            self.notify(change);
        }
    }
}
