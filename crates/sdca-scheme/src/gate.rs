//! Submission de-duplication for calculation requests.
//!
//! A calculation is only submitted when the registry has changed since the
//! last successful one. Failed calculations never populate the cache, so a
//! retry after an error always resubmits.

use serde_json::Value;

use crate::registry::RegistryStamp;

/// What to do with a calculation request.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision<'a> {
    /// The registry is unchanged; reuse the cached result.
    UseCached(&'a Value),
    /// The registry changed; submit and record the result against `stamp`.
    Submit(RegistryStamp),
}

/// Remembers the stamp and result of the last successful calculation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalculationGate {
    last: Option<(RegistryStamp, Value)>,
}

impl CalculationGate {
    /// Creates a gate with nothing cached.
    #[must_use]
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Decides whether the registry at `current` needs a fresh calculation.
    #[must_use]
    pub fn decide(&self, current: RegistryStamp) -> GateDecision<'_> {
        match &self.last {
            Some((stamp, result)) if *stamp == current => GateDecision::UseCached(result),
            _ => GateDecision::Submit(current),
        }
    }

    /// Records a successful calculation for the registry at `stamp`.
    pub fn record_success(&mut self, stamp: RegistryStamp, result: Value) {
        self.last = Some((stamp, result));
    }

    /// The last successful result, whatever its stamp.
    #[must_use]
    pub fn cached_result(&self) -> Option<&Value> {
        self.last.as_ref().map(|(_, result)| result)
    }

    /// Forgets the cached result.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
