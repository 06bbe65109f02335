//! Driven port for the out-of-process carbon calculator.
//!
//! The calculator is opaque: it reads a [`CalculationPayload`] as JSON on
//! standard input and writes a [`CalculationResult`] as JSON on standard
//! output. A calculation is attempted once; callers decide what a failure
//! means for the user.

use async_trait::async_trait;
use serde_json::json;

use crate::domain::{CalculationPayload, CalculationResult};

use super::define_port_error;

define_port_error! {
    /// Errors raised while running a calculation.
    pub enum CarbonCalculatorError {
        /// The calculator could not be started.
        Spawn { message: String } =>
            "calculator could not be started: {message}",
        /// Writing the payload or reading the output failed.
        Io { message: String } =>
            "calculator i/o failed: {message}",
        /// The calculator exited unsuccessfully; its output was discarded.
        NonZeroExit { status: String } =>
            "calculator exited unsuccessfully: {status}",
        /// The calculator exited cleanly but its output was unusable.
        InvalidOutput { message: String } =>
            "calculator output is not usable: {message}",
        /// The calculator did not finish in time and was killed.
        Timeout { seconds: u64 } =>
            "calculator timed out after {seconds}s",
        /// The serialised payload exceeds the configured limit.
        PayloadTooLarge { size: usize, limit: usize } =>
            "calculation payload of {size} bytes exceeds {limit} bytes",
        /// The calculator wrote more than the configured limit.
        OutputTooLarge { limit: usize } =>
            "calculator output exceeds {limit} bytes",
    }
}

/// Port for running a calculation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CarbonCalculator: Send + Sync {
    /// Runs one calculation for `payload`.
    async fn calculate(
        &self,
        payload: &CalculationPayload,
    ) -> Result<CalculationResult, CarbonCalculatorError>;
}

/// Fixture calculator returning an empty but well-formed result.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCarbonCalculator;

#[async_trait]
impl CarbonCalculator for FixtureCarbonCalculator {
    async fn calculate(
        &self,
        _payload: &CalculationPayload,
    ) -> Result<CalculationResult, CarbonCalculatorError> {
        CalculationResult::from_value(json!({
            "pas2080": [],
            "timeseries": [],
            "demand_change": [],
            "itemised_emissions": [],
            "netzero_compatible": null,
            "payback_time": null,
            "emissions_whole_life": null,
            "emissions_whole_life_benefits": null,
            "emissions_upfront": null,
            "comments": [],
            "geometry": { "type": "FeatureCollection", "features": [] },
        }))
        .map_err(|e| CarbonCalculatorError::invalid_output(e.to_string()))
    }
}
