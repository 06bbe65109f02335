//! Adapters for the external carbon calculator.

mod process_calculator;

pub use process_calculator::{ProcessCalculator, ProcessCalculatorConfig};
