//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod carbon_calculator;
mod reference_data_repository;
mod scheme_assessment;
mod spatial_repository;

#[cfg(test)]
pub use carbon_calculator::MockCarbonCalculator;
pub use carbon_calculator::{CarbonCalculator, CarbonCalculatorError, FixtureCarbonCalculator};
#[cfg(test)]
pub use reference_data_repository::MockReferenceDataRepository;
pub use reference_data_repository::{
    FixtureReferenceDataRepository, ReferenceDataRepository, ReferenceDataRepositoryError,
};
#[cfg(test)]
pub use scheme_assessment::MockSchemeAssessment;
pub use scheme_assessment::SchemeAssessment;
#[cfg(test)]
pub use spatial_repository::MockSpatialRepository;
pub use spatial_repository::{
    FixtureSpatialRepository, SpatialRepository, SpatialRepositoryError,
};
