//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on the assessment use-case and remain testable without I/O.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::ports::SchemeAssessment;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Assessment pipeline behind every data call.
    pub assessment: Arc<dyn SchemeAssessment>,
    /// Wall clock used to stamp CSV attachment names.
    pub clock: Arc<dyn Clock>,
}

impl HttpState {
    /// Construct state from the assessment port and a clock.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use mockable::DefaultClock;
    /// use sdca_backend::domain::SchemeAssessmentService;
    /// use sdca_backend::domain::ports::{
    ///     FixtureCarbonCalculator, FixtureReferenceDataRepository, FixtureSpatialRepository,
    /// };
    /// use sdca_backend::inbound::http::state::HttpState;
    /// use sdca_scheme::InterventionLexicon;
    ///
    /// let service = SchemeAssessmentService::new(
    ///     Arc::new(InterventionLexicon::from_json(r#"[{
    ///         "infrastructure_type": "Rail",
    ///         "mode_class": "Rail",
    ///         "mode": "High speed rail",
    ///         "intervention_class": "New build",
    ///         "intervention_name": "High speed line",
    ///         "intervention": "hsr_line"
    ///     }]"#).expect("lexicon")),
    ///     Arc::new(FixtureReferenceDataRepository),
    ///     Arc::new(FixtureSpatialRepository),
    ///     Arc::new(FixtureCarbonCalculator),
    /// );
    /// let state = HttpState::new(Arc::new(service), Arc::new(DefaultClock));
    /// # let _ = state;
    /// ```
    pub fn new(assessment: Arc<dyn SchemeAssessment>, clock: Arc<dyn Clock>) -> Self {
        Self { assessment, clock }
    }
}
