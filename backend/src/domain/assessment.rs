//! Scheme assessment service.
//!
//! Implements the [`SchemeAssessment`] driving port by running the pipeline
//! stages in order: lexicon check, reference-data enrichment, desire-line
//! selection, material-site distances, then the external calculator. Each
//! stage fails fast; nothing partial leaves the service.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use sdca_scheme::InterventionLexicon;
use serde_json::json;
use tracing::{debug, info, warn};

use super::enrichment::enrich;
use super::lexicon::{LexiconMismatch, distinct_interventions, validate_scheme};
use super::ports::{
    CarbonCalculator, CarbonCalculatorError, ReferenceDataRepository,
    ReferenceDataRepositoryError, SchemeAssessment, SpatialRepository, SpatialRepositoryError,
};
use super::{
    Bbox, BufferPolicy, CalculationPayload, CalculationResult, Error, MaterialSiteDistance,
    RasterPaths, Row, Scheme, TableSet, feature_buffers, feature_collection, nearest_per_type,
    scheme_geometries,
};

const DATABASE_UNAVAILABLE: &str = "Unable to connect to the database.";
const DATABASE_FAILED: &str = "The reference data could not be retrieved.";
const INTERVENTION_TOO_LARGE: &str =
    "The intervention is too large to assess. Try drawing a shorter scheme.";
const CALCULATION_FAILED: &str = "The carbon calculation could not be completed.";
const CALCULATION_TIMEOUT: &str = "The carbon calculation took too long to complete.";

/// Assessment service wiring the driven ports together.
pub struct SchemeAssessmentService<R: ?Sized, S: ?Sized, C: ?Sized> {
    lexicon: Arc<InterventionLexicon>,
    reference_data: Arc<R>,
    spatial: Arc<S>,
    calculator: Arc<C>,
    buffer_policy: BufferPolicy,
    rasters: RasterPaths,
}

impl<R: ?Sized, S: ?Sized, C: ?Sized> Clone for SchemeAssessmentService<R, S, C> {
    fn clone(&self) -> Self {
        Self {
            lexicon: Arc::clone(&self.lexicon),
            reference_data: Arc::clone(&self.reference_data),
            spatial: Arc::clone(&self.spatial),
            calculator: Arc::clone(&self.calculator),
            buffer_policy: self.buffer_policy,
            rasters: self.rasters.clone(),
        }
    }
}

impl<R: ?Sized, S: ?Sized, C: ?Sized> SchemeAssessmentService<R, S, C> {
    /// Create a service over the given ports with default buffering and no
    /// raster paths.
    pub fn new(
        lexicon: Arc<InterventionLexicon>,
        reference_data: Arc<R>,
        spatial: Arc<S>,
        calculator: Arc<C>,
    ) -> Self {
        Self {
            lexicon,
            reference_data,
            spatial,
            calculator,
            buffer_policy: BufferPolicy::default(),
            rasters: RasterPaths::default(),
        }
    }

    /// Override the buffer policy.
    pub fn with_buffer_policy(mut self, policy: BufferPolicy) -> Self {
        self.buffer_policy = policy;
        self
    }

    /// Set the raster datasets passed to the calculator.
    pub fn with_rasters(mut self, rasters: RasterPaths) -> Self {
        self.rasters = rasters;
        self
    }
}

impl<R, S, C> SchemeAssessmentService<R, S, C>
where
    R: ReferenceDataRepository + ?Sized,
    S: SpatialRepository + ?Sized,
    C: CarbonCalculator + ?Sized,
{
    fn map_lexicon_error(error: LexiconMismatch) -> Error {
        Error::invalid_request(format!("An invalid scheme was supplied: {error}."))
            .with_details(json!({ "feature": error.feature() }))
    }

    fn map_reference_error(error: ReferenceDataRepositoryError) -> Error {
        warn!(error = %error, "reference data lookup failed");
        match error {
            ReferenceDataRepositoryError::Connection { .. } => {
                Error::service_unavailable(DATABASE_UNAVAILABLE)
            }
            ReferenceDataRepositoryError::Query { .. } => {
                Error::service_unavailable(DATABASE_FAILED)
            }
        }
    }

    fn map_spatial_error(error: SpatialRepositoryError) -> Error {
        warn!(error = %error, "spatial query failed");
        match error {
            SpatialRepositoryError::ResourceExhausted { .. } => {
                Error::intervention_too_large(INTERVENTION_TOO_LARGE)
            }
            SpatialRepositoryError::Connection { .. } => {
                Error::service_unavailable(DATABASE_UNAVAILABLE)
            }
            SpatialRepositoryError::Query { .. } => Error::service_unavailable(DATABASE_FAILED),
        }
    }

    fn map_calculator_error(error: CarbonCalculatorError) -> Error {
        warn!(error = %error, "calculation failed");
        match error {
            CarbonCalculatorError::Timeout { .. } => {
                Error::calculation_timeout(CALCULATION_TIMEOUT)
            }
            CarbonCalculatorError::PayloadTooLarge { .. } => {
                Error::intervention_too_large(INTERVENTION_TOO_LARGE)
            }
            CarbonCalculatorError::Spawn { .. }
            | CarbonCalculatorError::Io { .. }
            | CarbonCalculatorError::NonZeroExit { .. }
            | CarbonCalculatorError::InvalidOutput { .. }
            | CarbonCalculatorError::OutputTooLarge { .. } => {
                Error::calculation_failed(CALCULATION_FAILED)
            }
        }
    }

    async fn select_desire_lines(&self, scheme: &Scheme) -> Result<Vec<Row>, Error> {
        let buffers = feature_buffers(scheme, &self.buffer_policy);
        let rows = self
            .spatial
            .desire_lines_near(&buffers)
            .await
            .map_err(Self::map_spatial_error)?;
        debug!(
            features = buffers.len(),
            desire_lines = rows.len(),
            "desire lines selected"
        );
        Ok(rows)
    }

    async fn nearest_material_sites(
        &self,
        scheme: &Scheme,
    ) -> Result<Vec<MaterialSiteDistance>, Error> {
        let rows = self
            .spatial
            .material_site_distances(&scheme_geometries(scheme))
            .await
            .map_err(Self::map_spatial_error)?;
        Ok(nearest_per_type(rows))
    }
}

#[async_trait]
impl<R, S, C> SchemeAssessment for SchemeAssessmentService<R, S, C>
where
    R: ReferenceDataRepository + ?Sized,
    S: SpatialRepository + ?Sized,
    C: CarbonCalculator + ?Sized,
{
    async fn calculate(&self, scheme: &Scheme) -> Result<CalculationResult, Error> {
        let started = Instant::now();
        let entries = validate_scheme(scheme, &self.lexicon).map_err(Self::map_lexicon_error)?;
        let interventions = distinct_interventions(&entries);

        let reference = enrich(self.reference_data.as_ref(), &interventions)
            .await
            .map_err(Self::map_reference_error)?;
        let desire_lines = self.select_desire_lines(scheme).await?;
        let desire_lines = feature_collection(&desire_lines).map_err(|err| {
            warn!(error = %err, "desire line geometry unusable");
            Error::internal(format!("desire line geometry unusable: {err}"))
        })?;
        let material_sites = self.nearest_material_sites(scheme).await?;

        let payload = CalculationPayload::new(
            scheme,
            reference,
            desire_lines,
            material_sites,
            &self.rasters,
        );
        let result = self
            .calculator
            .calculate(&payload)
            .await
            .map_err(Self::map_calculator_error)?;

        info!(
            features = scheme.features().len(),
            interventions = interventions.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "scheme assessed"
        );
        Ok(result)
    }

    async fn desire_lines(&self, scheme: &Scheme) -> Result<Vec<Row>, Error> {
        self.select_desire_lines(scheme).await
    }

    async fn material_sites(&self, scheme: &Scheme) -> Result<Vec<MaterialSiteDistance>, Error> {
        self.nearest_material_sites(scheme).await
    }

    async fn locations(&self, bbox: &Bbox, tables: TableSet) -> Result<Vec<Row>, Error> {
        let rows = self
            .spatial
            .zones_in_view(bbox, tables)
            .await
            .map_err(Self::map_spatial_error)?;
        debug!(zones = rows.len(), table_prefix = tables.prefix(), "zones selected");
        Ok(rows)
    }
}

#[cfg(test)]
#[path = "assessment_tests.rs"]
mod tests;
