//! Domain primitives, validation and the assessment pipeline.
//!
//! Purpose: keep everything that decides what a request means and how a
//! scheme is assessed free of transport and storage concerns. Inbound
//! adapters call [`validate`] and then a [`ports::SchemeAssessment`]
//! operation; outbound adapters implement the driven ports.
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic failure payload.
//! - TraceId: request correlation identifier.
//! - ApiRequest and friends: validated calls and parameters.
//! - Scheme: a structurally valid GeoJSON scheme.
//! - BufferPolicy, MaterialSiteDistance: spatial query inputs and outputs.
//! - CalculationPayload / CalculationResult: the calculator contract.
//! - SchemeAssessmentService: the pipeline itself.

pub mod api_request;
pub mod assessment;
pub mod calculation;
pub mod enrichment;
pub mod error;
pub mod lexicon;
pub mod ports;
pub mod rows;
pub mod scheme;
pub mod spatial;
pub mod trace_id;

pub use self::api_request::{
    ApiAction, ApiFormat, ApiOperation, ApiRequest, Bbox, RawParameters, TableSet, Viewport, Zoom,
    validate,
};
pub use self::assessment::SchemeAssessmentService;
pub use self::calculation::{CalculationPayload, CalculationResult, NotAnObject, RasterPaths};
pub use self::enrichment::{ReferenceData, dedupe_rows, enrich};
pub use self::error::{Error, ErrorCode};
pub use self::lexicon::{LexiconMismatch, distinct_interventions, validate_scheme};
pub use self::rows::{Row, RowGeometryError, feature_collection};
pub use self::scheme::{Scheme, SchemeError, SchemeFeature};
pub use self::spatial::{
    BufferPolicy, BufferPolicyError, FeatureBuffer, MaterialSiteDistance, feature_buffers,
    length_km, nearest_per_type, scheme_geometries,
};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use sdca_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::invalid_request("No bbox was supplied."))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
