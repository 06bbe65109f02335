//! Scheme assessment backend: request validation, reference-data
//! enrichment, spatial selection and the external carbon calculator,
//! behind an actix-web data API.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;

pub use middleware::Trace;
/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
