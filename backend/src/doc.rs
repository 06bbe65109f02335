//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers the data API call, the health probes and the error
//! body schema. The generated document is served by Swagger UI in debug
//! builds and printed by the `openapi-dump` binary.

use utoipa::OpenApi;

use crate::domain::ErrorCode;
use crate::inbound::http::error::ErrorBody;
use crate::inbound::http::health::{AdapterKind, AdapterReport};

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "SDCA scheme assessment API",
        description = "Carbon assessment of drawn transport schemes, desire lines, \
                       material sites and carbon zones."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::api::api_call,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(ErrorBody, ErrorCode, AdapterReport, AdapterKind)),
    tags(
        (name = "api", description = "Scheme assessment data calls"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    use super::*;

    #[rstest]
    fn error_body_schema_has_error_and_code() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let schema = schemas.get("ErrorBody").expect("ErrorBody schema");

        match schema {
            RefOr::T(Schema::Object(object)) => {
                assert!(object.properties.contains_key("error"));
                assert!(object.properties.contains_key("code"));
                assert!(object.properties.contains_key("traceId"));
            }
            _ => panic!("expected object schema"),
        }
    }

    #[rstest]
    #[case("/api/v1/{call}")]
    #[case("/health/ready")]
    #[case("/health/live")]
    fn paths_are_registered(#[case] path: &str) {
        assert!(ApiDoc::openapi().paths.paths.contains_key(path));
    }
}
