//! Tests for domain error construction and trace capture.

use super::*;
use rstest::{fixture, rstest};
use serde_json::json;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn expected_trace_id() -> String {
    TRACE_ID.to_owned()
}

#[rstest]
#[case(Error::invalid_request("bad"), ErrorCode::InvalidRequest)]
#[case(Error::intervention_too_large("big"), ErrorCode::InterventionTooLarge)]
#[case(Error::calculation_failed("failed"), ErrorCode::CalculationFailed)]
#[case(Error::calculation_timeout("slow"), ErrorCode::CalculationTimeout)]
#[case(Error::service_unavailable("down"), ErrorCode::ServiceUnavailable)]
#[case(Error::internal("boom"), ErrorCode::InternalError)]
fn constructors_set_codes(#[case] error: Error, #[case] expected: ErrorCode) {
    assert_eq!(error.code(), expected);
}

#[rstest]
#[case(ErrorCode::InvalidRequest, true)]
#[case(ErrorCode::InterventionTooLarge, true)]
#[case(ErrorCode::CalculationFailed, false)]
#[case(ErrorCode::CalculationTimeout, false)]
#[case(ErrorCode::ServiceUnavailable, false)]
#[case(ErrorCode::InternalError, false)]
fn only_request_problems_are_client_errors(#[case] code: ErrorCode, #[case] expected: bool) {
    assert_eq!(code.is_client_error(), expected);
}

#[rstest]
#[case("")]
#[case("   ")]
fn blank_messages_are_replaced(#[case] message: &str) {
    assert_eq!(Error::internal(message).message(), "Unknown error");
}

#[rstest]
fn trace_id_is_absent_out_of_scope() {
    assert!(Error::internal("boom").trace_id().is_none());
}

#[rstest]
#[tokio::test]
async fn trace_id_is_captured_in_scope(expected_trace_id: String) {
    let trace_id: TraceId = expected_trace_id.parse().expect("valid UUID");
    let error = TraceId::scope(trace_id, async { Error::invalid_request("bad") }).await;
    assert_eq!(error.trace_id(), Some(expected_trace_id.as_str()));
}

#[rstest]
fn explicit_trace_id_and_details_are_kept(expected_trace_id: String) {
    let error = Error::invalid_request("An invalid scheme was supplied.")
        .with_trace_id(expected_trace_id.clone())
        .with_details(json!({ "feature": 2 }));

    assert_eq!(error.trace_id(), Some(expected_trace_id.as_str()));
    assert_eq!(error.details(), Some(&json!({ "feature": 2 })));
    assert_eq!(error.to_string(), "An invalid scheme was supplied.");
}

#[rstest]
fn codes_serialise_in_snake_case() {
    assert_eq!(
        serde_json::to_value(ErrorCode::InterventionTooLarge).expect("serialise code"),
        json!("intervention_too_large")
    );
}
