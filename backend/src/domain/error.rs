//! Failures of the assessment pipeline.
//!
//! Every stage fails fast with an [`Error`]; no partial result survives.
//! The category is an [`ErrorCode`], which the HTTP adapter turns into a
//! status, while the message is what the map client shows the user. Port
//! failures are mapped here with generic messages so database and process
//! detail stays in the logs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::TraceId;

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// A request parameter or the submitted scheme is missing or malformed.
    InvalidRequest,
    /// The drawn scheme exhausted resources while being queried.
    InterventionTooLarge,
    /// The external calculator failed or produced unusable output.
    CalculationFailed,
    /// The external calculator did not finish in time.
    CalculationTimeout,
    /// The reference data store could not be reached or queried.
    ServiceUnavailable,
    /// An unexpected error occurred inside the service.
    InternalError,
}

impl ErrorCode {
    /// Whether the user can fix the request and try again.
    pub const fn is_client_error(self) -> bool {
        matches!(self, Self::InvalidRequest | Self::InterventionTooLarge)
    }
}

/// A pipeline failure with its user-facing message.
///
/// The message is never blank. The trace identifier in scope at
/// construction is captured, so errors raised deep in the pipeline still
/// correlate with the request log.
///
/// # Examples
/// ```
/// use sdca_backend::domain::{Error, ErrorCode};
///
/// let err = Error::invalid_request("No bbox was supplied.");
/// assert_eq!(err.code(), ErrorCode::InvalidRequest);
/// assert_eq!(err.message(), "No bbox was supplied.");
/// assert!(err.code().is_client_error());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    code: ErrorCode,
    message: String,
    trace_id: Option<String>,
    details: Option<Value>,
}

impl Error {
    /// Create an error; a blank message becomes "Unknown error".
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            "Unknown error".to_owned()
        } else {
            message
        };
        Self {
            code,
            message,
            trace_id: TraceId::current().map(|id| id.to_string()),
            details: None,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message returned to clients.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Trace identifier captured when the error was created.
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Supplementary structured details.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Attach an explicit trace identifier.
    pub fn with_trace_id(mut self, id: impl Into<String>) -> Self {
        self.trace_id = Some(id.into());
        self
    }

    /// Attach structured details.
    ///
    /// # Examples
    /// ```
    /// use sdca_backend::domain::Error;
    /// use serde_json::json;
    ///
    /// let err = Error::invalid_request("bad").with_details(json!({ "field": "bbox" }));
    /// assert!(err.details().is_some());
    /// ```
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Convenience constructor for [`ErrorCode::InterventionTooLarge`].
    pub fn intervention_too_large(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InterventionTooLarge, message)
    }

    /// Convenience constructor for [`ErrorCode::CalculationFailed`].
    pub fn calculation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CalculationFailed, message)
    }

    /// Convenience constructor for [`ErrorCode::CalculationTimeout`].
    pub fn calculation_timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CalculationTimeout, message)
    }

    /// Convenience constructor for [`ErrorCode::ServiceUnavailable`].
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests;
