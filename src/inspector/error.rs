//! Inspector error kinds
//!
//! Every error here is a client error: the request was understood but its
//! input was rejected. The wire code is what the JSON 1.1 protocol puts in
//! the `__type` field of the error document.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, InspectorError>;

/// Errors surfaced by the backend and the dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InspectorError {
    /// Malformed resource group tag (missing key or value)
    #[error("{0}")]
    InvalidFilterKey(String),

    /// Filter with a disallowed shape or malformed parameters
    #[error("{0}")]
    InvalidFilterValue(String),

    /// Referenced entity does not exist in this region
    #[error("{entity} {arn} does not exist")]
    NoSuchEntity { entity: &'static str, arn: String },

    /// Missing or mistyped request parameter
    #[error("{0}")]
    InvalidInput(String),

    #[error("Operation {0} is not supported")]
    UnknownOperation(String),

    #[error("Region {0} is not served by this endpoint")]
    UnsupportedRegion(String),

    /// Request body could not be parsed as JSON
    #[error("{0}")]
    Serialization(String),
}

impl InspectorError {
    /// Code reported in the `__type` field of the error document
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFilterKey(_) => "InvalidFilterKey",
            Self::InvalidFilterValue(_) => "InvalidFilterValue",
            Self::NoSuchEntity { .. } => "NoSuchEntityException",
            Self::InvalidInput(_) => "InvalidInputException",
            Self::UnknownOperation(_) => "UnknownOperationException",
            Self::UnsupportedRegion(_) => "UnrecognizedClientException",
            Self::Serialization(_) => "SerializationException",
        }
    }

    /// HTTP status for this error; all of them are client errors
    pub fn status_code(&self) -> u16 {
        400
    }

    pub fn invalid_filter_value(key: &str, expected: &str) -> Self {
        Self::InvalidFilterValue(format!(
            "Invalid value for filter {}: expected {}",
            key, expected
        ))
    }

    pub fn missing_param(name: &str) -> Self {
        Self::InvalidInput(format!("Missing required parameter: {}", name))
    }
}
