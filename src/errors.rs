use http::StatusCode;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Marker used as the description when the authority returned an empty error body.
pub const EMPTY_BODY_MARKER: &str = "<empty>";
/// Kind assigned to error bodies that are not a structured authority error.
pub const OTHER_ERROR_KIND: &str = "Other";

/// Classified failure returned by the authority or the exchange platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorOutcome {
    #[serde(rename = "error", alias = "errorType")]
    pub kind: String,
    #[serde(rename = "error_description", alias = "description", default, deserialize_with = "null_as_empty")]
    pub description: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl ErrorOutcome {
    pub fn new(kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self { kind: kind.into(), description: description.into() }
    }

    /// Classify a raw error body. Any document with an `error` kind is
    /// structured, with a missing or null description left empty. Anything
    /// else becomes an `Other` outcome carrying the raw body.
    pub fn classify(body: &str) -> Self {
        serde_json::from_str::<ErrorOutcome>(body).unwrap_or_else(|_| {
            let description = if body.is_empty() { EMPTY_BODY_MARKER } else { body };
            ErrorOutcome::new(OTHER_ERROR_KIND, description)
        })
    }
}

#[derive(Debug, Error)]
pub enum MaskinportenError {
    /// Caller misuse: unknown environment, missing or unusable credential material.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The authority rejected the request or answered with an unusable body.
    #[error("token request failed ({status}): {}", .outcome.description)]
    Request { outcome: ErrorOutcome, status: StatusCode },

    #[error("failed to sign assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// Transport failures are passed through untouched.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl MaskinportenError {
    pub fn configuration(message: impl Into<String>) -> Self {
        MaskinportenError::Configuration(message.into())
    }

    /// Description of the classified outcome for request errors.
    pub fn description(&self) -> Option<&str> {
        match self {
            MaskinportenError::Request { outcome, .. } => Some(outcome.description.as_str()),
            _ => None,
        }
    }
}

pub type Result<T, E = MaskinportenError> = std::result::Result<T, E>;
