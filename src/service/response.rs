use http::StatusCode;
use reqwest::Response;
use serde::de::DeserializeOwned;
use tracing::error;

use crate::errors::{ErrorOutcome, MaskinportenError, Result, OTHER_ERROR_KIND};

/// Read a response and deserialize a success body as `T`, or raise a
/// classified request error.
pub async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;
    parse_body(status, &body)
}

pub fn parse_body<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T> {
    let outcome = if status.is_success() {
        match serde_json::from_str::<T>(body) {
            Ok(value) => return Ok(value),
            Err(e) => ErrorOutcome::new(OTHER_ERROR_KIND, format!("malformed success body: {}", e)),
        }
    } else {
        ErrorOutcome::classify(body)
    };

    error!(
        error_type = %outcome.kind,
        description = %outcome.description,
        status = status.as_u16(),
        "token request failed"
    );
    Err(MaskinportenError::Request { outcome, status })
}
