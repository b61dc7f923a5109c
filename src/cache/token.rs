use serde::{Deserialize, Serialize};

/// Access token as issued by the authority (or synthesized by an exchange).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64, // seconds
    #[serde(default)]
    pub scope: String,
}

impl TokenResponse {
    pub fn new(access_token: String, token_type: String, expires_in: u64, scope: String) -> Self {
        Self { access_token, token_type, expires_in, scope }
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}
