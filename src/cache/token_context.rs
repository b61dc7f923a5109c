use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::cache::token::TokenResponse;

/// Cached token with its absolute expiry
#[derive(Debug, Clone)]
pub struct CachedToken {
    pub token: TokenResponse,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn new(token: TokenResponse, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = Utc::now().checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { token, expires_at }
    }

    /// A zero TTL entry is expired as soon as it is stored.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}
