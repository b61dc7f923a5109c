use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::token::TokenResponse;
use crate::cache::token_context::CachedToken;
use crate::utils::constants::CACHE_SAFETY_MARGIN_SECS;

/// Storage for issued tokens, keyed by request fingerprint.
///
/// Implementations must never return an entry whose TTL has elapsed, and an
/// entry passed to `set` must be visible to the next `try_get` right away.
#[async_trait]
pub trait TokenCacheProvider: Send + Sync {
    async fn try_get(&self, key: &str) -> Result<Option<TokenResponse>>;

    async fn set(&self, key: &str, value: TokenResponse, ttl: Duration) -> Result<()>;
}

static GLOBAL_TOKEN_CACHE: OnceLock<MemoryTokenCache> = OnceLock::new();

/// In-memory expiring map. Expired entries are dropped on read and swept on write.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenCache {
    inner: Arc<RwLock<HashMap<String, CachedToken>>>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Handle to the process-wide cache shared by every service built with defaults.
    pub fn global() -> Self {
        GLOBAL_TOKEN_CACHE
            .get_or_init(|| {
                info!("Initializing static TokenCache...");
                MemoryTokenCache::new()
            })
            .clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.values().filter(|entry| !entry.is_expired()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TokenCacheProvider for MemoryTokenCache {
    async fn try_get(&self, key: &str) -> Result<Option<TokenResponse>> {
        let map = self.inner.read().await;
        Ok(map.get(key).filter(|entry| !entry.is_expired()).map(|entry| entry.token.clone()))
    }

    async fn set(&self, key: &str, value: TokenResponse, ttl: Duration) -> Result<()> {
        let mut map = self.inner.write().await;
        map.retain(|_, entry| !entry.is_expired());
        map.insert(key.to_owned(), CachedToken::new(value, ttl));
        debug!("cached token stored, ttl {}s, entries {}", ttl.as_secs(), map.len());
        Ok(())
    }
}

/// Cache TTL for a token: `expires_in` minus the safety margin, floored at zero.
pub fn cache_ttl(expires_in: u64) -> Duration {
    Duration::from_secs(expires_in.saturating_sub(CACHE_SAFETY_MARGIN_SECS))
}

/// Cache key for an exchanged token: SHA-256 over the primary access token and the enterprise username.
pub fn exchange_cache_key(access_token: &str, enterprise_username: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(access_token.as_bytes());
    hasher.update(enterprise_username.unwrap_or_default().as_bytes());
    hex::encode(hasher.finalize())
}
