// tests/common/mod.rs
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use httpmock::MockServer;
use jsonwebtoken::DecodingKey;
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::RsaPrivateKey;
pub use serde_json::json;

use crate::cache::{MemoryTokenCache, TokenCacheProvider, TokenResponse};
use crate::credentials::{ClientSecrets, SigningKey};
use crate::environment::{EndpointSet, Environment};
use crate::identity::ClientIdentity;
use crate::service::MaskinportenService;

pub const TEST_AUDIENCE: &str = "https://test.maskinporten.no/";
pub const TEST_KID: &str = "test-kid";

static TEST_KEY: OnceLock<RsaPrivateKey> = OnceLock::new();

/// One RSA key per test binary, key generation is slow.
pub fn test_key() -> &'static RsaPrivateKey {
    TEST_KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::rngs::OsRng, 2048).expect("rsa key"))
}

pub fn rsa_pem() -> String {
    test_key().to_pkcs1_pem(LineEnding::LF).expect("pem").to_string()
}

pub fn jwk_json() -> String {
    let key = test_key();
    let b64 = |n: &rsa::BigUint| URL_SAFE_NO_PAD.encode(n.to_bytes_be());
    json!({
        "kty": "RSA",
        "kid": TEST_KID,
        "alg": "RS256",
        "n": b64(key.n()),
        "e": b64(key.e()),
        "d": b64(key.d()),
        "p": b64(&key.primes()[0]),
        "q": b64(&key.primes()[1]),
    })
    .to_string()
}

pub fn decoding_key() -> DecodingKey {
    let key = test_key();
    let n = URL_SAFE_NO_PAD.encode(key.n().to_bytes_be());
    let e = URL_SAFE_NO_PAD.encode(key.e().to_bytes_be());
    DecodingKey::from_rsa_components(&n, &e).expect("decoding key")
}

pub fn jwk_secrets() -> ClientSecrets {
    ClientSecrets::Key(SigningKey::from_jwk_json(&jwk_json()).expect("jwk"))
}

pub fn identity(client_id: &str) -> ClientIdentity {
    ClientIdentity::new(client_id, Environment::Ver2, "altinn:serviceowner/instances.read")
}

pub fn endpoints(server: &MockServer) -> EndpointSet {
    EndpointSet {
        audience: TEST_AUDIENCE.to_owned(),
        token: server.url("/token"),
        exchange: server.url("/exchange"),
    }
}

/// Service talking to `server`, with its own cache.
pub fn service_for(server: &MockServer, cache: Arc<dyn TokenCacheProvider>) -> MaskinportenService {
    MaskinportenService::new()
        .expect("service")
        .with_endpoints(endpoints(server))
        .with_cache(cache)
}

pub fn fresh_cache() -> Arc<MemoryTokenCache> {
    Arc::new(MemoryTokenCache::new())
}

pub fn token_body(access_token: &str, expires_in: u64) -> serde_json::Value {
    json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": expires_in,
        "scope": "altinn:serviceowner/instances.read"
    })
}

/// Cache that records the TTL of every write and can be told to fail writes.
#[derive(Default)]
pub struct RecordingCache {
    inner: MemoryTokenCache,
    pub ttls: Mutex<HashMap<String, Duration>>,
    pub fail_writes: bool,
}

impl RecordingCache {
    pub fn failing() -> Self {
        Self { fail_writes: true, ..Default::default() }
    }

    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        self.ttls.lock().expect("ttls").get(key).copied()
    }
}

#[async_trait]
impl TokenCacheProvider for RecordingCache {
    async fn try_get(&self, key: &str) -> Result<Option<TokenResponse>> {
        self.inner.try_get(key).await
    }

    async fn set(&self, key: &str, value: TokenResponse, ttl: Duration) -> Result<()> {
        self.ttls.lock().expect("ttls").insert(key.to_owned(), ttl);
        if self.fail_writes {
            return Err(anyhow!("cache backend unavailable"));
        }
        self.inner.set(key, value, ttl).await
    }
}
