use std::sync::{Arc, LazyLock};
use std::time::Duration;

use http::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, ClientBuilder, Request};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::assertion::build_assertion;
use crate::cache::{cache_ttl, MemoryTokenCache, TokenCacheProvider, TokenResponse};
use crate::credentials::{ClientDefinition, ClientSecrets};
use crate::environment::{EndpointSet, Environment};
use crate::errors::{MaskinportenError, Result};
use crate::helpers::time::get_instant;
use crate::identity::ClientIdentity;
use crate::observability::metrics::with_metrics;
use crate::service::response::parse_response;
use crate::single_flight::SingleFlight;
use crate::utils::constants::{FLOW_ISSUE, JWT_BEARER_GRANT_TYPE};

static ISSUANCE_FLIGHTS: LazyLock<SingleFlight> = LazyLock::new(SingleFlight::new);

/// Token issuance and exchange engine.
///
/// One instance is meant to be shared by every logical client of a process;
/// cloning is cheap and clones share the HTTP client and the cache.
#[derive(Clone)]
pub struct MaskinportenService {
    pub(crate) client: Client,
    pub(crate) cache: Arc<dyn TokenCacheProvider>,
    pub(crate) endpoints: Option<EndpointSet>,
}

impl MaskinportenService {
    /// Service with a default HTTP client and the process-wide in-memory cache.
    pub fn new() -> Result<Self> {
        Self::from_builder(Client::builder())
    }

    /// Builds the HTTP transport from `builder`, adding `Accept: application/json`.
    pub fn from_builder(builder: ClientBuilder) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = builder.default_headers(headers).build()?;
        Ok(Self {
            client,
            cache: Arc::new(MemoryTokenCache::global()),
            endpoints: None,
        })
    }

    pub fn with_cache(mut self, cache: Arc<dyn TokenCacheProvider>) -> Self {
        self.cache = cache;
        self
    }

    /// Send every flow to `endpoints` instead of the environment defaults.
    pub fn with_endpoints(mut self, endpoints: EndpointSet) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    pub fn endpoints_for(&self, environment: Environment) -> EndpointSet {
        self.endpoints
            .clone()
            .unwrap_or_else(|| EndpointSet::for_environment(environment))
    }

    /// Get an access token for `identity`, from cache unless `bypass_cache` is set.
    pub async fn get_token(
        &self,
        secrets: &ClientSecrets,
        identity: &ClientIdentity,
        bypass_cache: bool,
    ) -> Result<TokenResponse> {
        self.issue(secrets, identity, bypass_cache, false).await
    }

    /// Token for a client definition, exchanged when its settings ask for it.
    ///
    /// Enterprise credentials take precedence over `exchange_to_altinn_token`.
    pub async fn get_token_for_client<D>(&self, definition: &D, bypass_cache: bool) -> Result<TokenResponse>
    where
        D: ClientDefinition + ?Sized,
    {
        let settings = definition.settings();
        let verbose = settings.verbose();
        let identity = settings.identity()?;

        let secrets = definition
            .client_secrets()
            .await
            .map_err(|e| MaskinportenError::configuration(format!("client secrets unavailable: {:#}", e)))?;
        log_step(verbose, FLOW_ISSUE, &format!("client {} using {}", identity.client_id, secrets.describe()));

        let token = self.issue(&secrets, &identity, bypass_cache, verbose).await?;

        if let Some(credentials) = settings.enterprise_credentials() {
            log_step(verbose, FLOW_ISSUE, "using enterprise username and password");
            return self
                .exchange(&token, identity.environment, Some(&credentials), false, bypass_cache, verbose)
                .await;
        }

        if settings.exchange_to_altinn_token.unwrap_or(false) {
            let is_test_org = settings.use_altinn_test_org.unwrap_or(false);
            return self
                .exchange(&token, identity.environment, None, is_test_org, bypass_cache, verbose)
                .await;
        }

        Ok(token)
    }

    async fn issue(
        &self,
        secrets: &ClientSecrets,
        identity: &ClientIdentity,
        bypass_cache: bool,
        verbose: bool,
    ) -> Result<TokenResponse> {
        let cache_key = identity.cache_key();

        if !bypass_cache {
            if let Some(token) = self.cached(FLOW_ISSUE, &cache_key).await {
                log_step(verbose, FLOW_ISSUE, "returning cached value");
                return Ok(token);
            }
        }

        let _flight = ISSUANCE_FLIGHTS.acquire(&cache_key).await;

        // a concurrent flight for the same key may have filled the cache while we waited
        if !bypass_cache {
            if let Some(token) = self.cached(FLOW_ISSUE, &cache_key).await {
                log_step(verbose, FLOW_ISSUE, "returning value cached by concurrent request");
                return Ok(token);
            }
        }
        with_metrics(|m| m.cache_misses.with_label_values(&[FLOW_ISSUE]).inc()).await;
        log_step(verbose, FLOW_ISSUE, "cache miss or cache disabled");

        let endpoints = self.endpoints_for(identity.environment);
        let assertion = build_assertion(secrets, identity, &endpoints.audience)?;
        let request = self.token_request(&endpoints.token, &assertion)?;

        log_step(verbose, FLOW_ISSUE, &format!("requesting token from {}", endpoints.token));
        let token: TokenResponse = self.send(FLOW_ISSUE, identity.environment, request).await?;
        log_step(verbose, FLOW_ISSUE, &format!("received token, expires in {} seconds", token.expires_in));

        self.store(FLOW_ISSUE, &cache_key, &token, cache_ttl(token.expires_in)).await;
        Ok(token)
    }

    /// `POST` of the JWT-bearer grant as a urlencoded form.
    pub fn token_request(&self, endpoint: &str, assertion: &str) -> Result<Request> {
        let form = [("grant_type", JWT_BEARER_GRANT_TYPE), ("assertion", assertion)];
        Ok(self.client.post(endpoint).form(&form).build()?)
    }

    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        flow: &str,
        environment: Environment,
        request: Request,
    ) -> Result<T> {
        with_metrics(|m| m.upstream_requests.with_label_values(&[flow, environment.as_str()]).inc()).await;
        let start = get_instant();

        let result = match self.client.execute(request).await {
            Ok(response) => parse_response::<T>(response).await,
            Err(e) => Err(MaskinportenError::from(e)),
        };

        let elapsed = start.elapsed().as_secs_f64();
        let failure = match &result {
            Ok(_) => None,
            Err(MaskinportenError::Transport(_)) => Some("transport"),
            Err(_) => Some("rejected"),
        };
        with_metrics(|m| {
            m.upstream_duration.with_label_values(&[flow]).observe(elapsed);
            if let Some(reason) = failure {
                m.upstream_failures.with_label_values(&[flow, reason]).inc();
            }
        })
        .await;
        result
    }

    /// Cache read; provider failures count as a miss.
    pub(crate) async fn cached(&self, flow: &str, key: &str) -> Option<TokenResponse> {
        match self.cache.try_get(key).await {
            Ok(Some(token)) => {
                with_metrics(|m| m.cache_hits.with_label_values(&[flow]).inc()).await;
                Some(token)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(flow, error = %e, "token cache read failed");
                with_metrics(|m| m.cache_failures.with_label_values(&[flow, "get"]).inc()).await;
                None
            }
        }
    }

    /// Cache write; a failing provider never fails the flow.
    pub(crate) async fn store(&self, flow: &str, key: &str, token: &TokenResponse, ttl: Duration) {
        if let Err(e) = self.cache.set(key, token.clone(), ttl).await {
            warn!(flow, error = %e, "token cache write failed, returning token uncached");
            with_metrics(|m| m.cache_failures.with_label_values(&[flow, "set"]).inc()).await;
        }
    }
}

/// Flow step logs, raised to INFO for clients with debug logging enabled.
pub(crate) fn log_step(verbose: bool, flow: &str, message: &str) {
    if verbose {
        info!(flow, "[DEBUG]: {}", message);
    } else {
        debug!(flow, "{}", message);
    }
}
