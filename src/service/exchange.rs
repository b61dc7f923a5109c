use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Request;

use crate::cache::{cache_ttl, exchange_cache_key, TokenResponse};
use crate::environment::Environment;
use crate::errors::Result;
use crate::identity::EnterpriseCredentials;
use crate::observability::metrics::with_metrics;
use crate::service::maskinporten::{log_step, MaskinportenService};
use crate::single_flight::SingleFlight;
use crate::utils::constants::{ENTERPRISE_USER_HEADER, EXCHANGED_TOKEN_TYPE, FLOW_EXCHANGE};

static EXCHANGE_FLIGHTS: LazyLock<SingleFlight> = LazyLock::new(SingleFlight::new);

impl MaskinportenService {
    /// Exchange an issued token for a platform token.
    ///
    /// The platform token keeps the primary token's `expires_in` and `scope`.
    pub async fn exchange_token(
        &self,
        primary: &TokenResponse,
        environment: Environment,
        enterprise: Option<&EnterpriseCredentials>,
        is_test_org: bool,
        bypass_cache: bool,
    ) -> Result<TokenResponse> {
        self.exchange(primary, environment, enterprise, is_test_org, bypass_cache, false).await
    }

    pub(crate) async fn exchange(
        &self,
        primary: &TokenResponse,
        environment: Environment,
        enterprise: Option<&EnterpriseCredentials>,
        is_test_org: bool,
        bypass_cache: bool,
        verbose: bool,
    ) -> Result<TokenResponse> {
        let cache_key = exchange_cache_key(&primary.access_token, enterprise.map(|c| c.username.as_str()));

        if !bypass_cache {
            if let Some(token) = self.cached(FLOW_EXCHANGE, &cache_key).await {
                log_step(verbose, FLOW_EXCHANGE, "returning cached value");
                return Ok(token);
            }
        }

        let _flight = EXCHANGE_FLIGHTS.acquire(&cache_key).await;

        if !bypass_cache {
            if let Some(token) = self.cached(FLOW_EXCHANGE, &cache_key).await {
                log_step(verbose, FLOW_EXCHANGE, "returning value cached by concurrent request");
                return Ok(token);
            }
        }
        with_metrics(|m| m.cache_misses.with_label_values(&[FLOW_EXCHANGE]).inc()).await;
        log_step(verbose, FLOW_EXCHANGE, "cache miss or cache disabled");

        if enterprise.is_none() {
            log_step(verbose, FLOW_EXCHANGE, "no enterprise user credentials, exchanging without them");
        }

        let endpoint = self.endpoints_for(environment).exchange;
        let request = self.exchange_request(&endpoint, primary, enterprise, is_test_org)?;

        log_step(verbose, FLOW_EXCHANGE, &format!("attempting token exchange at {}", endpoint));
        let access_token: String = self.send(FLOW_EXCHANGE, environment, request).await?;

        let exchanged = TokenResponse::new(
            access_token,
            EXCHANGED_TOKEN_TYPE.to_owned(),
            primary.expires_in,
            primary.scope.to_owned(),
        );
        log_step(verbose, FLOW_EXCHANGE, &format!("received token, expires in {} seconds", exchanged.expires_in));

        self.store(FLOW_EXCHANGE, &cache_key, &exchanged, cache_ttl(exchanged.expires_in)).await;
        Ok(exchanged)
    }

    /// `GET` of the exchange endpoint, authorized with the primary token.
    pub fn exchange_request(
        &self,
        endpoint: &str,
        primary: &TokenResponse,
        enterprise: Option<&EnterpriseCredentials>,
        is_test_org: bool,
    ) -> Result<Request> {
        let mut request = self.client.get(endpoint).bearer_auth(&primary.access_token);
        if is_test_org {
            request = request.query(&[("test", "true")]);
        }
        if let Some(credentials) = enterprise {
            request = request.header(ENTERPRISE_USER_HEADER, enterprise_auth_value(credentials));
        }
        Ok(request.build()?)
    }
}

/// Base64 of `username:password`.
pub fn enterprise_auth_value(credentials: &EnterpriseCredentials) -> String {
    STANDARD.encode(format!("{}:{}", credentials.username, credentials.password))
}
