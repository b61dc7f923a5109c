use serde::Deserialize;
use std::collections::HashMap;

use crate::config::settings::SettingsConfig;
use crate::environment::Environment;
use crate::errors::Result;
use crate::identity::{non_empty, ClientIdentity, EnterpriseCredentials};

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    pub clients: HashMap<String, ClientConfig>,
}

/// ================================
/// Clients
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    #[serde(flatten)]
    pub settings: ClientSettings,
    pub credentials: CredentialsConfig,
}

/// Per logical client settings, mirrored from the authority's client registration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ClientSettings {
    pub client_id: String,
    pub environment: String, // invariants: prod, ver1, ver2
    pub scope: String,
    pub resource: Option<String>,
    pub consumer_org_no: Option<String>,
    pub enterprise_user_name: Option<String>,
    pub enterprise_user_password: Option<String>,
    pub exchange_to_altinn_token: Option<bool>,
    pub use_altinn_test_org: Option<bool>,
    pub enable_debug_logging: Option<bool>,
}

impl ClientSettings {
    pub fn identity(&self) -> Result<ClientIdentity> {
        let environment: Environment = self.environment.parse()?;
        Ok(ClientIdentity {
            client_id: self.client_id.to_owned(),
            environment,
            scope: self.scope.to_owned(),
            resource: non_empty(self.resource.to_owned()),
            consumer_org_no: non_empty(self.consumer_org_no.to_owned()),
        })
    }

    /// Both username and password must be present and non-empty.
    pub fn enterprise_credentials(&self) -> Option<EnterpriseCredentials> {
        match (non_empty(self.enterprise_user_name.to_owned()), non_empty(self.enterprise_user_password.to_owned())) {
            (Some(username), Some(password)) => Some(EnterpriseCredentials::new(username, password)),
            _ => None,
        }
    }

    pub fn verbose(&self) -> bool {
        self.enable_debug_logging.unwrap_or(false)
    }
}

/// Where a client's credential material comes from.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialsConfig {
    /// RSA private key as JWK JSON
    Jwk { jwk: SecretValue },
    /// Base64 encoded JWK JSON
    EncodedJwk { jwk: SecretValue },
    /// PEM private key, `algorithm` defaults to RS256
    Pem { key: SecretValue, algorithm: Option<String> },
    /// Business certificate (PEM or DER) with its PEM private key
    Certificate { certificate: SecretValue, key: SecretValue },
}

/// Secret value sources
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum SecretValue {
    Literal {
        value: String,
    },
    FromEnv {
        from_env: String,
    },
    FromFile {
        path: String,
    },
}
