use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::env;

use crate::config::clients::{ClientConfig, ClientSettings, CredentialsConfig, SecretValue};
use crate::credentials::secrets::{ClientSecrets, SigningKey};

/// A logical client: its settings and a way to obtain its credential material.
///
/// How the material is sourced (disk, secret store, embedded key) is up to the
/// implementation; the service only borrows it while signing an assertion.
#[async_trait]
pub trait ClientDefinition: Send + Sync {
    fn settings(&self) -> &ClientSettings;

    async fn client_secrets(&self) -> Result<ClientSecrets>;
}

/// Client definition backed by the YAML service configuration.
#[derive(Debug, Clone)]
pub struct SettingsClientDefinition {
    settings: ClientSettings,
    credentials: CredentialsConfig,
}

impl SettingsClientDefinition {
    pub fn new(config: ClientConfig) -> Self {
        Self { settings: config.settings, credentials: config.credentials }
    }
}

#[async_trait]
impl ClientDefinition for SettingsClientDefinition {
    fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    async fn client_secrets(&self) -> Result<ClientSecrets> {
        let secrets = match &self.credentials {
            CredentialsConfig::Jwk { jwk } => {
                let json = resolve_secret_value(jwk).await?;
                ClientSecrets::Key(SigningKey::from_jwk_json(&json)?)
            }
            CredentialsConfig::EncodedJwk { jwk } => {
                let encoded = resolve_secret_value(jwk).await?;
                ClientSecrets::Key(SigningKey::from_base64_jwk(&encoded)?)
            }
            CredentialsConfig::Pem { key, algorithm } => {
                let pem = resolve_secret_bytes(key).await?;
                ClientSecrets::Key(SigningKey::from_pem(&pem, algorithm.as_deref())?)
            }
            CredentialsConfig::Certificate { certificate, key } => {
                let cert = resolve_secret_bytes(certificate).await?;
                let pem = resolve_secret_bytes(key).await?;
                ClientSecrets::certificate(&cert, SigningKey::from_rsa_pem(&pem)?)?
            }
        };
        Ok(secrets)
    }
}

pub async fn resolve_secret_value(value: &SecretValue) -> Result<String> {
    match value {
        SecretValue::Literal { value } => Ok(value.to_owned()),
        SecretValue::FromEnv { from_env } => env::var(from_env).map_err(|err| anyhow!("env '{}': {}", from_env, err)),
        SecretValue::FromFile { path } => tokio::fs::read_to_string(path)
            .await
            .map(|res| res.trim().to_string())
            .with_context(|| format!("failed to read secret file '{}'", path)),
    }
}

/// Like [`resolve_secret_value`], but files are read verbatim so DER material survives.
pub async fn resolve_secret_bytes(value: &SecretValue) -> Result<Vec<u8>> {
    match value {
        SecretValue::FromFile { path } => tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read secret file '{}'", path)),
        other => resolve_secret_value(other).await.map(String::into_bytes),
    }
}
