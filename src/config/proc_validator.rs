//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Validates client identity fields, environments, credential sources and
//!   enterprise user credential pairs

use tracing::error;

use crate::config::clients::{ClientConfig, CredentialsConfig, SecretValue, ServiceConfig};
use crate::environment::Environment;

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    if cfg.clients.is_empty() {
        errors.push("config: 'clients' is empty; at least one client required".to_string());
    }

    let mut names: Vec<&String> = cfg.clients.keys().collect();
    names.sort();
    for name in names {
        validate_client(name, &cfg.clients[name], &mut errors);
    }

    if let Some(logging) = &cfg.settings.logging {
        if !["trace", "debug", "info", "warn", "error"].contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!("settings.logging.level '{}' is not a log level", logging.level));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        for e in &errors {
            error!("config validation: {}", e);
        }
        Err(errors)
    }
}

fn validate_client(name: &str, client: &ClientConfig, errors: &mut Vec<String>) {
    let settings = &client.settings;
    if settings.client_id.trim().is_empty() {
        errors.push(format!("client['{}'].client_id must not be empty", name));
    }
    if settings.scope.trim().is_empty() {
        errors.push(format!("client['{}'].scope must not be empty", name));
    }
    if let Err(e) = settings.environment.parse::<Environment>() {
        errors.push(format!("client['{}'].environment: {}", name, e));
    }

    let has_user = settings.enterprise_user_name.as_deref().is_some_and(|v| !v.is_empty());
    let has_password = settings.enterprise_user_password.as_deref().is_some_and(|v| !v.is_empty());
    if has_user != has_password {
        errors.push(format!(
            "client['{}'] enterprise_user_name and enterprise_user_password must be set together",
            name
        ));
    }

    match &client.credentials {
        CredentialsConfig::Jwk { jwk } | CredentialsConfig::EncodedJwk { jwk } => {
            validate_secret_value(name, "jwk", jwk, errors);
        }
        CredentialsConfig::Pem { key, .. } => validate_secret_value(name, "key", key, errors),
        CredentialsConfig::Certificate { certificate, key } => {
            validate_secret_value(name, "certificate", certificate, errors);
            validate_secret_value(name, "key", key, errors);
        }
    }
}

fn validate_secret_value(name: &str, field: &str, value: &SecretValue, errors: &mut Vec<String>) {
    let (kind, raw) = match value {
        SecretValue::Literal { value } => ("value", value),
        SecretValue::FromEnv { from_env } => ("from_env", from_env),
        SecretValue::FromFile { path } => ("path", path),
    };
    if raw.trim().is_empty() {
        errors.push(format!("client['{}'].credentials.{}.{} must not be empty", name, field, kind));
    }
}
