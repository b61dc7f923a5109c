use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::MaskinportenError;
use crate::utils::constants::*;

/// Maskinporten environments a client can be registered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Prod,
    Ver1,
    Ver2,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Prod => ENV_PROD,
            Environment::Ver1 => ENV_VER1,
            Environment::Ver2 => ENV_VER2,
        }
    }

    pub fn audience(&self) -> &'static str {
        match self {
            Environment::Prod => "https://maskinporten.no/",
            Environment::Ver1 => "https://ver1.maskinporten.no/",
            Environment::Ver2 => "https://ver2.maskinporten.no/",
        }
    }

    pub fn token_endpoint(&self) -> &'static str {
        match self {
            Environment::Prod => "https://maskinporten.no/token",
            Environment::Ver1 => "https://ver1.maskinporten.no/token",
            Environment::Ver2 => "https://ver2.maskinporten.no/token",
        }
    }

    /// ver1 and ver2 share the platform test environment.
    pub fn exchange_endpoint(&self) -> &'static str {
        match self {
            Environment::Prod => "https://platform.altinn.no/authentication/api/v1/exchange/maskinporten",
            Environment::Ver1 | Environment::Ver2 => {
                "https://platform.tt02.altinn.no/authentication/api/v1/exchange/maskinporten"
            }
        }
    }
}

impl FromStr for Environment {
    type Err = MaskinportenError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            ENV_PROD => Ok(Environment::Prod),
            ENV_VER1 => Ok(Environment::Ver1),
            ENV_VER2 => Ok(Environment::Ver2),
            other => Err(MaskinportenError::configuration(format!(
                "invalid environment '{}', valid values: {}, {}, {}",
                other, ENV_PROD, ENV_VER1, ENV_VER2
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Environment {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three URLs a flow needs for one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSet {
    pub audience: String,
    pub token: String,
    pub exchange: String,
}

impl EndpointSet {
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            audience: environment.audience().to_owned(),
            token: environment.token_endpoint().to_owned(),
            exchange: environment.exchange_endpoint().to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_environments() {
        let prod: Environment = "prod".parse().unwrap();
        assert_eq!(prod.token_endpoint(), "https://maskinporten.no/token");
        assert_eq!(prod.audience(), "https://maskinporten.no/");

        let ver1: Environment = "ver1".parse().unwrap();
        assert_eq!(ver1.token_endpoint(), "https://ver1.maskinporten.no/token");

        let ver2: Environment = "ver2".parse().unwrap();
        assert_eq!(ver2.audience(), "https://ver2.maskinporten.no/");
        assert_eq!(ver1.exchange_endpoint(), ver2.exchange_endpoint());
        assert_ne!(prod.exchange_endpoint(), ver2.exchange_endpoint());
    }

    #[test]
    fn unknown_environment_is_configuration_error() {
        let err = "staging".parse::<Environment>().unwrap_err();
        assert!(matches!(err, MaskinportenError::Configuration(_)));
        assert!(err.to_string().contains("staging"));
    }
}
