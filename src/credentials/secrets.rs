use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use jsonwebtoken::{Algorithm, EncodingKey};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::{BigUint, RsaPrivateKey};
use serde::Deserialize;

use crate::errors::{MaskinportenError, Result};

const CERT_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const CERT_END: &str = "-----END CERTIFICATE-----";

/// Private key used to sign assertions.
#[derive(Clone)]
pub struct SigningKey {
    pub(crate) key: EncodingKey,
    pub algorithm: Algorithm,
    pub kid: Option<String>,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm)
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    pub fn from_rsa_pem(pem: &[u8]) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(pem)
            .map_err(|e| MaskinportenError::configuration(format!("invalid RSA private key: {}", e)))?;
        Ok(Self { key, algorithm: Algorithm::RS256, kid: None })
    }

    pub fn from_ec_pem(pem: &[u8], algorithm: Algorithm) -> Result<Self> {
        if !matches!(algorithm, Algorithm::ES256 | Algorithm::ES384) {
            return Err(MaskinportenError::configuration(format!(
                "algorithm {:?} cannot be used with an EC key",
                algorithm
            )));
        }
        let key = EncodingKey::from_ec_pem(pem)
            .map_err(|e| MaskinportenError::configuration(format!("invalid EC private key: {}", e)))?;
        Ok(Self { key, algorithm, kid: None })
    }

    /// PEM key with an optional algorithm name (`RS256`, `PS256`, `ES256`, ...).
    pub fn from_pem(pem: &[u8], algorithm: Option<&str>) -> Result<Self> {
        let algorithm = parse_algorithm(algorithm)?;
        match algorithm {
            Algorithm::ES256 | Algorithm::ES384 => Self::from_ec_pem(pem, algorithm),
            _ => Self::from_rsa_pem(pem).map(|key| key.with_algorithm(algorithm)),
        }
    }

    /// RSA private key in JWK form. `kid` and `alg` are carried over when present.
    pub fn from_jwk_json(json: &str) -> Result<Self> {
        let jwk: RsaPrivateJwk = serde_json::from_str(json)
            .map_err(|e| MaskinportenError::configuration(format!("invalid JWK: {}", e)))?;
        jwk.into_signing_key()
    }

    /// Base64 (standard alphabet) encoded JWK JSON.
    pub fn from_base64_jwk(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| MaskinportenError::configuration(format!("JWK is not valid base64: {}", e)))?;
        let json = String::from_utf8(bytes)
            .map_err(|e| MaskinportenError::configuration(format!("JWK is not valid UTF-8: {}", e)))?;
        Self::from_jwk_json(&json)
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }
}

/// Credential material for one logical client.
#[derive(Debug, Clone)]
pub enum ClientSecrets {
    /// Bare signing key (typically a JWK registered with the authority).
    Key(SigningKey),
    /// Business certificate (DER) and its private key.
    Certificate { der: Vec<u8>, key: SigningKey },
}

impl ClientSecrets {
    /// Build certificate credentials from PEM, base64 DER or raw DER certificate bytes.
    pub fn certificate(certificate: &[u8], key: SigningKey) -> Result<Self> {
        let der = decode_certificate(certificate)?;
        Ok(ClientSecrets::Certificate { der, key })
    }

    pub fn signing_key(&self) -> &SigningKey {
        match self {
            ClientSecrets::Key(key) => key,
            ClientSecrets::Certificate { key, .. } => key,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ClientSecrets::Key(key) => format!("key kid={}", key.kid.as_deref().unwrap_or("-")),
            ClientSecrets::Certificate { der, .. } => format!("certificate ({} bytes)", der.len()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RsaPrivateJwk {
    kty: String,
    kid: Option<String>,
    alg: Option<String>,
    n: String,
    e: String,
    d: Option<String>,
    p: Option<String>,
    q: Option<String>,
}

impl RsaPrivateJwk {
    fn into_signing_key(self) -> Result<SigningKey> {
        if self.kty != "RSA" {
            return Err(MaskinportenError::configuration(format!("unsupported JWK key type '{}'", self.kty)));
        }
        let d = self.d.as_deref().ok_or_else(|| missing_jwk_member("d"))?;
        let p = self.p.as_deref().ok_or_else(|| missing_jwk_member("p"))?;
        let q = self.q.as_deref().ok_or_else(|| missing_jwk_member("q"))?;

        let private_key = RsaPrivateKey::from_components(
            jwk_uint(&self.n)?,
            jwk_uint(&self.e)?,
            jwk_uint(d)?,
            vec![jwk_uint(p)?, jwk_uint(q)?],
        )
        .map_err(|e| MaskinportenError::configuration(format!("invalid RSA JWK: {}", e)))?;

        let der = private_key
            .to_pkcs1_der()
            .map_err(|e| MaskinportenError::configuration(format!("failed to encode RSA JWK: {}", e)))?;

        Ok(SigningKey {
            key: EncodingKey::from_rsa_der(der.as_bytes()),
            algorithm: parse_algorithm(self.alg.as_deref())?,
            kid: self.kid,
        })
    }
}

fn missing_jwk_member(name: &str) -> MaskinportenError {
    MaskinportenError::configuration(format!("JWK is missing private member '{}'", name))
}

fn jwk_uint(value: &str) -> Result<BigUint> {
    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map(|bytes| BigUint::from_bytes_be(&bytes))
        .map_err(|e| MaskinportenError::configuration(format!("JWK member is not base64url: {}", e)))
}

fn parse_algorithm(algorithm: Option<&str>) -> Result<Algorithm> {
    match algorithm {
        None => Ok(Algorithm::RS256),
        Some(name) => Algorithm::from_str(name)
            .map_err(|_| MaskinportenError::configuration(format!("unsupported signing algorithm '{}'", name))),
    }
}

fn decode_certificate(data: &[u8]) -> Result<Vec<u8>> {
    let text = match std::str::from_utf8(data) {
        Ok(text) => text.trim(),
        // not text, so it is already DER
        Err(_) => return Ok(data.to_vec()),
    };

    let base64_content: String = if let Some(start) = text.find(CERT_BEGIN) {
        let end = text
            .find(CERT_END)
            .ok_or_else(|| MaskinportenError::configuration("invalid PEM certificate: missing END marker"))?;
        text[start + CERT_BEGIN.len()..end].chars().filter(|c| !c.is_whitespace()).collect()
    } else {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    };

    STANDARD
        .decode(base64_content.as_bytes())
        .map_err(|e| MaskinportenError::configuration(format!("failed to decode certificate: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pem_certificate_is_decoded_to_der() {
        let der = vec![0x30, 0x82, 0x01, 0x0a, 0x02];
        let pem = format!("{}\n{}\n{}\n", CERT_BEGIN, STANDARD.encode(&der), CERT_END);
        assert_eq!(decode_certificate(pem.as_bytes()).unwrap(), der);
        assert_eq!(decode_certificate(STANDARD.encode(&der).as_bytes()).unwrap(), der);
    }

    #[test]
    fn binary_certificate_is_taken_as_der() {
        let der = vec![0x30, 0x82, 0xff, 0xfe];
        assert_eq!(decode_certificate(&der).unwrap(), der);
    }

    #[test]
    fn jwk_without_private_members_is_rejected() {
        let err = SigningKey::from_jwk_json(r#"{"kty":"RSA","n":"AQAB","e":"AQAB"}"#).unwrap_err();
        assert!(err.to_string().contains("'d'"));
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        assert!(parse_algorithm(Some("XX999")).is_err());
        assert_eq!(parse_algorithm(None).unwrap(), Algorithm::RS256);
    }
}
