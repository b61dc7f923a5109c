use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use jsonwebtoken::{encode, Header};
use serde::{Deserialize, Serialize};
use tracing::trace;
use uuid::Uuid;

use crate::credentials::ClientSecrets;
use crate::errors::Result;
use crate::helpers::time::now_i64;
use crate::identity::ClientIdentity;
use crate::utils::constants::ASSERTION_LIFETIME_SECS;

/// Claim set of a JWT-bearer assertion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssertionClaims {
    pub aud: String,
    pub scope: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer_org: Option<String>,
}

impl AssertionClaims {
    pub fn new(identity: &ClientIdentity, audience: &str) -> Self {
        let now = now_i64();
        Self {
            aud: audience.to_owned(),
            scope: identity.scope.to_owned(),
            iss: identity.client_id.to_owned(),
            exp: now + ASSERTION_LIFETIME_SECS,
            iat: now,
            jti: Uuid::new_v4().to_string(),
            resource: identity.resource().map(str::to_owned),
            consumer_org: identity.consumer_org_no().map(str::to_owned),
        }
    }
}

/// Sign a fresh, single-use assertion for `identity`.
///
/// Certificate credentials put the DER certificate in `x5c` and drop `typ`
/// and `kid`; key credentials keep `typ=JWT` and the key id, if any.
pub fn build_assertion(secrets: &ClientSecrets, identity: &ClientIdentity, audience: &str) -> Result<String> {
    let signing_key = secrets.signing_key();
    let mut header = Header::new(signing_key.algorithm);

    match secrets {
        ClientSecrets::Key(key) => {
            header.kid = key.kid.clone();
        }
        ClientSecrets::Certificate { der, .. } => {
            header.typ = None;
            header.kid = None;
            header.x5c = Some(vec![STANDARD.encode(der)]);
        }
    }

    let claims = AssertionClaims::new(identity, audience);
    let assertion = encode(&header, &claims, &signing_key.key)?;
    trace!(client_id = %identity.client_id, jti = %claims.jti, "assertion signed");
    Ok(assertion)
}
