#[cfg(test)]
mod test {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use jsonwebtoken::{decode, decode_header, Algorithm, Validation};

    use crate::assertion::{build_assertion, AssertionClaims};
    use crate::credentials::{ClientSecrets, SigningKey};
    use crate::helpers::time::now_i64;
    use crate::tests::common::{decoding_key, identity, jwk_secrets, rsa_pem, TEST_AUDIENCE, TEST_KID};

    fn verify(assertion: &str) -> AssertionClaims {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[TEST_AUDIENCE]);
        decode::<AssertionClaims>(assertion, &decoding_key(), &validation)
            .expect("assertion verifies")
            .claims
    }

    #[test]
    fn jwk_assertion_carries_claim_set() {
        let identity = identity("jwk-client")
            .with_resource("https://api.example.no/")
            .with_consumer_org_no("991825827");

        let assertion = build_assertion(&jwk_secrets(), &identity, TEST_AUDIENCE).unwrap();
        let claims = verify(&assertion);

        assert_eq!(claims.iss, "jwk-client");
        assert_eq!(claims.aud, TEST_AUDIENCE);
        assert_eq!(claims.scope, "altinn:serviceowner/instances.read");
        assert_eq!(claims.exp - claims.iat, 10);
        assert!((claims.iat - now_i64()).abs() <= 2);
        assert_eq!(claims.resource.as_deref(), Some("https://api.example.no/"));
        assert_eq!(claims.consumer_org.as_deref(), Some("991825827"));

        let header = decode_header(&assertion).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some(TEST_KID));
        assert_eq!(header.typ.as_deref(), Some("JWT"));
        assert!(header.x5c.is_none());
    }

    #[test]
    fn optional_claims_are_omitted_when_empty() {
        let identity = identity("plain-client").with_resource("").with_consumer_org_no("");
        let assertion = build_assertion(&jwk_secrets(), &identity, TEST_AUDIENCE).unwrap();

        let payload = assertion.split('.').nth(1).unwrap();
        let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(payload).unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert!(payload.get("resource").is_none());
        assert!(payload.get("consumer_org").is_none());
    }

    #[test]
    fn each_assertion_is_unique() {
        let identity = identity("unique-client");
        let first = verify(&build_assertion(&jwk_secrets(), &identity, TEST_AUDIENCE).unwrap());
        let second = verify(&build_assertion(&jwk_secrets(), &identity, TEST_AUDIENCE).unwrap());
        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn certificate_assertion_carries_x5c_chain() {
        let der = vec![0x30, 0x82, 0x03, 0x10, 0x30, 0x82];
        let key = SigningKey::from_rsa_pem(rsa_pem().as_bytes()).unwrap().with_kid("ignored");
        let secrets = ClientSecrets::certificate(&der, key).unwrap();

        let assertion = build_assertion(&secrets, &identity("cert-client"), TEST_AUDIENCE).unwrap();
        let header = decode_header(&assertion).unwrap();

        assert_eq!(header.x5c, Some(vec![STANDARD.encode(&der)]));
        assert!(header.typ.is_none());
        assert!(header.kid.is_none());
        assert_eq!(verify(&assertion).iss, "cert-client");
    }

    #[test]
    fn base64_jwk_matches_plain_jwk() {
        let encoded = STANDARD.encode(crate::tests::common::jwk_json());
        let key = SigningKey::from_base64_jwk(&encoded).unwrap();
        assert_eq!(key.kid.as_deref(), Some(TEST_KID));

        let assertion = build_assertion(&ClientSecrets::Key(key), &identity("b64-client"), TEST_AUDIENCE).unwrap();
        assert_eq!(verify(&assertion).iss, "b64-client");
    }
}
