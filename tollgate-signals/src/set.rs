use crate::error::{Error, Result};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use std::collections::HashSet;
use std::sync::Arc;
use tollgate_auth::cache::{KeyCache, KeySource};

/// Accepted `typ` header values for a security event token.
const SET_TOKEN_TYPES: [&str; 2] = ["secevent+jwt", "application/secevent+jwt"];

/// Which transmitter the receiver trusts.
#[derive(Debug, Clone)]
pub struct SetConfig {
    /// Exact `iss` value the token must carry.
    pub issuer: String,
    /// Exact `aud` value the token must carry.
    pub audience: String,
    /// Key set the transmitter signs with.
    pub key_source: KeySource,
}

/// Verifies security event tokens against the transmitter's cached key set.
///
/// Verification yields the raw payload; matching it against an event schema
/// is the receiver's job, since the event key decides which schema applies.
#[derive(Debug)]
pub struct SetVerifier {
    config: SetConfig,
    cache: Arc<KeyCache>,
}

impl SetVerifier {
    pub fn new(config: SetConfig, cache: Arc<KeyCache>) -> Self {
        Self { config, cache }
    }

    /// Verify a token's signature, `typ`, issuer and audience.
    ///
    /// SETs carry `iat` rather than `exp`, so expiry is not checked.
    pub async fn verify(&self, token: &str) -> Result<serde_json::Value> {
        let header =
            decode_header(token).map_err(|e| Error::Signature(format!("bad header: {e}")))?;

        let typ_ok = header
            .typ
            .as_deref()
            .is_some_and(|typ| SET_TOKEN_TYPES.iter().any(|t| typ.eq_ignore_ascii_case(t)));
        if !typ_ok {
            return Err(Error::Signature(format!(
                "unexpected token type {:?}",
                header.typ
            )));
        }
        if header.alg != Algorithm::RS256 {
            return Err(Error::Signature(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| Error::Signature("missing kid".into()))?;

        let jwks = self
            .cache
            .key_set(&self.config.key_source)
            .await
            .map_err(|e| Error::Signature(e.to_string()))?;
        let jwk = jwks
            .find(&kid)
            .ok_or_else(|| Error::Signature(format!("no key for kid {kid}")))?;
        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| Error::Signature(format!("unusable key {kid}: {e}")))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;

        let data = decode::<serde_json::Value>(token, &key, &validation)
            .map_err(|e| Error::Signature(e.to_string()))?;

        Ok(data.claims)
    }
}
