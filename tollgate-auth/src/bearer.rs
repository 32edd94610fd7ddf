use crate::cache::{KeyCache, KeySource};
use crate::error::{Error, Result};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use std::sync::Arc;

/// Extract the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively and the value must be exactly
/// `Bearer <token>`; anything else (wrong scheme, missing token, trailing
/// parts) is rejected.
pub fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.split_whitespace();
    let scheme = parts.next()?;
    let token = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token)
}

/// User-pool parameters an access token is checked against.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Exact `iss` value for the pool.
    pub issuer: String,
    /// OAuth client the token must have been issued to.
    pub client_id: String,
    /// The pool's signing key set.
    pub key_source: KeySource,
}

/// Claims carried by a user-pool access token.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub iss: String,
    pub exp: i64,
    #[serde(default)]
    pub token_use: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Verifies user-pool access tokens against the pool's cached key set.
#[derive(Debug)]
pub struct AccessTokenVerifier {
    config: PoolConfig,
    cache: Arc<KeyCache>,
}

impl AccessTokenVerifier {
    pub fn new(config: PoolConfig, cache: Arc<KeyCache>) -> Self {
        Self { config, cache }
    }

    pub async fn verify(&self, token: &str) -> Result<AccessClaims> {
        let header =
            decode_header(token).map_err(|e| Error::InvalidToken(format!("bad header: {e}")))?;
        if header.alg != Algorithm::RS256 {
            return Err(Error::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| Error::InvalidToken("missing kid".into()))?;

        let jwks = self.cache.key_set(&self.config.key_source).await?;
        let jwk = jwks
            .find(&kid)
            .ok_or_else(|| Error::InvalidToken(format!("no key for kid {kid}")))?;
        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| Error::InvalidToken(format!("unusable key {kid}: {e}")))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.config.issuer]);
        // Access tokens carry the client in `client_id`, not `aud`.
        validation.validate_aud = false;

        let data = decode::<AccessClaims>(token, &key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Error::TokenExpired,
            _ => Error::InvalidToken(e.to_string()),
        })?;
        let claims = data.claims;

        if claims.token_use.as_deref() != Some("access") {
            return Err(Error::InvalidToken(format!(
                "unexpected token_use {:?}",
                claims.token_use
            )));
        }
        if claims.client_id.as_deref() != Some(self.config.client_id.as_str()) {
            return Err(Error::InvalidToken("client mismatch".into()));
        }

        Ok(claims)
    }
}
