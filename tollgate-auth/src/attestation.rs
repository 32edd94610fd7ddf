use crate::cache::{KeyCache, KeySource};
use crate::error::{Error, Result};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use std::sync::Arc;

/// Where attestation tokens come from and which apps may present them.
#[derive(Debug, Clone)]
pub struct AttestationConfig {
    /// Exact `iss` value the token must carry.
    pub issuer: String,
    /// Accepted audiences; the token's `aud` array must contain
    /// `projects/<audience>` for at least one of these.
    pub audiences: Vec<String>,
    /// App identifiers allowed to exchange tokens. The token `sub` must be
    /// one of them.
    pub allowed_apps: Vec<String>,
    /// Key set the issuer signs with.
    pub key_source: KeySource,
}

/// Claims carried by an attestation token.
#[derive(Debug, Clone, Deserialize)]
pub struct AttestationClaims {
    pub sub: String,
    pub iss: String,
    pub aud: Vec<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
}

/// Verifies app-attestation JWTs against the issuer's cached key set.
#[derive(Debug)]
pub struct AttestationVerifier {
    config: AttestationConfig,
    cache: Arc<KeyCache>,
}

impl AttestationVerifier {
    pub fn new(config: AttestationConfig, cache: Arc<KeyCache>) -> Self {
        Self { config, cache }
    }

    /// Verify a token and return its claims.
    ///
    /// Checks, in order: header shape (`typ`, `alg`, `kid`), key lookup by
    /// `kid`, signature and expiry, issuer, audience, then the app
    /// allow-list. A `kid` with no matching key is a verification failure,
    /// never a silent pass.
    pub async fn verify(&self, token: &str) -> Result<AttestationClaims> {
        let header =
            decode_header(token).map_err(|e| Error::InvalidToken(format!("bad header: {e}")))?;

        match header.typ.as_deref() {
            Some("JWT") => {}
            other => {
                return Err(Error::InvalidToken(format!(
                    "unexpected token type {other:?}"
                )));
            }
        }
        if header.alg != Algorithm::RS256 {
            return Err(Error::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .filter(|kid| well_formed_kid(kid))
            .ok_or_else(|| Error::InvalidToken("missing or malformed kid".into()))?;

        let jwks = self.cache.key_set(&self.config.key_source).await?;
        let jwk = jwks
            .find(&kid)
            .ok_or_else(|| Error::InvalidToken(format!("no key for kid {kid}")))?;
        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| Error::InvalidToken(format!("unusable key {kid}: {e}")))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.config.issuer]);
        // `aud` is an array claim matched against projects/<audience> below.
        validation.validate_aud = false;

        let data = decode::<AttestationClaims>(token, &key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Error::TokenExpired,
                _ => Error::InvalidToken(e.to_string()),
            }
        })?;
        let claims = data.claims;

        let audience_ok = self
            .config
            .audiences
            .iter()
            .any(|audience| claims.aud.iter().any(|aud| aud == &project_aud(audience)));
        if !audience_ok {
            return Err(Error::InvalidToken("audience mismatch".into()));
        }

        if !self.config.allowed_apps.iter().any(|app| app == &claims.sub) {
            tracing::warn!(app = %claims.sub, "attestation from unlisted app");
            return Err(Error::UnknownApp(claims.sub.clone()));
        }

        Ok(claims)
    }
}

fn project_aud(audience: &str) -> String {
    format!("projects/{audience}")
}

fn well_formed_kid(kid: &str) -> bool {
    (1..=64).contains(&kid.len())
        && kid
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}
