use crate::error::{Error, Result};
use crate::headers::SanitizedHeaders;
use std::sync::Arc;
use tollgate_auth::attestation::{AttestationClaims, AttestationVerifier};

/// Header the client presents its attestation token in.
pub const ATTESTATION_HEADER: &str = "x-attestation-token";

/// Gates the token path behind attestation verification.
#[derive(Debug, Clone)]
pub struct AttestationGate {
    token_path: String,
    verifier: Arc<AttestationVerifier>,
}

impl AttestationGate {
    pub fn new(token_path: impl Into<String>, verifier: Arc<AttestationVerifier>) -> Self {
        Self {
            token_path: token_path.into(),
            verifier,
        }
    }

    /// Check a request against the gate.
    ///
    /// Returns the verified claims when `path` is the token path, `None`
    /// when the gate does not apply. Trailing slashes are ignored when
    /// matching, so `/oauth2/token/` cannot slip past as a passthrough.
    pub async fn check(
        &self,
        path: &str,
        headers: &SanitizedHeaders,
    ) -> Result<Option<AttestationClaims>> {
        if !self.applies_to(path) {
            return Ok(None);
        }

        let token = headers
            .get(ATTESTATION_HEADER)
            .ok_or(Error::MissingAttestationToken)?;
        let claims = self.verifier.verify(token).await?;
        tracing::info!(app = %claims.sub, "attestation verified");
        Ok(Some(claims))
    }

    fn applies_to(&self, path: &str) -> bool {
        path.trim_end_matches('/') == self.token_path.trim_end_matches('/')
    }
}
