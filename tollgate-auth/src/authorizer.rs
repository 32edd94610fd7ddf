use crate::bearer::{AccessClaims, AccessTokenVerifier, PoolConfig, bearer_token};
use crate::cache::{KeyCache, KeySource};
use crate::error::{Error, Result};
use crate::policy::AuthorizerResponse;
use crate::secrets::SecretStore;
use std::sync::Arc;
use url::Url;

/// Bearer-token authorizer for the protected receiver endpoint.
///
/// The pool and client identifiers come from the secret store rather than
/// static configuration, so credential rotation needs no redeploy. Every
/// failure — missing header, bad scheme, secret fetch, key fetch, signature,
/// claims — collapses to [`Error::Unauthorized`] at the boundary; only the
/// log line says which check failed.
pub struct Authorizer {
    issuer_base: Url,
    secrets: Arc<dyn SecretStore>,
    cache: Arc<KeyCache>,
}

impl Authorizer {
    pub fn new(issuer_base: Url, secrets: Arc<dyn SecretStore>, cache: Arc<KeyCache>) -> Self {
        Self {
            issuer_base,
            secrets,
            cache,
        }
    }

    /// Authorize an `Authorization` header value against the user pool and
    /// return an allow policy scoped to `method_arn`.
    pub async fn authorize(
        &self,
        authorization: Option<&str>,
        method_arn: &str,
    ) -> Result<AuthorizerResponse> {
        match self.check(authorization).await {
            Ok(claims) => {
                tracing::info!(principal = %claims.sub, "bearer token authorized");
                Ok(AuthorizerResponse::allow(claims.sub, method_arn))
            }
            Err(err) => {
                tracing::error!(error = %err, "bearer authorization failed");
                Err(Error::Unauthorized)
            }
        }
    }

    async fn check(&self, authorization: Option<&str>) -> Result<AccessClaims> {
        // Parse the header before touching the secret store or the network.
        let header = authorization.ok_or(Error::Unauthorized)?;
        let token = bearer_token(header).ok_or(Error::Unauthorized)?;

        let credentials = self.secrets.credentials().await?;
        let issuer = format!(
            "{}/{}",
            self.issuer_base.as_str().trim_end_matches('/'),
            credentials.user_pool_id
        );
        let jwks_uri = Url::parse(&format!("{issuer}/.well-known/jwks.json"))
            .map_err(|e| Error::Internal(e.to_string()))?;

        let verifier = AccessTokenVerifier::new(
            PoolConfig {
                issuer,
                client_id: credentials.client_id,
                key_source: KeySource::new("user-pool", jwks_uri),
            },
            self.cache.clone(),
        );

        verifier.verify(token).await
    }
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer")
            .field("issuer_base", &self.issuer_base)
            .finish_non_exhaustive()
    }
}
