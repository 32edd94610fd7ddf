use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

/// Confidential client credentials for the upstream provider, stored as one
/// JSON document in whatever secret backend hosts the deployment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_pool_id: String,
}

/// Source of the client credentials.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn credentials(&self) -> Result<ClientCredentials>;
}

/// Reads the credentials JSON from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvSecretStore {
    var: String,
}

impl EnvSecretStore {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn credentials(&self) -> Result<ClientCredentials> {
        let raw = std::env::var(&self.var)
            .map_err(|_| Error::SecretUnavailable(format!("{} is not set", self.var)))?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::SecretUnavailable(format!("malformed credentials: {e}")))
    }
}

/// Fixed credentials, for tests and local wiring.
#[derive(Debug, Clone)]
pub struct MemorySecretStore {
    credentials: ClientCredentials,
}

impl MemorySecretStore {
    pub fn new(credentials: ClientCredentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn credentials(&self) -> Result<ClientCredentials> {
        Ok(self.credentials.clone())
    }
}

/// Caches the first successful fetch for the life of the process. A failed
/// fetch is surfaced and retried on the next call, never cached.
pub struct CachedSecretStore<S> {
    inner: S,
    cached: RwLock<Option<ClientCredentials>>,
}

impl<S: SecretStore> CachedSecretStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cached: RwLock::new(None),
        }
    }
}

#[async_trait]
impl<S: SecretStore> SecretStore for CachedSecretStore<S> {
    async fn credentials(&self) -> Result<ClientCredentials> {
        if let Some(credentials) = self.cached.read().await.as_ref() {
            return Ok(credentials.clone());
        }

        let mut guard = self.cached.write().await;
        if let Some(credentials) = guard.as_ref() {
            return Ok(credentials.clone());
        }

        let credentials = self.inner.credentials().await?;
        *guard = Some(credentials.clone());
        Ok(credentials)
    }
}
