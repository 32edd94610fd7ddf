use crate::error::Result;
use crate::jwks::{Jwks, fetch_jwks};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use url::Url;

/// Default lifetime of a cached key set.
pub const DEFAULT_TTL_SECONDS: i64 = 6 * 60 * 60;

/// A key-set source: a logical cache name plus the endpoint it is fetched
/// from. Entries are cached under the name, not the URI, so a source whose
/// endpoint moves keeps its cache slot.
#[derive(Debug, Clone)]
pub struct KeySource {
    pub name: String,
    pub uri: Url,
}

impl KeySource {
    pub fn new(name: impl Into<String>, uri: Url) -> Self {
        Self {
            name: name.into(),
            uri,
        }
    }
}

struct CacheEntry {
    jwks: Arc<Jwks>,
    expires_at: DateTime<Utc>,
}

/// Process-wide key-set cache.
///
/// A live entry is served without touching the network. An absent or expired
/// entry triggers a synchronous refetch. The map is guarded by an async
/// `RwLock`: readers share the fast path, and the refetching writer re-checks
/// expiry after taking the write guard so concurrent misses collapse into a
/// single upstream fetch.
pub struct KeyCache {
    client: reqwest::Client,
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl KeyCache {
    pub fn new() -> Self {
        Self::with_ttl(Duration::seconds(DEFAULT_TTL_SECONDS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(5))
            .timeout(std::time::Duration::from_secs(10))
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the key set for `source`, fetching it if the cached entry is
    /// absent or past its expiry.
    pub async fn key_set(&self, source: &KeySource) -> Result<Arc<Jwks>> {
        let now = Utc::now();

        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&source.name) {
                if entry.expires_at > now {
                    return Ok(entry.jwks.clone());
                }
            }
        }

        let mut entries = self.entries.write().await;
        // Another task may have refreshed while we waited for the write guard.
        if let Some(entry) = entries.get(&source.name) {
            if entry.expires_at > now {
                return Ok(entry.jwks.clone());
            }
        }

        tracing::info!(source = %source.name, uri = %source.uri, "refreshing key set");
        let jwks = Arc::new(fetch_jwks(&self.client, &source.uri).await?);
        entries.insert(
            source.name.clone(),
            CacheEntry {
                jwks: jwks.clone(),
                expires_at: now + self.ttl,
            },
        );

        Ok(jwks)
    }

    /// Drop a cached entry so the next lookup refetches.
    pub async fn invalidate(&self, name: &str) {
        self.entries.write().await.remove(name);
    }
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCache").field("ttl", &self.ttl).finish()
    }
}
