use crate::body::{decode_transport, parse_token_body};
use crate::config::ProxyConfig;
use crate::error::{Error, Result};
use crate::forward::{Forwarder, UpstreamResponse};
use crate::gate::AttestationGate;
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, Uri},
    response::Response,
    routing::post,
};
use std::sync::Arc;
use tollgate_auth::attestation::AttestationVerifier;
use tollgate_auth::cache::KeyCache;
use tollgate_auth::secrets::SecretStore;

use crate::headers::sanitize_header_map;

/// Headers never relayed back to the client; axum recomputes framing.
const SKIP_RESPONSE_HEADERS: &[&str] = &["content-length", "transfer-encoding", "connection"];

/// Attestation-gated proxy in front of the OAuth provider.
#[derive(Clone)]
pub struct ProxyServer {
    config: ProxyConfig,
    gate: Arc<AttestationGate>,
    forwarder: Arc<Forwarder>,
    secrets: Arc<dyn SecretStore>,
}

impl ProxyServer {
    /// Create a new proxy server builder.
    pub fn builder() -> ProxyServerBuilder {
        ProxyServerBuilder::default()
    }

    /// Create the axum router: the token endpoint plus a passthrough for
    /// everything else.
    pub fn router(&self) -> Router {
        Router::new()
            .route(&self.config.token_path, post(handle_token))
            .fallback(handle_passthrough)
            .with_state(self.clone())
    }
}

/// Handle a token request: gate, validate the body, inject the client
/// secret, forward upstream.
async fn handle_token(
    State(server): State<ProxyServer>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Result<Response> {
    tracing::info!("handling token request");

    let sanitized = sanitize_header_map(&headers);
    server.gate.check(uri.path(), &sanitized).await?;

    let decoded = decode_transport(&body);
    let request = parse_token_body(&decoded)?;
    let credentials = server.secrets.credentials().await?;
    let form = request.to_form(&credentials.client_secret)?;

    // The body was re-encoded; the declared type must match what we send.
    let mut upstream_headers = sanitized;
    upstream_headers.insert(
        "content-type".to_string(),
        "application/x-www-form-urlencoded".to_string(),
    );

    let response = server
        .forwarder
        .forward(
            Method::POST,
            &server.config.token_path,
            &upstream_headers,
            Some(form.into_bytes()),
        )
        .await?;

    relay(response)
}

/// Forward any other request as-is after sanitization. The gate still runs
/// here so trailing-slash variants of the token path stay protected.
async fn handle_passthrough(
    State(server): State<ProxyServer>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let sanitized = sanitize_header_map(&headers);
    server.gate.check(uri.path(), &sanitized).await?;

    let path_and_query = uri.path_and_query().map_or(uri.path(), |pq| pq.as_str());

    tracing::info!(%method, path = %uri.path(), "forwarding passthrough request");

    let body = if body.is_empty() {
        None
    } else {
        Some(body.to_vec())
    };
    let response = server
        .forwarder
        .forward(method, path_and_query, &sanitized, body)
        .await?;

    relay(response)
}

/// Turn an upstream response into the response we hand back, body unchanged.
fn relay(upstream: UpstreamResponse) -> Result<Response> {
    let mut builder = Response::builder().status(upstream.status);
    for (name, value) in &upstream.headers {
        if SKIP_RESPONSE_HEADERS.contains(&name.as_str()) {
            continue;
        }
        builder = builder.header(name, value);
    }
    builder
        .body(axum::body::Body::from(upstream.body))
        .map_err(|e| Error::Internal(format!("could not assemble relay response: {e}")))
}

// Builder for ProxyServer.
#[derive(Default)]
pub struct ProxyServerBuilder {
    config: Option<ProxyConfig>,
    key_cache: Option<Arc<KeyCache>>,
    secret_store: Option<Arc<dyn SecretStore>>,
}

impl ProxyServerBuilder {
    pub fn config(mut self, config: ProxyConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Share a key cache with other components. A dedicated cache is
    /// created when none is supplied.
    pub fn key_cache(mut self, cache: Arc<KeyCache>) -> Self {
        self.key_cache = Some(cache);
        self
    }

    pub fn secret_store(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.secret_store = Some(store);
        self
    }

    pub fn build(self) -> Result<ProxyServer> {
        let config = self
            .config
            .ok_or_else(|| Error::Internal("config required".to_string()))?;
        let secrets = self
            .secret_store
            .ok_or_else(|| Error::Internal("secret_store required".to_string()))?;
        let cache = self.key_cache.unwrap_or_else(|| Arc::new(KeyCache::new()));

        let verifier = Arc::new(AttestationVerifier::new(config.attestation.clone(), cache));
        let gate = Arc::new(AttestationGate::new(config.token_path.clone(), verifier));
        let forwarder = Arc::new(Forwarder::new(config.upstream.clone()));

        Ok(ProxyServer {
            config,
            gate,
            forwarder,
            secrets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_auth::attestation::AttestationConfig;
    use tollgate_auth::cache::KeySource;
    use tollgate_auth::secrets::{ClientCredentials, MemorySecretStore};
    use url::Url;

    fn test_config() -> ProxyConfig {
        ProxyConfig::new(
            Url::parse("https://auth.example.com").unwrap(),
            AttestationConfig {
                issuer: "https://attestation.example.com/1234567890".into(),
                audiences: vec!["1234567890".into()],
                allowed_apps: vec!["1:1234567890:ios:a1b2c3d4e5f6a7b8".into()],
                key_source: KeySource::new(
                    "attestation",
                    Url::parse("https://attestation.example.com/jwks").unwrap(),
                ),
            },
        )
    }

    fn test_store() -> Arc<MemorySecretStore> {
        Arc::new(MemorySecretStore::new(ClientCredentials {
            client_id: "app-client".into(),
            client_secret: "s3cret".into(),
            user_pool_id: "pool-1".into(),
        }))
    }

    #[test]
    fn build_requires_config_and_secret_store() {
        assert!(ProxyServer::builder().build().is_err());
        assert!(ProxyServer::builder().config(test_config()).build().is_err());
        assert!(
            ProxyServer::builder()
                .config(test_config())
                .secret_store(test_store())
                .build()
                .is_ok()
        );
    }
}
