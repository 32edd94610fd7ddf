use tollgate_auth::attestation::AttestationConfig;
use url::Url;

/// Path the attestation gate protects unless overridden.
pub const DEFAULT_TOKEN_PATH: &str = "/oauth2/token";

/// Configuration for the proxy server
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Base address of the OAuth provider requests are forwarded to
    pub upstream: Url,

    /// Path of the token endpoint, relative to the upstream base
    pub token_path: String,

    /// Attestation issuer, audiences, and app allow-list
    pub attestation: AttestationConfig,
}

impl ProxyConfig {
    pub fn new(upstream: Url, attestation: AttestationConfig) -> Self {
        Self {
            upstream,
            token_path: DEFAULT_TOKEN_PATH.to_string(),
            attestation,
        }
    }

    /// Override the token endpoint path. A missing leading slash is added.
    pub fn with_token_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.token_path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        self
    }
}
