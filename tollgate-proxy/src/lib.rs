//! # tollgate-proxy
//!
//! An attestation-gated proxy that sits in front of an OAuth token endpoint.
//!
//! Mobile clients send their token requests here instead of to the provider.
//! The proxy verifies the app-attestation JWT carried in the
//! `x-attestation-token` header, validates and normalizes the request body,
//! injects the confidential client secret, and forwards the result upstream.
//! Every other path is forwarded as-is after header sanitization.
//!
//! ## Request flow
//!
//! 1. Incoming headers are lowercased, bounded, and stripped of hop metadata
//! 2. Requests for the token path must carry a valid attestation token
//! 3. The form body is parsed, checked per grant type, and re-encoded with
//!    the client secret appended
//! 4. The upstream response is returned byte-for-byte
//!
//! ## Example
//!
//! ```rust,no_run
//! use tollgate_proxy::prelude::*;
//! use tollgate_auth::prelude::*;
//! use std::sync::Arc;
//! use url::Url;
//!
//! # fn example(attestation: AttestationConfig) -> anyhow::Result<()> {
//! let config = ProxyConfig::new(Url::parse("https://auth.example.com")?, attestation);
//! let proxy = ProxyServer::builder()
//!     .config(config)
//!     .secret_store(Arc::new(EnvSecretStore::new("CLIENT_CREDENTIALS")))
//!     .build()?;
//!
//! let app = axum::Router::new().merge(proxy.router());
//! # Ok(())
//! # }
//! ```

pub mod body;
pub mod config;
pub mod error;
pub mod forward;
pub mod gate;
pub mod headers;
pub mod server;

pub mod prelude {
    pub use crate::body::{AuthorizationCodeGrant, RefreshTokenGrant, TokenRequestBody};
    pub use crate::config::ProxyConfig;
    pub use crate::error::{Error, Result};
    pub use crate::forward::{Forwarder, UpstreamResponse};
    pub use crate::gate::AttestationGate;
    pub use crate::headers::{SanitizedHeaders, sanitize_header_map, sanitize_headers};
    pub use crate::server::{ProxyServer, ProxyServerBuilder};
}

pub use error::{Error, Result};
