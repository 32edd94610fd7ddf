//! # tollgate-auth
//!
//! Token verification building blocks for the tollgate proxy.
//!
//! This crate owns everything that touches keys and tokens:
//!
//! - **JWKS handling**: structural validation of fetched key sets and a
//!   process-wide TTL cache keyed by logical source name
//! - **Attestation verification**: RS256 app-attestation JWTs checked
//!   against a third-party issuer's key set and an app allow-list
//! - **Bearer authorization**: access-token verification against a user
//!   pool, producing IAM-style allow/deny policy documents
//! - **Secret access**: a pluggable store for the confidential client
//!   credentials, with env-backed and in-memory implementations
//!
//! The crate is transport-agnostic: it fetches key sets over HTTP but
//! exposes no routes itself. `tollgate-proxy` and `tollgate-signals` wire
//! these pieces into axum handlers.

pub mod attestation;
pub mod authorizer;
pub mod bearer;
pub mod cache;
pub mod error;
pub mod jwks;
pub mod policy;
pub mod secrets;

pub mod prelude {
    pub use crate::attestation::{AttestationClaims, AttestationConfig, AttestationVerifier};
    pub use crate::authorizer::Authorizer;
    pub use crate::bearer::{AccessClaims, AccessTokenVerifier, PoolConfig, bearer_token};
    pub use crate::cache::{KeyCache, KeySource};
    pub use crate::error::{Error, Result};
    pub use crate::jwks::{Jwk, Jwks};
    pub use crate::policy::{AuthorizerResponse, Effect, PolicyDocument};
    pub use crate::secrets::{
        CachedSecretStore, ClientCredentials, EnvSecretStore, MemorySecretStore, SecretStore,
    };
}

pub use error::{Error, Result};
