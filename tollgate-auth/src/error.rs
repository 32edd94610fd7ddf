use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Token failed a shape, signature, issuer, audience or key-lookup check.
    #[error("token is invalid: {0}")]
    InvalidToken(String),

    /// Token signature was fine but the token is past its expiry.
    #[error("token has expired")]
    TokenExpired,

    /// Attestation subject is not in the configured app allow-list.
    #[error("unknown app: {0}")]
    UnknownApp(String),

    /// Fetched key set does not have the required JWKS structure.
    #[error("malformed key set: {0}")]
    MalformedKeySet(String),

    /// Key set could not be fetched from its source.
    #[error("key set unavailable: {0}")]
    KeySetUnavailable(String),

    /// Client credentials could not be read from the secret store.
    #[error("secret unavailable: {0}")]
    SecretUnavailable(String),

    /// Collapsed bearer-authorization failure. Carries no cause on purpose;
    /// the cause is logged where the collapse happens.
    #[error("unauthorized")]
    Unauthorized,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Internal(e.to_string())
    }
}
