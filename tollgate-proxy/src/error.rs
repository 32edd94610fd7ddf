use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("attestation token missing from request")]
    MissingAttestationToken,

    #[error("invalid token request: {0}")]
    InvalidBody(String),

    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error(transparent)]
    Auth(#[from] tollgate_auth::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Internal(e.to_string())
    }
}

impl Error {
    /// The externally visible status and message. Bodies are fixed strings;
    /// diagnostic detail stays in the logs.
    fn status_and_message(&self) -> (StatusCode, &'static str) {
        use tollgate_auth::Error as Auth;

        match self {
            Error::MissingAttestationToken => {
                (StatusCode::BAD_REQUEST, "Attestation token is missing")
            }
            Error::InvalidBody(_) => (StatusCode::BAD_REQUEST, "Invalid request"),
            Error::Auth(Auth::TokenExpired) => {
                (StatusCode::UNAUTHORIZED, "Attestation token has expired")
            }
            Error::Auth(Auth::InvalidToken(_)) => {
                (StatusCode::UNAUTHORIZED, "Attestation token is invalid")
            }
            Error::Auth(Auth::UnknownApp(_)) => (
                StatusCode::FORBIDDEN,
                "Unknown app associated with attestation token",
            ),
            Error::Auth(Auth::SecretUnavailable(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error, server missing key dependencies",
            ),
            Error::Auth(Auth::Unauthorized) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            Error::Auth(_) | Error::Upstream(_) | Error::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "request failed");
        } else {
            tracing::warn!(error = %self, status = %status, "request rejected");
        }
        (status, Json(json!({ "message": message }))).into_response()
    }
}
