use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("receiver is disabled")]
    Disabled,

    #[error("invalid security event: {0}")]
    InvalidEvent(String),

    #[error("signature verification failed: {0}")]
    Signature(String),

    #[error("user directory operation failed: {0}")]
    Directory(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Transmitters only ever learn the failure class. Which check failed
    /// stays in the logs.
    fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self {
            Error::Disabled => (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable"),
            Error::InvalidEvent(_) | Error::Signature(_) => {
                (StatusCode::BAD_REQUEST, "Bad Request")
            }
            Error::Directory(_) | Error::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "event processing failed");
        } else {
            tracing::warn!(error = %self, status = %status, "event rejected");
        }
        (status, Json(json!({ "message": message }))).into_response()
    }
}
