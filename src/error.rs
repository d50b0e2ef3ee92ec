use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The application's error type.
///
/// Authentication variants carry deliberately generic messages so callers
/// cannot enumerate valid NIPs; config variants carry enough operator detail
/// to fix the backing tables.
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad or missing input.
    #[error("{0}")]
    Validation(String),

    /// Credential or code mismatch.
    #[error("{0}")]
    Auth(String),

    /// A required table, column, or config key is missing.
    #[error("{0}")]
    Config(String),

    /// The messaging gateway rejected a dispatch. Upstream detail preserved.
    #[error("{0}")]
    Gateway(String),

    /// A time-bound resource (session, one-time code) lapsed.
    #[error("{0}")]
    Expired(String),

    /// The new secret fails the composition policy.
    #[error("{0}")]
    Policy(String),

    /// Another request holds the write lock.
    #[error("Sistem sibuk. Coba lagi.")]
    Busy,

    /// A named table is absent from the backing store.
    #[error("Tabel \"{0}\" tidak ditemukan")]
    TableNotFound(String),

    /// An I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::Auth(ref msg) => {
                tracing::warn!("Authentication failed: {}", msg);
                (StatusCode::UNAUTHORIZED, msg.clone())
            }

            AppError::Config(ref msg) => {
                tracing::error!("Config error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }

            AppError::Gateway(ref msg) => {
                tracing::error!("Gateway error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.clone())
            }

            AppError::Expired(ref msg) => {
                tracing::debug!("Expired: {}", msg);
                (StatusCode::UNAUTHORIZED, msg.clone())
            }

            AppError::Policy(ref msg) => {
                tracing::debug!("Policy error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::Busy => {
                tracing::warn!("Write lock contention");
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }

            AppError::TableNotFound(ref name) => {
                tracing::error!("Table not found: {}", name);
                (StatusCode::NOT_FOUND, self.to_string())
            }

            AppError::Io(ref e) => {
                tracing::error!("IO error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "ok": false,
            "message": message
        }))
        .unwrap_or_else(|_| r#"{"ok":false,"message":"Internal server error"}"#.to_string());

        (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
    }
}
