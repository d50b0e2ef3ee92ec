//! HR self-service backend over a spreadsheet-like tabular store: credential
//! and session management plus an OTP-gated password change workflow.

use axum::{
    Router,
    routing::{get, post},
};
use tower_cookies::CookieManagerLayer;

pub mod config;
pub mod directory;
pub mod error;
pub mod gateway;
pub mod session;
pub mod state;
pub mod store;

pub mod models {
    pub mod session;
    pub mod user;
}

pub mod services {
    pub mod auth;
    pub mod leave;
    pub mod password;
}

pub mod handlers {
    pub mod auth;
    pub mod leave;
    pub mod password;
}

pub mod validation {
    pub mod auth;
}

/// Builds the application router over the given state. Rate limiting and
/// request tracing are layered on by the binary.
pub fn router(state: state::AppState) -> Router {
    Router::new()
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/password/request", post(handlers::password::request_change))
        .route("/api/password/verify", post(handlers::password::verify))
        .route("/api/password/update", post(handlers::password::update))
        .route("/api/leave", post(handlers::leave::submit))
        .layer(CookieManagerLayer::new())
        .with_state(state)
}
