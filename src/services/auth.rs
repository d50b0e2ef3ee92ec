use uuid::Uuid;

use crate::directory::digest_secret;
use crate::error::{AppError, Result};
use crate::models::session::Claims;
use crate::state::AppState;

/// Validates credentials against the user directory and establishes a
/// session.
///
/// Unknown NIP, inactive user, and wrong secret all fail with the same
/// generic message so callers cannot enumerate valid NIPs.
pub fn login(state: &AppState, nip: &str, pin: &str) -> Result<Uuid> {
    let nip = nip.trim();
    let pin = pin.trim();
    if nip.is_empty() || pin.is_empty() {
        return Err(AppError::Validation("NIP & PIN wajib diisi".to_string()));
    }

    let dir = state.directory.load()?;
    let user = dir.get(nip).ok_or_else(login_failed)?;
    if !user.active || user.pass_hash != digest_secret(pin) {
        return Err(login_failed());
    }

    let token = state.sessions.create(Claims {
        nip: nip.to_string(),
        nama: user.nama.clone(),
        role: user.role.clone(),
        email: user.email.clone(),
    });
    tracing::info!("user {} logged in", nip);
    Ok(token)
}

fn login_failed() -> AppError {
    AppError::Auth("Login gagal".to_string())
}

/// Session claims for the token, if any. Never fails.
pub fn me(state: &AppState, token: Option<&Uuid>) -> Option<Claims> {
    token.and_then(|t| state.sessions.get(t))
}

/// Destroys the session. Succeeds with or without one.
pub fn logout(state: &AppState, token: Option<&Uuid>) {
    if let Some(token) = token {
        state.sessions.destroy(token);
        tracing::info!("session destroyed on logout");
    }
}
