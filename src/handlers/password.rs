use axum::{Json, extract::State};
use serde::Deserialize;
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    error::Result,
    handlers::auth::{OkResponse, clear_session_cookie, session_token},
    services::password as password_service,
    state::AppState,
};

#[derive(Deserialize, Debug)]
pub struct RequestChangeRequest {
    pub old_pin: String,
}

#[derive(Deserialize, Debug)]
pub struct VerifyRequest {
    pub otp: String,
}

#[derive(Deserialize, Debug)]
pub struct UpdateRequest {
    pub new_pin: String,
}

// A missing cookie maps to the nil token, which the session store rejects
// with its canonical expired message.
fn token_or_nil(cookies: &Cookies) -> Uuid {
    session_token(cookies).unwrap_or(Uuid::nil())
}

/// Step 1: re-check the old secret and dispatch a one-time code.
#[axum::debug_handler]
pub async fn request_change(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<RequestChangeRequest>,
) -> Result<Json<OkResponse>> {
    let token = token_or_nil(&cookies);
    let message = password_service::request_change(&state, &token, &payload.old_pin).await?;
    Ok(Json(OkResponse::with_message(message)))
}

/// Step 2: verify the code.
#[axum::debug_handler]
pub async fn verify(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<VerifyRequest>,
) -> Result<Json<OkResponse>> {
    let token = token_or_nil(&cookies);
    password_service::verify_code(&state, &token, &payload.otp).await?;
    Ok(Json(OkResponse::ok()))
}

/// Step 3: commit the new password. The session is destroyed server-side, so
/// the cookie is cleared too.
#[axum::debug_handler]
pub async fn update(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<UpdateRequest>,
) -> Result<Json<OkResponse>> {
    let token = token_or_nil(&cookies);
    password_service::set_new_password(&state, &token, &payload.new_pin).await?;
    clear_session_cookie(&cookies);
    Ok(Json(OkResponse::ok()))
}
