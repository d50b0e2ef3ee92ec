use axum::{Json, extract::State};
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    error::Result,
    handlers::auth::{OkResponse, session_token},
    services::leave::{self as leave_service, LeaveRequest},
    state::AppState,
};

/// Handles leave submission for the logged-in user.
#[axum::debug_handler]
pub async fn submit(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<LeaveRequest>,
) -> Result<Json<OkResponse>> {
    let token = session_token(&cookies).unwrap_or(Uuid::nil());
    leave_service::submit(&state, &token, &payload).await?;
    Ok(Json(OkResponse::ok()))
}
