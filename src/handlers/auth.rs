use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_cookies::cookie::time::Duration as CookieDuration;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::{error::Result, services::auth as auth_service, state::AppState};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session_id";

/// The request payload for login.
#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub nip: String,
    pub pin: String,
}

/// The uniform success payload.
#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            message: None,
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: Some(message.into()),
        }
    }
}

/// The session introspection payload.
#[derive(Serialize)]
pub struct MeResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nama: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Reads the session token from the cookie jar.
pub fn session_token(cookies: &Cookies) -> Option<Uuid> {
    cookies
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

fn session_cookie(token: Uuid, max_age_seconds: i64) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token.to_string());
    cookie.set_http_only(true);
    cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
    cookie.set_max_age(CookieDuration::seconds(max_age_seconds));
    cookie.set_path("/");
    cookie
}

/// Drops the session cookie from the client.
pub fn clear_session_cookie(cookies: &Cookies) {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_max_age(CookieDuration::seconds(0));
    cookie.set_path("/");
    cookies.remove(cookie);
}

/// Handles login: establishes the session and sets the cookie.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<OkResponse>> {
    let token = auth_service::login(&state, &payload.nip, &payload.pin)?;
    let max_age = state.config.get_number("SESSION_TTL_SECONDS", 21_600)?;
    cookies.add(session_cookie(token, max_age));
    Ok(Json(OkResponse::ok()))
}

/// Handles session introspection. Never fails.
#[axum::debug_handler]
pub async fn me(State(state): State<AppState>, cookies: Cookies) -> Json<MeResponse> {
    let token = session_token(&cookies);
    match auth_service::me(&state, token.as_ref()) {
        Some(claims) => Json(MeResponse {
            ok: true,
            nip: Some(claims.nip),
            nama: Some(claims.nama),
            role: Some(claims.role),
            email: Some(claims.email),
        }),
        None => Json(MeResponse {
            ok: false,
            nip: None,
            nama: None,
            role: None,
            email: None,
        }),
    }
}

/// Handles logout: destroys the session and clears the cookie.
#[axum::debug_handler]
pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> Json<OkResponse> {
    auth_service::logout(&state, session_token(&cookies).as_ref());
    clear_session_cookie(&cookies);
    Json(OkResponse::ok())
}
