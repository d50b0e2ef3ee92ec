//! End-to-end flows over the router with an in-memory table store and a
//! recording gateway standing in for the real WhatsApp dispatch.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use hcis::directory::USERS_TABLE;
use hcis::error::Result;
use hcis::gateway::OtpGateway;
use hcis::state::AppState;
use hcis::store::memory::MemoryStore;

#[derive(Default)]
struct RecordingGateway {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait::async_trait]
impl OtpGateway for RecordingGateway {
    async fn send_code(&self, to: &str, code: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), code.to_string()));
        Ok(())
    }
}

fn seeded_app() -> (Router, Arc<MemoryStore>, Arc<RecordingGateway>) {
    let store = Arc::new(MemoryStore::new());
    store.put_table(
        USERS_TABLE,
        vec![
            "NIP",
            "PIN",
            "Aktif",
            "Nama",
            "Role",
            "Email",
            "No_HP",
            "ResetPIN_OTP",
            "ResetPIN_ExpiredAt",
            "OTP_Attempt",
            "PIN_LastChangedAt",
        ],
        vec![
            vec![
                "1001",
                "Rahasia1!",
                "TRUE",
                "Budi",
                "PTK",
                "budi@example.id",
                "081234567890",
                "",
                "",
                "",
                "",
            ],
            vec![
                "1002",
                "Rahasia1!",
                "FALSE",
                "Sari",
                "PTK",
                "sari@example.id",
                "6281111111111",
                "",
                "",
                "",
                "",
            ],
        ],
    );

    let gateway = Arc::new(RecordingGateway::default());
    let state = AppState::with_parts(store.clone(), gateway.clone()).unwrap();
    (hcis::router(state), store, gateway)
}

async fn post(app: &Router, uri: &str, cookie: Option<&str>, body: Value) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = builder.body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

fn session_cookie(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .expect("set-cookie header")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn login_me_logout_round_trip() {
    let (app, _store, _gateway) = seeded_app();

    let response = post(
        &app,
        "/api/auth/login",
        None,
        json!({"nip": "1001", "pin": "Rahasia1!"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);
    assert!(body_json(response).await["ok"].as_bool().unwrap());

    let me = body_json(get(&app, "/api/auth/me", Some(&cookie)).await).await;
    assert!(me["ok"].as_bool().unwrap());
    assert_eq!(me["nip"], "1001");
    assert_eq!(me["nama"], "Budi");
    assert_eq!(me["role"], "PTK");

    let out = post(&app, "/api/auth/logout", Some(&cookie), json!({})).await;
    assert_eq!(out.status(), StatusCode::OK);

    let me = body_json(get(&app, "/api/auth/me", Some(&cookie)).await).await;
    assert!(!me["ok"].as_bool().unwrap());
}

#[tokio::test]
async fn failed_logins_share_one_generic_message() {
    let (app, _store, _gateway) = seeded_app();

    for payload in [
        json!({"nip": "123", "pin": "abc"}),   // unknown
        json!({"nip": "1001", "pin": "abc"}),  // wrong secret
        json!({"nip": "1002", "pin": "Rahasia1!"}), // inactive
    ] {
        let response = post(&app, "/api/auth/login", None, payload).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert!(!body["ok"].as_bool().unwrap());
        assert_eq!(body["message"], "Login gagal");
    }

    let response = post(&app, "/api/auth/login", None, json!({"nip": "", "pin": ""})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn password_change_flow_over_http() {
    let (app, _store, gateway) = seeded_app();

    let response = post(
        &app,
        "/api/auth/login",
        None,
        json!({"nip": "1001", "pin": "Rahasia1!"}),
    )
    .await;
    let cookie = session_cookie(&response);

    // Step 1: request.
    let response = post(
        &app,
        "/api/password/request",
        Some(&cookie),
        json!({"old_pin": "Rahasia1!"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Kode verifikasi dikirim ke No_HP");

    let (recipient, code) = gateway.sent.lock().unwrap().last().unwrap().clone();
    assert_eq!(recipient, "6281234567890"); // 08xxx normalized before dispatch
    assert_eq!(code.len(), 6);

    // Step 2: a wrong code is retryable, the right one verifies.
    let wrong = if code == "999999" { "111111" } else { "999999" };
    let response = post(
        &app,
        "/api/password/verify",
        Some(&cookie),
        json!({"otp": wrong}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "OTP tidak sesuai");

    let response = post(
        &app,
        "/api/password/verify",
        Some(&cookie),
        json!({"otp": code}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Step 3: commit. The session dies with the old credential.
    let response = post(
        &app,
        "/api/password/update",
        Some(&cookie),
        json!({"new_pin": "BaruKuat1!"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let me = body_json(get(&app, "/api/auth/me", Some(&cookie)).await).await;
    assert!(!me["ok"].as_bool().unwrap());

    let response = post(
        &app,
        "/api/auth/login",
        None,
        json!({"nip": "1001", "pin": "Rahasia1!"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post(
        &app,
        "/api/auth/login",
        None,
        json!({"nip": "1001", "pin": "BaruKuat1!"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn password_phases_reject_a_missing_session() {
    let (app, _store, _gateway) = seeded_app();

    let response = post(
        &app,
        "/api/password/request",
        None,
        json!({"old_pin": "Rahasia1!"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["message"],
        "Session habis. Silakan login ulang."
    );
}

#[tokio::test]
async fn weak_new_password_is_rejected_with_the_policy_hint() {
    let (app, _store, _gateway) = seeded_app();

    let response = post(
        &app,
        "/api/auth/login",
        None,
        json!({"nip": "1001", "pin": "Rahasia1!"}),
    )
    .await;
    let cookie = session_cookie(&response);

    let response = post(
        &app,
        "/api/password/update",
        Some(&cookie),
        json!({"new_pin": "password"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("tidak memenuhi aturan")
    );
}

#[tokio::test]
async fn leave_submission_requires_login_and_appends() {
    let (app, store, _gateway) = seeded_app();
    store.put_table("AtasanMap", vec!["NIP", "ApproverNIP", "Aktif"], vec![vec![
        "1001", "2001", "TRUE",
    ]]);
    store.put_table("Cuti_Pengajuan", vec!["Id"], vec![]);

    let payload = json!({
        "jenis": "Tahunan",
        "satuan": "Hari",
        "tgl_mulai": "2026-09-01",
        "tgl_selesai": "2026-09-03",
        "alasan": "Keperluan keluarga",
    });

    let response = post(&app, "/api/leave", None, payload.clone()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post(
        &app,
        "/api/auth/login",
        None,
        json!({"nip": "1001", "pin": "Rahasia1!"}),
    )
    .await;
    let cookie = session_cookie(&response);

    let response = post(&app, "/api/leave", Some(&cookie), payload).await;
    assert_eq!(response.status(), StatusCode::OK);

    use hcis::store::TableStore;
    let table = store.read_table("Cuti_Pengajuan").unwrap();
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.rows[0][3], "1001");
    assert_eq!(table.rows[0][15], "2001");
}
