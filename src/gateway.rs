use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{CONFIG_TABLE, ConfigStore};
use crate::error::{AppError, Result};

/// Valid `STARSENDER_MODE` values.
const VALID_MODES: &[&str] = &["bearer", "apikey", "legacy_sendtext"];

/// Out-of-band delivery of one-time codes.
///
/// Dispatch is a blocking call from the workflow's point of view: no retry or
/// backoff here, a failure surfaces immediately to the caller.
#[async_trait]
pub trait OtpGateway: Send + Sync {
    /// Sends the code to a normalized `62xxx` number.
    async fn send_code(&self, to: &str, code: &str) -> Result<()>;
}

/// Response body shape the gateway may return on HTTP 200.
#[derive(Deserialize)]
struct GatewayResponse {
    success: Option<bool>,
    message: Option<String>,
}

/// WhatsApp gateway client (Starsender).
///
/// Endpoint and auth shape vary between accounts, selected by
/// `STARSENDER_MODE`:
/// - `bearer`: `Authorization: Bearer <key>` header
/// - `apikey`: `apikey` header plus `api_key`/`device` payload fields
/// - `legacy_sendtext`: `apikey` header only
pub struct StarsenderGateway {
    http: reqwest::Client,
    config: ConfigStore,
}

impl StarsenderGateway {
    pub fn new(config: ConfigStore) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl OtpGateway for StarsenderGateway {
    async fn send_code(&self, to: &str, code: &str) -> Result<()> {
        let url = self.config.require("STARSENDER_URL")?;
        let api_key = self.config.require("STARSENDER_APIKEY")?;
        let mode = self.config.get_string("STARSENDER_MODE", "")?.to_lowercase();

        if mode.is_empty() {
            return Err(AppError::Config(format!(
                "STARSENDER_MODE belum diisi di {CONFIG_TABLE}. Isi dengan salah satu: {}",
                VALID_MODES.join(", ")
            )));
        }
        if !VALID_MODES.contains(&mode.as_str()) {
            return Err(AppError::Config(format!(
                "STARSENDER_MODE tidak dikenal (\"{mode}\"). Isi dengan salah satu: {}",
                VALID_MODES.join(", ")
            )));
        }

        // Recipient goes out as 62xxxxxxxxxx, without a leading +.
        let tujuan = to.trim_start_matches('+').to_string();
        let message = format!(
            "Kode verifikasi ganti password Anda: {code}\nBerlaku 5 menit.\nJangan bagikan kode ini kepada siapa pun."
        );

        let mut form: Vec<(&str, String)> = vec![("tujuan", tujuan), ("message", message)];
        let mut request = self.http.post(&url);
        match mode.as_str() {
            "bearer" => {
                request = request.bearer_auth(&api_key);
            }
            "legacy_sendtext" => {
                request = request.header("apikey", &api_key);
            }
            _ => {
                request = request.header("apikey", &api_key);
                form.push(("api_key", api_key.clone()));
                let device = self.config.get_string("STARSENDER_DEVICE", "")?;
                if !device.is_empty() {
                    form.push(("device", device));
                }
            }
        }

        let response = request
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("request gagal: {e}")))?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status != reqwest::StatusCode::OK {
            return Err(AppError::Gateway(format!(
                "HTTP {} - {body}",
                status.as_u16()
            )));
        }

        // A 200 carrying an explicit success:false still counts as a failure;
        // a non-JSON body does not.
        if let Ok(parsed) = sonic_rs::from_str::<GatewayResponse>(&body) {
            if parsed.success == Some(false) {
                return Err(AppError::Gateway(parsed.message.unwrap_or(body)));
            }
        }

        tracing::info!("OTP dispatched via Starsender ({})", mode);
        Ok(())
    }
}
