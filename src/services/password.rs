//! Password change behind a one-time WhatsApp code, in three phases:
//! request (re-check old secret, issue and dispatch a code), verify
//! (attempt-limited exact comparison), commit (policy check, write, drop the
//! session). Verification success is transient; the commit phase relies on
//! the caller having just verified within the same session.

use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

use crate::directory::{USERS_TABLE, digest_secret};
use crate::error::{AppError, Result};
use crate::models::user::{UserColumns, UserRecord};
use crate::state::AppState;
use crate::validation::auth::{normalize_phone, validate_password};

/// Minutes a one-time code stays valid.
pub const OTP_EXPIRE_MIN: i64 = 5;

/// Wrong attempts before a pending code is invalidated.
pub const OTP_MAX_ATTEMPT: u32 = 3;

/// Step 1: re-validate the old secret, persist a fresh code, dispatch it.
///
/// The persisted code is deliberately not rolled back when dispatch fails; a
/// retried request overwrites it.
pub async fn request_change(state: &AppState, token: &Uuid, old_pin: &str) -> Result<String> {
    let _guard = state.acquire_write_lock().await?;
    let claims = state.sessions.require(token)?;

    let dir = state.directory.load_fresh()?;
    let user = dir.get(&claims.nip).ok_or_else(user_not_found)?;

    if user.pass_hash != digest_secret(old_pin) {
        return Err(AppError::Auth("Password lama tidak sesuai".to_string()));
    }

    if user.no_hp.is_empty() {
        return Err(AppError::Validation(
            "No_HP belum terdaftar di Users".to_string(),
        ));
    }
    let no_hp = normalize_phone(&user.no_hp).ok_or_else(|| {
        AppError::Validation("Format No_HP tidak valid (harus 08xxx atau 62xxx)".to_string())
    })?;

    let cols = otp_columns(&dir.cols)?;
    let otp = generate_otp();
    let expire_at = Utc::now() + chrono::Duration::minutes(OTP_EXPIRE_MIN);

    mutate_user_row(state, user, |row| {
        row[cols.otp] = otp.clone();
        row[cols.expired_at] = expire_at.to_rfc3339();
        row[cols.attempt] = "0".to_string();
    })?;
    state.directory.invalidate();

    if let Err(e) = state.gateway.send_code(&no_hp, &otp).await {
        return Err(match e {
            AppError::Gateway(detail) => AppError::Gateway(format!("Gagal mengirim OTP: {detail}")),
            other => other,
        });
    }

    tracing::info!("OTP issued for {}", claims.nip);
    Ok("Kode verifikasi dikirim ke No_HP".to_string())
}

/// Step 2: exact comparison against the pending code, attempt-limited.
pub async fn verify_code(state: &AppState, token: &Uuid, input: &str) -> Result<()> {
    let _guard = state.acquire_write_lock().await?;
    let claims = state.sessions.require(token)?;

    // Attempt counting must never act on a stale snapshot.
    let dir = state.directory.load_fresh()?;
    let user = dir.get(&claims.nip).ok_or_else(user_not_found)?;
    let cols = otp_columns(&dir.cols)?;

    let lapsed = match user.otp_expired_at {
        Some(at) => at < Utc::now(),
        None => true,
    };
    if user.otp.is_empty() || lapsed {
        return Err(AppError::Expired(
            "Kode OTP sudah kedaluwarsa. Silakan kirim ulang.".to_string(),
        ));
    }

    if user.otp != input.trim() {
        let attempt = user.otp_attempt + 1;
        mutate_user_row(state, user, |row| {
            row[cols.attempt] = attempt.to_string();
            if attempt >= OTP_MAX_ATTEMPT {
                clear_otp_cells(row, &cols);
            }
        })?;
        state.directory.invalidate();

        if attempt >= OTP_MAX_ATTEMPT {
            tracing::warn!("OTP attempts exhausted for {}", claims.nip);
            return Err(AppError::Auth(
                "OTP salah terlalu banyak. Silakan kirim ulang.".to_string(),
            ));
        }
        return Err(AppError::Auth("OTP tidak sesuai".to_string()));
    }

    tracing::info!("OTP verified for {}", claims.nip);
    Ok(())
}

/// Step 3: policy-check the new secret, write it, clear OTP state, and drop
/// the session so the user logs in again with the new credential.
pub async fn set_new_password(state: &AppState, token: &Uuid, new_pin: &str) -> Result<()> {
    let _guard = state.acquire_write_lock().await?;
    let claims = state.sessions.require(token)?;

    validate_password(new_pin.trim())?;

    let dir = state.directory.load_fresh()?;
    let user = dir.get(&claims.nip).ok_or_else(user_not_found)?;

    if user.pass_hash == digest_secret(new_pin) {
        return Err(AppError::Validation(
            "Password baru tidak boleh sama dengan password lama".to_string(),
        ));
    }

    let cols = dir.cols;
    let otp_cols = otp_columns(&cols).ok();
    mutate_user_row(state, user, |row| {
        row[cols.pin] = new_pin.trim().to_string();
        if let Some(changed_at) = cols.last_changed_at {
            row[changed_at] = Utc::now().to_rfc3339();
        }
        if let Some(ref otp_cols) = otp_cols {
            clear_otp_cells(row, otp_cols);
        }
    })?;

    state.directory.invalidate();
    state.sessions.destroy(token);

    tracing::info!("password changed for {}", claims.nip);
    Ok(())
}

struct OtpColumns {
    otp: usize,
    expired_at: usize,
    attempt: usize,
}

fn otp_columns(cols: &UserColumns) -> Result<OtpColumns> {
    match (cols.otp, cols.otp_expired_at, cols.otp_attempt) {
        (Some(otp), Some(expired_at), Some(attempt)) => Ok(OtpColumns {
            otp,
            expired_at,
            attempt,
        }),
        _ => Err(AppError::Config(format!(
            "Kolom OTP (ResetPIN_*) belum lengkap di {USERS_TABLE}"
        ))),
    }
}

fn clear_otp_cells(row: &mut [String], cols: &OtpColumns) {
    row[cols.otp].clear();
    row[cols.expired_at].clear();
    row[cols.attempt].clear();
}

/// Reads the user's current row, applies the mutator, writes it back padded
/// to header width. Callers hold the write lock around the whole sequence.
fn mutate_user_row<F>(state: &AppState, user: &UserRecord, mutate: F) -> Result<()>
where
    F: FnOnce(&mut Vec<String>),
{
    let table = state.store.read_table(USERS_TABLE)?;
    let mut row = table.rows.get(user.row_index).cloned().unwrap_or_default();
    row.resize(table.headers.len(), String::new());
    mutate(&mut row);
    state.store.write_row(USERS_TABLE, user.row_index, row)
}

/// Six decimal digits, 100000..=999999.
fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

fn user_not_found() -> AppError {
    AppError::Auth("User tidak ditemukan".to_string())
}
