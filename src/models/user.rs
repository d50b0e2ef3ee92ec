use chrono::{DateTime, Utc};

/// Resolved column indexes for the Users table.
///
/// `nip` and `pin` are required; every other column degrades gracefully when
/// absent from the header row.
#[derive(Debug, Clone, Copy)]
pub struct UserColumns {
    pub nip: usize,
    pub pin: usize,
    pub aktif: Option<usize>,
    pub nama: Option<usize>,
    pub role: Option<usize>,
    pub email: Option<usize>,
    pub no_hp: Option<usize>,
    pub otp: Option<usize>,
    pub otp_expired_at: Option<usize>,
    pub otp_attempt: Option<usize>,
    pub last_changed_at: Option<usize>,
}

/// A read-only snapshot of one Users row, as cached by the directory.
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// 0-based data row index in the Users table (header row excluded).
    pub row_index: usize,
    /// Hex-encoded SHA-256 digest of the stored secret.
    pub pass_hash: String,
    /// Active flag; a missing `Aktif` column means every user is active.
    pub active: bool,
    pub nama: String,
    pub role: String,
    pub email: String,
    /// Registered contact number, raw as stored (`08xxx` or `62xxx`).
    pub no_hp: String,
    /// Pending one-time code; empty when none is outstanding.
    pub otp: String,
    pub otp_expired_at: Option<DateTime<Utc>>,
    pub otp_attempt: u32,
}
