use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::Result;
use crate::state::AppState;
use crate::store::is_true;

/// Name of the leave request table.
pub const LEAVE_TABLE: &str = "Cuti_Pengajuan";

/// Name of the NIP -> approver mapping table.
pub const APPROVER_TABLE: &str = "AtasanMap";

/// A leave submission from the client.
#[derive(Debug, Deserialize)]
pub struct LeaveRequest {
    pub jenis: String,
    pub satuan: String,
    pub tgl_mulai: String,
    pub tgl_selesai: String,
    pub alasan: String,
}

/// Appends one leave request row, status `DIAJUKAN`, under the process write
/// lock. Approval itself happens elsewhere.
pub async fn submit(state: &AppState, token: &Uuid, request: &LeaveRequest) -> Result<()> {
    let _guard = state.acquire_write_lock().await?;
    let claims = state.sessions.require(token)?;

    let approver = approver_for(state, &claims.nip)?;
    let now = Utc::now().to_rfc3339();

    state.store.append_row(LEAVE_TABLE, vec![
        Uuid::new_v4().to_string(),
        now.clone(),
        claims.email.clone(),
        claims.nip.clone(),
        claims.nama.clone(),
        request.jenis.clone(),
        request.satuan.clone(),
        request.tgl_mulai.clone(),
        request.tgl_selesai.clone(),
        String::new(),
        String::new(),
        String::new(),
        request.alasan.clone(),
        String::new(),
        "DIAJUKAN".to_string(),
        approver,
        String::new(),
        String::new(),
        String::new(),
        now,
    ])?;

    tracing::info!("leave request submitted by {}", claims.nip);
    Ok(())
}

/// Resolves the active approver for a NIP; empty when none is mapped.
fn approver_for(state: &AppState, nip: &str) -> Result<String> {
    let table = state.store.read_table(APPROVER_TABLE)?;
    let c_nip = match table.column_index("NIP") {
        Some(c) => c,
        None => return Ok(String::new()),
    };
    let c_approver = table.column_index("ApproverNIP");
    let c_aktif = table.column_index("Aktif");

    for row in &table.rows {
        let row_nip = row.get(c_nip).map(|v| v.trim()).unwrap_or_default();
        let active = c_aktif
            .and_then(|c| row.get(c))
            .map(|v| is_true(v))
            .unwrap_or(true);
        if row_nip == nip && active {
            return Ok(c_approver
                .and_then(|c| row.get(c))
                .map(|v| v.trim().to_string())
                .unwrap_or_default());
        }
    }
    Ok(String::new())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::directory::USERS_TABLE;
    use crate::gateway::OtpGateway;
    use crate::services::auth as auth_service;
    use crate::store::TableStore;
    use crate::store::memory::MemoryStore;

    struct NullGateway;

    #[async_trait::async_trait]
    impl OtpGateway for NullGateway {
        async fn send_code(&self, _to: &str, _code: &str) -> Result<()> {
            Ok(())
        }
    }

    fn seeded() -> (AppState, Uuid, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store.put_table(
            USERS_TABLE,
            vec!["NIP", "PIN", "Nama", "Email"],
            vec![vec!["1001", "abc", "Budi", "budi@example.id"]],
        );
        // Seeded under the literal sheet names the document carries.
        store.put_table("AtasanMap", vec!["NIP", "ApproverNIP", "Aktif"], vec![
            vec!["1001", "2001", "TRUE"],
            vec!["1001", "9999", "FALSE"],
        ]);
        store.put_table("Cuti_Pengajuan", vec!["Id"], vec![]);

        let state = AppState::with_parts(store.clone(), Arc::new(NullGateway)).unwrap();
        let token = auth_service::login(&state, "1001", "abc").unwrap();
        (state, token, store)
    }

    fn request() -> LeaveRequest {
        LeaveRequest {
            jenis: "Tahunan".to_string(),
            satuan: "Hari".to_string(),
            tgl_mulai: "2026-09-01".to_string(),
            tgl_selesai: "2026-09-03".to_string(),
            alasan: "Keperluan keluarga".to_string(),
        }
    }

    #[tokio::test]
    async fn submit_appends_one_row_with_claims_and_approver() {
        let (state, token, store) = seeded();
        submit(&state, &token, &request()).await.unwrap();

        let table = store.read_table(LEAVE_TABLE).unwrap();
        assert_eq!(table.rows.len(), 1);
        let row = &table.rows[0];
        assert_eq!(row[3], "1001");
        assert_eq!(row[4], "Budi");
        assert_eq!(row[5], "Tahunan");
        assert_eq!(row[14], "DIAJUKAN");
        assert_eq!(row[15], "2001"); // the active mapping wins
    }

    #[tokio::test]
    async fn submit_without_a_session_fails() {
        let (state, _token, _store) = seeded();
        assert!(submit(&state, &Uuid::nil(), &request()).await.is_err());
    }

    #[tokio::test]
    async fn unmapped_nip_gets_an_empty_approver() {
        let (state, token, store) = seeded();
        store.put_table(APPROVER_TABLE, vec!["NIP", "ApproverNIP", "Aktif"], vec![]);
        submit(&state, &token, &request()).await.unwrap();
        assert_eq!(store.read_table(LEAVE_TABLE).unwrap().rows[0][15], "");
    }
}
