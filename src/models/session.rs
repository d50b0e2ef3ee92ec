use serde::{Deserialize, Serialize};

/// The identity attributes carried in a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub nip: String,
    pub nama: String,
    pub role: String,
    pub email: String,
}
