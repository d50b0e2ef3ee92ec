use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::session::Claims;

/// Default session lifetime: 6 hours.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(21_600);

struct TokenEntry {
    nip: String,
    expires_at: Instant,
}

/// Process-wide session state.
///
/// Tokens live in a short-lived store with the configured TTL; identity claims
/// live in a separate per-user store with no TTL of its own. The asymmetry is
/// deliberate: an absent or expired token invalidates the session even when
/// claims persist.
#[derive(Clone)]
pub struct SessionStore {
    ttl: Duration,
    tokens: Arc<RwLock<HashMap<Uuid, TokenEntry>>>,
    claims: Arc<RwLock<HashMap<String, Claims>>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            tokens: Arc::new(RwLock::new(HashMap::new())),
            claims: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates a session for the given claims and returns the opaque token.
    pub fn create(&self, claims: Claims) -> Uuid {
        let token = Uuid::new_v4();
        self.tokens
            .write()
            .expect("session lock poisoned")
            .insert(token, TokenEntry {
                nip: claims.nip.clone(),
                expires_at: Instant::now() + self.ttl,
            });
        self.claims
            .write()
            .expect("session lock poisoned")
            .insert(claims.nip.clone(), claims);
        token
    }

    /// Returns the claims when the token is present and unexpired.
    ///
    /// Expired tokens are removed lazily here; there is no background sweep.
    pub fn get(&self, token: &Uuid) -> Option<Claims> {
        let nip = {
            let mut tokens = self.tokens.write().expect("session lock poisoned");
            match tokens.get(token) {
                Some(entry) if entry.expires_at > Instant::now() => entry.nip.clone(),
                Some(_) => {
                    tokens.remove(token);
                    return None;
                }
                None => return None,
            }
        };
        self.claims
            .read()
            .expect("session lock poisoned")
            .get(&nip)
            .cloned()
    }

    /// Removes the token and that user's claims unconditionally.
    pub fn destroy(&self, token: &Uuid) {
        let entry = self
            .tokens
            .write()
            .expect("session lock poisoned")
            .remove(token);
        if let Some(entry) = entry {
            self.claims
                .write()
                .expect("session lock poisoned")
                .remove(&entry.nip);
        }
    }

    /// Claims for the token, or `Expired` when the session is gone.
    pub fn require(&self, token: &Uuid) -> Result<Claims> {
        self.get(token)
            .ok_or_else(|| AppError::Expired("Session habis. Silakan login ulang.".to_string()))
    }
}
