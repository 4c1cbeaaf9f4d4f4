//! Admin panel sessions

use std::collections::HashMap;

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use tokio::sync::RwLock;

use crate::models::{AdminPrincipal, Session};

/// Storage for authenticated admin sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Start a session for `admin`
    async fn create(&self, admin: &AdminPrincipal) -> Session;

    /// Find a live session; expired sessions are treated as absent
    async fn lookup(&self, session_id: &str) -> Option<Session>;

    /// End a session. Unknown ids are ignored.
    async fn invalidate(&self, session_id: &str);
}

/// Process-local session store. Sessions do not survive a restart.
#[derive(Debug)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Number of stored sessions, expired ones included
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Random URL-safe session identifier
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, admin: &AdminPrincipal) -> Session {
        let now = Utc::now();
        let session = Session {
            id: generate_session_id(),
            admin_id: admin.id,
            username: admin.username.clone(),
            created_at: now,
            expires_at: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        let mut sessions = self.sessions.write().await;
        // Opportunistic sweep so abandoned sessions do not accumulate
        sessions.retain(|_, s| !s.is_expired_at(now));
        sessions.insert(session.id.clone(), session.clone());
        session
    }

    async fn lookup(&self, session_id: &str) -> Option<Session> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(session_id) {
                Some(session) if !session.is_expired_at(now) => return Some(session.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        self.sessions.write().await.remove(session_id);
        None
    }

    async fn invalidate(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }
}
