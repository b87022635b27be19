use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Bearer token handed out at login
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until expiry
    pub expires_in: i64,
}

#[derive(Debug, Clone)]
struct Session {
    username: String,
    expires_at: DateTime<Utc>,
}

/// Issues opaque tokens and resolves them back to usernames
#[derive(Clone)]
pub struct TokenIssuer {
    sessions: Arc<DashMap<String, Session>>,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    pub fn issue(&self, username: &str) -> AccessToken {
        let token = Uuid::new_v4().simple().to_string();
        self.sessions.insert(
            token.clone(),
            Session {
                username: username.to_string(),
                expires_at: Utc::now() + self.ttl,
            },
        );

        AccessToken {
            access_token: token,
            token_type: "bearer".to_string(),
            expires_in: self.ttl.num_seconds(),
        }
    }

    /// Username bound to a live token; expired tokens are dropped
    pub fn resolve(&self, token: &str) -> Option<String> {
        let session = self.sessions.get(token).map(|entry| entry.clone())?;

        if session.expires_at <= Utc::now() {
            self.sessions.remove(token);
            return None;
        }

        Some(session.username)
    }

    /// Remove every expired session, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut purged = 0;
        self.sessions.retain(|_, session| {
            let live = session.expires_at > now;
            if !live {
                purged += 1;
            }
            live
        });
        purged
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}
