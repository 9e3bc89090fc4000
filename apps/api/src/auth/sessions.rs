//! Opaque bearer sessions.
//!
//! Tokens are 32 random bytes (URL-safe base64). Only the SHA-256 of a token is
//! kept, so a dump of this store cannot be replayed.

use std::collections::HashMap;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::auth::store::User;

/// Expired entries are swept on issue once the map grows past this.
const SWEEP_THRESHOLD: usize = 1000;

#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionStore {
    ttl: chrono::Duration,
    sessions: RwLock<HashMap<[u8; 32], Session>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1)),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a session for `user` and returns the bearer token. The token itself is not stored.
    pub async fn issue(&self, user: &User) -> String {
        let token = generate_token();
        let now = Utc::now();
        let session = Session {
            user_id: user.id,
            email: user.email.clone(),
            expires_at: now + self.ttl,
        };

        let mut sessions = self.sessions.write().await;
        if sessions.len() > SWEEP_THRESHOLD {
            let before = sessions.len();
            sessions.retain(|_, s| s.expires_at > now);
            debug!("Swept {} expired sessions", before - sessions.len());
        }
        sessions.insert(hash_token(&token), session);
        token
    }

    /// Returns the live session for `token`. Expired sessions are evicted and rejected.
    pub async fn validate(&self, token: &str) -> Option<Session> {
        let key = hash_token(token);
        let now = Utc::now();

        {
            let sessions = self.sessions.read().await;
            match sessions.get(&key) {
                None => return None,
                Some(session) if session.expires_at > now => return Some(session.clone()),
                Some(_) => {}
            }
        }

        self.sessions.write().await.remove(&key);
        None
    }
}

fn hash_token(token: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::new("a@example.com".to_string(), "hash".to_string())
    }

    #[tokio::test]
    async fn test_issued_token_validates() {
        let store = SessionStore::new(Duration::from_secs(60));
        let user = user();
        let token = store.issue(&user).await;

        let session = store.validate(&token).await.unwrap();
        assert_eq!(session.user_id, user.id);
        assert_eq!(session.email, "a@example.com");
    }

    #[tokio::test]
    async fn test_unknown_token_is_rejected() {
        let store = SessionStore::new(Duration::from_secs(60));
        store.issue(&user()).await;
        assert!(store.validate("not-a-token").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected_and_evicted() {
        let store = SessionStore::new(Duration::ZERO);
        let token = store.issue(&user()).await;

        assert!(store.validate(&token).await.is_none());
        assert!(store.sessions.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_tokens_are_unique_and_not_stored_in_clear() {
        let store = SessionStore::new(Duration::from_secs(60));
        let a = store.issue(&user()).await;
        let b = store.issue(&user()).await;
        assert_ne!(a, b);

        let sessions = store.sessions.read().await;
        assert_eq!(sessions.len(), 2);
        assert!(!sessions.contains_key(a.as_bytes()));
    }
}
