//! Username/password authentication backed by the `users` table

mod password;
mod store;
mod tokens;

pub use password::{hash_password, verify_password, DEFAULT_COST};
pub use store::{create_user_store, InMemoryUserStore, PostgresUserStore, UserRecord, UserStore};
pub use tokens::{AccessToken, TokenIssuer};

use crate::error::{AppError, Result};
use crate::metrics::LOGIN_ATTEMPTS_TOTAL;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Public view of a registered user
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RegisteredUser {
    pub id: i64,
    pub username: String,
}

/// Login, registration and token resolution
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    tokens: TokenIssuer,
    hash_cost: u32,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, token_ttl_secs: i64) -> Self {
        Self {
            store,
            tokens: TokenIssuer::new(token_ttl_secs),
            hash_cost: DEFAULT_COST,
        }
    }

    /// Override the bcrypt cost used for new passwords
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Check credentials and issue a bearer token
    ///
    /// Unknown users and wrong passwords fail identically.
    pub async fn login(&self, username: &str, password: &str) -> Result<AccessToken> {
        let user = self.store.find_user(username).await?;

        let verified = match user {
            Some(ref user) => {
                let plain = password.to_string();
                let stored = user.password.clone();
                tokio::task::spawn_blocking(move || verify_password(&plain, &stored))
                    .await
                    .map_err(|e| AppError::Internal(format!("Password check failed: {}", e)))?
            }
            None => false,
        };

        match user {
            Some(user) if verified => {
                LOGIN_ATTEMPTS_TOTAL.with_label_values(&["success"]).inc();
                info!(username = %username, "User logged in");
                Ok(self.tokens.issue(&user.username))
            }
            _ => {
                LOGIN_ATTEMPTS_TOTAL.with_label_values(&["failure"]).inc();
                warn!(username = %username, "Rejected login attempt");
                Err(AppError::Authentication("Invalid credentials".to_string()))
            }
        }
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<RegisteredUser> {
        let plain = password.to_string();
        let cost = self.hash_cost;
        let hash = tokio::task::spawn_blocking(move || hash_password(&plain, cost))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))??;

        let id = self.store.create_user(username, &hash).await?;

        info!(user_id = id, username = %username, "User registered");
        Ok(RegisteredUser {
            id,
            username: username.to_string(),
        })
    }

    /// Username behind a bearer token
    pub fn authenticate(&self, token: &str) -> Result<String> {
        self.tokens
            .resolve(token)
            .ok_or_else(|| AppError::Authentication("Invalid or expired token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(Arc::new(InMemoryUserStore::new()), 60).with_hash_cost(4)
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let auth = service();
        let user = auth.register("alice", "pw").await.unwrap();
        assert_eq!(user.username, "alice");

        let token = auth.login("alice", "pw").await.unwrap();
        assert_eq!(auth.authenticate(&token.access_token).unwrap(), "alice");
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let auth = service();
        auth.register("alice", "pw").await.unwrap();

        let err = auth.login("alice", "nope").await.unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));

        let err = auth.login("mallory", "pw").await.unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_stored_password_is_salted_hash() {
        let store = Arc::new(InMemoryUserStore::new());
        let auth = AuthService::new(store.clone(), 60).with_hash_cost(4);
        auth.register("alice", "pw").await.unwrap();
        auth.register("bob", "pw").await.unwrap();

        let alice = store.find_user("alice").await.unwrap().unwrap();
        let bob = store.find_user("bob").await.unwrap().unwrap();
        assert_ne!(alice.password, "pw");
        assert_ne!(alice.password, bob.password);
    }

    #[test]
    fn test_unknown_token() {
        assert!(matches!(
            service().authenticate("nope"),
            Err(AppError::Authentication(_))
        ));
    }
}
