use crate::config::DatabaseConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Row of the `users` table
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    /// bcrypt hash of the password, salt included
    pub password: String,
}

/// Relational user store
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>>;

    /// Insert a user and return its id; duplicate names are a conflict
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<i64>;
}

const CREATE_USERS_TABLE: &str = "CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL
)";

/// Postgres-backed user store
#[derive(Clone)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size.max(1))
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(url)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create the users table when missing
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_USERS_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, password FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<i64> {
        let result: std::result::Result<(i64,), sqlx::Error> = sqlx::query_as(
            "INSERT INTO users (username, password) VALUES ($1, $2) RETURNING id",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok((id,)) => {
                tracing::debug!(user_id = id, username = %username, "User created");
                Ok(id)
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(AppError::Conflict(
                format!("User {} already exists", username),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory user store (for tests and database-less deployments)
#[derive(Clone)]
pub struct InMemoryUserStore {
    users: Arc<DashMap<String, UserRecord>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self.users.get(username).map(|entry| entry.clone()))
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<i64> {
        match self.users.entry(username.to_string()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "User {} already exists",
                username
            ))),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                slot.insert(UserRecord {
                    id,
                    username: username.to_string(),
                    password: password_hash.to_string(),
                });
                tracing::debug!(user_id = id, username = %username, "User created");
                Ok(id)
            }
        }
    }
}

/// Pick the user store from configuration
pub async fn create_user_store(config: &DatabaseConfig) -> Result<Arc<dyn UserStore>> {
    match config.url() {
        Some(url) => {
            let store = PostgresUserStore::connect(&url, config).await?;
            tracing::info!(pool_size = config.pool_size, "Postgres user store connected");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!(
                url_env = %config.url_env,
                "No database URL configured, users are kept in memory"
            );
            Ok(Arc::new(InMemoryUserStore::new()))
        }
    }
}
