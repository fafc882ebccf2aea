// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SQLite-backed user store with typed operations.
//!
//! Login uniqueness is enforced by the table's UNIQUE constraint, so
//! concurrent writers are arbitrated by SQLite itself. The store never
//! checks-then-writes.

use crate::db::tables;
use crate::models::{NewUser, User, UserPatch};
use crate::services::password::{hash_password, PasswordError};
use crate::time_utils::now_rfc3339;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const USER_COLUMNS: &str =
    "id, login, password, name, profile_photo, photo_mime_type, created_at, updated_at";

/// Failures reported by the store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No row has the requested id.
    #[error("User not found")]
    NotFound,

    /// The write would duplicate another row's login.
    #[error("Login already exists")]
    ConstraintViolation,

    /// A required field was supplied empty.
    #[error("Field must not be empty: {0}")]
    EmptyField(&'static str),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("Storage error: {0}")]
    Storage(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::ConstraintViolation;
            }
        }
        StoreError::Storage(err)
    }
}

/// User store over a SQLite connection pool.
#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    /// Open (creating if missing) the database at `url` and ensure the schema exists.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;

        tracing::info!(url, "Connected to SQLite");
        Ok(store)
    }

    /// Create a private in-memory store for testing.
    ///
    /// Each in-memory connection is its own database, so the pool is pinned
    /// to one connection that is never recycled.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create the users table if it does not exist.
    ///
    /// AUTOINCREMENT keeps ids of deleted rows from being handed out again.
    // TODO: decide whether profile photos stay inline in this table or move
    // to external blob storage with a reference column.
    async fn init_schema(&self) -> Result<(), StoreError> {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                login TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                name TEXT NOT NULL,
                profile_photo TEXT,
                photo_mime_type TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            table = tables::USERS
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    // ─── User Operations ─────────────────────────────────────────

    /// All users ordered by ascending id.
    pub async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM {} ORDER BY id ASC",
            tables::USERS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Get a user by id.
    pub async fn get_user(&self, id: i64) -> Result<User, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM {} WHERE id = ?", tables::USERS);
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    /// Whether a row with this id exists.
    pub async fn user_exists(&self, id: i64) -> Result<bool, StoreError> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?)", tables::USERS);
        let exists: i64 = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists != 0)
    }

    /// Insert a new user and return it with its assigned id.
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let NewUser {
            login,
            password,
            name,
            profile_photo,
            photo_mime_type,
        } = new_user;

        for (field, value) in [("login", &login), ("password", &password), ("name", &name)] {
            if value.is_empty() {
                return Err(StoreError::EmptyField(field));
            }
        }

        let password_hash = hash_password(password).await?;
        let now = now_rfc3339();

        let sql = format!(
            r#"
            INSERT INTO {} (login, password, name, profile_photo, photo_mime_type, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {USER_COLUMNS}
            "#,
            tables::USERS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(login)
            .bind(password_hash)
            .bind(name)
            .bind(profile_photo)
            .bind(photo_mime_type)
            .bind(&now)
            .bind(&now)
            .fetch_one(&self.pool)
            .await?;

        tracing::debug!(user_id = user.id, "Created user");
        Ok(user)
    }

    /// Merge the supplied fields into an existing user.
    ///
    /// Runs as a single `UPDATE ... RETURNING`, so the merge is atomic and a
    /// login collision leaves the row untouched.
    pub async fn update_user(&self, id: i64, patch: UserPatch) -> Result<User, StoreError> {
        if let Some(field) = patch.empty_field() {
            return Err(StoreError::EmptyField(field));
        }

        let UserPatch {
            login,
            password,
            name,
            profile_photo,
            photo_mime_type,
        } = patch;

        // Hashing is costly, so an unknown id fails before it. A row deleted
        // after this check still ends in NotFound from the UPDATE below.
        let password_hash = match password {
            Some(password) => {
                if !self.user_exists(id).await? {
                    return Err(StoreError::NotFound);
                }
                Some(hash_password(password).await?)
            }
            None => None,
        };

        let sql = format!(
            r#"
            UPDATE {} SET
                login = COALESCE(?1, login),
                password = COALESCE(?2, password),
                name = COALESCE(?3, name),
                profile_photo = CASE WHEN ?4 THEN ?5 ELSE profile_photo END,
                photo_mime_type = CASE WHEN ?6 THEN ?7 ELSE photo_mime_type END,
                updated_at = ?8
            WHERE id = ?9
            RETURNING {USER_COLUMNS}
            "#,
            tables::USERS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(login)
            .bind(password_hash)
            .bind(name)
            .bind(profile_photo.is_some())
            .bind(profile_photo.flatten())
            .bind(photo_mime_type.is_some())
            .bind(photo_mime_type.flatten())
            .bind(now_rfc3339())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;

        tracing::debug!(user_id = user.id, "Updated user");
        Ok(user)
    }

    /// Permanently remove a user.
    pub async fn delete_user(&self, id: i64) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", tables::USERS);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
