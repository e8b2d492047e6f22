//! SQLite database operations
//!
//! All database access goes through this module.
//! Each public method issues a single statement, except the two reads
//! behind [`Database::list_users_with_maps`] and the lookup-then-insert of
//! [`Database::find_or_create_user`].

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use super::models::*;
use crate::error::AppError;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Database connection pool wrapper.
///
/// Created once at startup and shared by every handler; call
/// [`Database::close`] during shutdown to release the pool.
pub struct Database {
    pool: Pool<Sqlite>,
}

async fn observed<T>(
    operation: &str,
    table: &str,
    query: impl Future<Output = Result<T, sqlx::Error>>,
) -> Result<T, AppError> {
    let started = Instant::now();
    let result = query.await;
    crate::metrics::observe_db_query(operation, table, started.elapsed());
    Ok(result?)
}

fn encode_json<T: serde::Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string(value).map_err(|e| AppError::Internal(e.into()))
}

impl Database {
    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        Self::connect_with_max_connections(path, DEFAULT_MAX_CONNECTIONS).await
    }

    /// Connect with an explicit pool size.
    pub async fn connect_with_max_connections(
        path: &Path,
        max_connections: u32,
    ) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        // Run migrations
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Every user with their maps attached, ordered by id.
    pub async fn list_users_with_maps(&self) -> Result<Vec<UserWithMaps>, AppError> {
        let user_rows = observed(
            "select",
            "users",
            sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY id").fetch_all(&self.pool),
        )
        .await?;
        let map_rows = observed(
            "select",
            "maps",
            sqlx::query_as::<_, MapRow>("SELECT * FROM maps ORDER BY id").fetch_all(&self.pool),
        )
        .await?;

        let mut maps_by_creator: HashMap<String, Vec<Map>> = HashMap::new();
        for row in map_rows {
            let map = Map::try_from(row)?;
            maps_by_creator
                .entry(map.creator_email.clone())
                .or_default()
                .push(map);
        }

        user_rows
            .into_iter()
            .map(|row| {
                let user = User::try_from(row)?;
                let maps = maps_by_creator.remove(&user.email).unwrap_or_default();
                Ok(UserWithMaps { user, maps })
            })
            .collect()
    }

    /// Insert a user with default keys.
    ///
    /// # Errors
    /// Fails on any constraint violation, including a duplicate email
    pub async fn create_user(&self, new_user: &NewUser) -> Result<User, AppError> {
        let row = observed(
            "insert",
            "users",
            sqlx::query_as::<_, UserRow>(
                r#"
                INSERT INTO users (email, name, password, created_at)
                VALUES (?, ?, ?, ?)
                RETURNING *
                "#,
            )
            .bind(&new_user.email)
            .bind(&new_user.name)
            .bind(&new_user.password)
            .bind(Utc::now())
            .fetch_one(&self.pool),
        )
        .await?;

        User::try_from(row)
    }

    /// Look up a user by exact email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = observed(
            "select",
            "users",
            sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ? LIMIT 1")
                .bind(email)
                .fetch_optional(&self.pool),
        )
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Return the user with `new_user.email`, creating it when absent.
    ///
    /// The lookup and the insert are separate statements; a concurrent
    /// creation of the same email makes the insert fail.
    pub async fn find_or_create_user(&self, new_user: &NewUser) -> Result<User, AppError> {
        if let Some(user) = self.find_user_by_email(&new_user.email).await? {
            return Ok(user);
        }

        let user = self.create_user(new_user).await?;
        tracing::info!(user_id = user.id, "Created user from OAuth login");
        Ok(user)
    }

    /// Replace a user's key bindings and return the stored list.
    ///
    /// # Errors
    /// `sqlx::Error::RowNotFound` when no user has `email`
    pub async fn update_user_keys(
        &self,
        email: &str,
        keys: &[String],
    ) -> Result<Vec<String>, AppError> {
        let keys_json = encode_json(&keys)?;
        let row = observed(
            "update",
            "users",
            sqlx::query_as::<_, UserRow>("UPDATE users SET keys = ? WHERE email = ? RETURNING *")
                .bind(keys_json)
                .bind(email)
                .fetch_one(&self.pool),
        )
        .await?;

        Ok(User::try_from(row)?.keys)
    }

    // =========================================================================
    // Maps
    // =========================================================================

    /// All maps, or only those created by `creator_email`.
    pub async fn list_maps(&self, creator_email: Option<&str>) -> Result<Vec<Map>, AppError> {
        let rows = match creator_email {
            Some(email) => {
                observed(
                    "select",
                    "maps",
                    sqlx::query_as::<_, MapRow>(
                        "SELECT * FROM maps WHERE creator_email = ? ORDER BY id",
                    )
                    .bind(email)
                    .fetch_all(&self.pool),
                )
                .await?
            }
            None => {
                observed(
                    "select",
                    "maps",
                    sqlx::query_as::<_, MapRow>("SELECT * FROM maps ORDER BY id")
                        .fetch_all(&self.pool),
                )
                .await?
            }
        };

        rows.into_iter().map(Map::try_from).collect()
    }

    /// Insert a map owned by an existing user.
    ///
    /// # Errors
    /// Fails with a foreign key violation when the creator does not exist
    pub async fn create_map(&self, new_map: &NewMap) -> Result<Map, AppError> {
        let config_json = encode_json(&new_map.config)?;
        let row = observed(
            "insert",
            "maps",
            sqlx::query_as::<_, MapRow>(
                r#"
                INSERT INTO maps (name, created_at, creator_email, config)
                VALUES (?, ?, ?, ?)
                RETURNING *
                "#,
            )
            .bind(&new_map.name)
            .bind(Utc::now())
            .bind(&new_map.creator_email)
            .bind(config_json)
            .fetch_one(&self.pool),
        )
        .await?;

        Map::try_from(row)
    }

    /// Number of maps, optionally restricted to one creator.
    pub async fn count_maps(&self, creator_email: Option<&str>) -> Result<i64, AppError> {
        match creator_email {
            Some(email) => {
                observed(
                    "count",
                    "maps",
                    sqlx::query_scalar::<_, i64>(
                        "SELECT COUNT(*) FROM maps WHERE creator_email = ?",
                    )
                    .bind(email)
                    .fetch_one(&self.pool),
                )
                .await
            }
            None => {
                observed(
                    "count",
                    "maps",
                    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM maps")
                        .fetch_one(&self.pool),
                )
                .await
            }
        }
    }

    pub async fn get_map(&self, id: i64) -> Result<Option<Map>, AppError> {
        let row = observed(
            "select",
            "maps",
            sqlx::query_as::<_, MapRow>("SELECT * FROM maps WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await?;

        row.map(Map::try_from).transpose()
    }

    /// Add `increment` to a map's rating in one statement.
    ///
    /// # Returns
    /// The updated map, or `None` if no map has `id`
    pub async fn increment_map_rating(
        &self,
        id: i64,
        increment: i64,
    ) -> Result<Option<Map>, AppError> {
        let row = observed(
            "update",
            "maps",
            sqlx::query_as::<_, MapRow>(
                "UPDATE maps SET rating = rating + ? WHERE id = ? RETURNING *",
            )
            .bind(increment)
            .bind(id)
            .fetch_optional(&self.pool),
        )
        .await?;

        row.map(Map::try_from).transpose()
    }
}
