// Ripple - a social feed client core
// Copyright (C) 2026 Ripple Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Session and settings persistence
//!
//! SQLite-backed replacement for the original path-scoped cookie: one
//! persisted session (the bearer token plus the user it belongs to)
//! and a small settings table. Cleared on logout and on any 401.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// The persisted session record
#[derive(Debug, Clone)]
pub struct StoredSession {
    /// Bearer token issued at login
    pub token: String,
    /// Id of the session's user
    pub user_id: String,
    /// Username of the session's user
    pub username: String,
    /// When the session was saved
    pub saved_at: DateTime<Utc>,
}

/// Store for the persisted session and settings
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    /// Open the store at the default data location
    pub async fn open() -> Result<Self> {
        let db_path = default_db_path();

        // Ensure the directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
        info!("Opening session store at {}", db_path.display());
        Self::open_url(&db_url).await
    }

    /// Open an in-memory store (used by tests)
    pub async fn open_in_memory() -> Result<Self> {
        Self::open_url("sqlite::memory:").await
    }

    async fn open_url(db_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;

        Ok(store)
    }

    /// Initialize the database schema
    async fn init_schema(&self) -> Result<()> {
        debug!("Initializing session store schema");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                token TEXT NOT NULL,
                user_id TEXT NOT NULL,
                username TEXT NOT NULL,
                saved_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ===== SESSION =====

    /// Save the session, replacing any previous one
    pub async fn save_session(&self, token: &str, user_id: &str, username: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO session (id, token, user_id, username, saved_at)
            VALUES (1, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                token = excluded.token,
                user_id = excluded.user_id,
                username = excluded.username,
                saved_at = excluded.saved_at
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(username)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        info!("Saved session for {}", username);
        Ok(())
    }

    /// Load the persisted session, if one exists
    pub async fn load_session(&self) -> Result<Option<StoredSession>> {
        let row: Option<(String, String, String, String)> = sqlx::query_as(
            "SELECT token, user_id, username, saved_at FROM session WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(token, user_id, username, saved_at)| StoredSession {
            token,
            user_id,
            username,
            saved_at: saved_at
                .parse::<DateTime<Utc>>()
                .unwrap_or_else(|_| Utc::now()),
        }))
    }

    /// Clear the persisted session
    pub async fn clear_session(&self) -> Result<()> {
        sqlx::query("DELETE FROM session WHERE id = 1")
            .execute(&self.pool)
            .await?;

        info!("Cleared persisted session");
        Ok(())
    }

    // ===== SETTINGS =====

    /// Get a setting value
    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM settings WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(v,)| v))
    }

    /// Set a setting value
    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        debug!("Set setting {} = {}", key, value);
        Ok(())
    }

    /// Get all settings as a map
    pub async fn get_all_settings(&self) -> Result<HashMap<String, String>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM settings")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().collect())
    }
}

/// Default database file path
fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Ripple")
        .join("session.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn session_round_trip() {
        let store = SessionStore::open_in_memory().await.unwrap();

        assert!(store.load_session().await.unwrap().is_none());

        store.save_session("tok-1", "u1", "mira").await.unwrap();
        let session = store.load_session().await.unwrap().unwrap();
        assert_eq!(session.token, "tok-1");
        assert_eq!(session.username, "mira");

        // Re-saving replaces the single row.
        store.save_session("tok-2", "u1", "mira").await.unwrap();
        let session = store.load_session().await.unwrap().unwrap();
        assert_eq!(session.token, "tok-2");

        store.clear_session().await.unwrap();
        assert!(store.load_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn settings_round_trip() {
        let store = SessionStore::open_in_memory().await.unwrap();

        assert!(store.get_setting("theme").await.unwrap().is_none());
        store.set_setting("theme", "dark").await.unwrap();
        store.set_setting("theme", "light").await.unwrap();
        assert_eq!(
            store.get_setting("theme").await.unwrap().as_deref(),
            Some("light")
        );

        let all = store.get_all_settings().await.unwrap();
        assert_eq!(all.len(), 1);
    }
}
