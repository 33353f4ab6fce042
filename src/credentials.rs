use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

/// Persisted API keys, one row per provider, stored in the app data dir.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    db_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSummary {
    pub provider: String,
    pub masked_key: String,
}

impl CredentialStore {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// Stores the key for a provider; an empty key removes the row.
    pub fn save(&self, provider: &str, api_key: &str) -> rusqlite::Result<()> {
        let provider = provider.trim().to_ascii_lowercase();
        let api_key = api_key.trim();

        self.with_connection(|conn| {
            if api_key.is_empty() {
                conn.execute(
                    "DELETE FROM api_credentials WHERE provider = ?1",
                    params![provider],
                )?;
            } else {
                conn.execute(
                    "INSERT OR REPLACE INTO api_credentials (provider, api_key) VALUES (?1, ?2)",
                    params![provider, api_key],
                )?;
            }
            Ok(())
        })
    }

    pub fn load(&self, provider: &str) -> rusqlite::Result<Option<String>> {
        let provider = provider.trim().to_ascii_lowercase();

        self.with_connection(|conn| {
            conn.query_row(
                "SELECT api_key FROM api_credentials WHERE provider = ?1",
                params![provider],
                |row| row.get(0),
            )
            .optional()
        })
    }

    /// Masked listing for settings display; raw keys never leave the store
    /// except through `load`.
    pub fn list_masked(&self) -> rusqlite::Result<Vec<CredentialSummary>> {
        self.with_connection(|conn| {
            let mut stmt =
                conn.prepare("SELECT provider, api_key FROM api_credentials ORDER BY provider")?;
            let rows = stmt.query_map([], |row| {
                let provider: String = row.get(0)?;
                let api_key: String = row.get(1)?;
                Ok(CredentialSummary {
                    provider,
                    masked_key: mask(&api_key),
                })
            })?;

            let mut summaries = Vec::new();
            for entry in rows {
                summaries.push(entry?);
            }
            Ok(summaries)
        })
    }

    fn with_connection<T, F>(&self, action: F) -> rusqlite::Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS api_credentials (
                provider TEXT NOT NULL PRIMARY KEY,
                api_key TEXT NOT NULL
            )",
            [],
        )?;
        action(&conn)
    }
}

/// Replaces all but the first two characters with a fixed mask.
pub fn mask(api_key: &str) -> String {
    if api_key.is_empty() {
        return String::new();
    }
    let prefix: String = api_key.chars().take(2).collect();
    format!("{}****", prefix)
}

pub fn default_db_path(root: &Path) -> PathBuf {
    root.join("credentials.db")
}
