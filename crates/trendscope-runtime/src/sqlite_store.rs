//! SQLite-backed implementation of the TrendStore trait.
//!
//! Networks are stored as JSON text keyed by `(scope, trend_id)`, so a
//! single database file can hold every exported trend of a run.

#![cfg(feature = "sqlite")]

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use trendscope_core::error::{Result, TrendError};
use trendscope_core::store::{TrendScope, TrendStore};
use trendscope_core::types::Network;

fn sql_error(e: rusqlite::Error) -> TrendError {
    TrendError::storage(format!("SQLite error: {e}"))
}

/// SQLite-backed trend store.
///
/// Supports both in-memory and file-backed databases.
pub struct SqliteTrendStore {
    conn: Mutex<Connection>,
}

impl SqliteTrendStore {
    /// Create a new in-memory store.
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(sql_error)?;
        Self::init_with_connection(conn)
    }

    /// Create or open a file-backed store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path).map_err(sql_error)?;
        Self::init_with_connection(conn)
    }

    fn init_with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;

            CREATE TABLE IF NOT EXISTS networks (
                scope TEXT NOT NULL,
                trend_id INTEGER NOT NULL,
                trend_score REAL NOT NULL,
                network TEXT NOT NULL,
                PRIMARY KEY (scope, trend_id)
            );

            CREATE INDEX IF NOT EXISTS idx_networks_trend ON networks(trend_id);
            "#,
        )
        .map_err(sql_error)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| TrendError::storage("SQLite connection lock poisoned"))
    }

    /// Number of stored networks.
    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM networks", [], |row| row.get(0))
            .map_err(sql_error)?;
        Ok(count as usize)
    }
}

impl TrendStore for SqliteTrendStore {
    fn save_network(&self, scope: TrendScope, trend_id: usize, network: &Network) -> Result<()> {
        let json = serde_json::to_string(network)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO networks (scope, trend_id, trend_score, network)
             VALUES (?1, ?2, ?3, ?4)",
            params![scope.to_string(), trend_id as i64, network.trend_score, json],
        )
        .map_err(sql_error)?;
        Ok(())
    }

    fn load_network(&self, scope: TrendScope, trend_id: usize) -> Result<Option<Network>> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT network FROM networks WHERE scope = ?1 AND trend_id = ?2",
                params![scope.to_string(), trend_id as i64],
                |row| row.get(0),
            )
            .optional()
            .map_err(sql_error)?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM networks", []).map_err(sql_error)?;
        Ok(())
    }
}
