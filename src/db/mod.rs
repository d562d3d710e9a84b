//! SQLite database for accounts and role profiles
//!
//! ## Tables
//!
//! - `users` - One row per account (role, unique email, password hash)
//! - `mothers` - Mother profile, keyed by `user_id`
//! - `fathers` - Father/family profile, keyed by `user_id`
//! - `health_workers` - Anganwadi worker profile, keyed by `user_id`

pub mod accounts;
pub mod mothers;
pub mod schema;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::types::JananiError;

/// SQLite database handle shared by all request handlers
pub struct CareDb {
    conn: Mutex<Connection>,
}

impl CareDb {
    /// Open or create the database file
    pub fn open(db_path: &Path) -> Result<Self, JananiError> {
        info!("Opening SQLite database at {:?}", db_path);

        let conn = Connection::open(db_path)
            .map_err(|e| JananiError::Database(format!("Failed to open SQLite: {}", e)))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| JananiError::Database(format!("Failed to set PRAGMA: {}", e)))?;

        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, JananiError> {
        debug!("Opening in-memory SQLite database");

        let conn = Connection::open_in_memory().map_err(|e| {
            JananiError::Database(format!("Failed to open in-memory SQLite: {}", e))
        })?;

        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, JananiError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| JananiError::Database(format!("Failed to set PRAGMA: {}", e)))?;

        schema::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run a read against the connection
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, JananiError>
    where
        F: FnOnce(&Connection) -> Result<T, JananiError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| JananiError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Execute a write operation with exclusive access (needed for transactions)
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, JananiError>
    where
        F: FnOnce(&mut Connection) -> Result<T, JananiError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| JananiError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&mut conn)
    }

    /// Row counts per table
    pub fn stats(&self) -> Result<DbStats, JananiError> {
        self.with_conn(|conn| {
            let count = |table: &str| -> Result<u64, JananiError> {
                let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })?;
                Ok(n as u64)
            };

            Ok(DbStats {
                users: count("users")?,
                mothers: count("mothers")?,
                fathers: count("fathers")?,
                health_workers: count("health_workers")?,
            })
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub users: u64,
    pub mothers: u64,
    pub fathers: u64,
    pub health_workers: u64,
}

pub use accounts::{NewFather, NewHealthWorker, NewMother, ProfileInput, UserRow};
pub use mothers::MotherRow;
