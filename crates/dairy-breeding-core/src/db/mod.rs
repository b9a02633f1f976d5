//! Database layer for dairy breeding records.

mod cows;
mod cycles;
mod schema;
mod settings;
mod store;

pub use schema::*;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

impl DbError {
    /// Turn SQLite constraint failures into [`DbError::Constraint`].
    pub(crate) fn from_write(err: rusqlite::Error, context: &str) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::ConstraintViolation) => {
                DbError::Constraint(format!("{context}: {err}"))
            }
            _ => DbError::Sqlite(err),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        tracing::debug!("database schema initialized");
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}
