//! Symbol Store (spec §4.3): durable storage, atomic per-file
//! replacement, and the query surface the search engine streams from.

pub mod files;
pub mod migrations;
pub mod relationships;
pub mod schema;
pub mod symbols;
pub mod types;
pub mod vector_ids;

pub use types::{FileRecord, SymbolFilter};

use rusqlite::Connection;

use crate::error::Result;

/// Embedded relational store. A single `rusqlite::Connection` is
/// correct here because it is only ever touched from inside
/// `spawn_blocking` at the coordinator boundary (see `src/engine.rs`)
/// — the same reasoning the teacher codebase documents for choosing a
/// blocking mutex over an async one around this type.
pub struct SymbolDatabase {
    pub(crate) conn: Connection,
}

impl SymbolDatabase {
    pub fn open(path: &std::path::Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| crate::error::MillerError::IOError {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let mut db = Self { conn };
        db.initialize_schema()?;
        db.run_migrations()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let mut db = Self { conn };
        db.initialize_schema()?;
        db.run_migrations()?;
        Ok(db)
    }

    pub fn transaction(&mut self) -> Result<rusqlite::Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_in_memory_and_creates_schema() {
        let db = SymbolDatabase::open_in_memory().unwrap();
        let count: i64 = db
            .conn
            .query_row("SELECT count(*) FROM symbols", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
