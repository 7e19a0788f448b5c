//! File-table operations (spec §4.3): upsert on re-index, delta check
//! via `content_hash`, and the cascade delete that removes a file's
//! symbols/relationships/embeddings along with it.

use super::{FileRecord, SymbolDatabase};
use crate::error::Result;

impl SymbolDatabase {
    pub fn upsert_file(&self, record: &FileRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO files (path, language, last_modified, size_bytes, content_hash, symbol_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(path) DO UPDATE SET
                language = excluded.language,
                last_modified = excluded.last_modified,
                size_bytes = excluded.size_bytes,
                content_hash = excluded.content_hash,
                symbol_count = excluded.symbol_count",
            rusqlite::params![
                record.path,
                record.language,
                record.last_modified,
                record.size_bytes,
                record.content_hash,
                record.symbol_count,
            ],
        )?;
        Ok(())
    }

    pub fn get_file(&self, path: &str) -> Result<Option<FileRecord>> {
        let result = self.conn.query_row(
            "SELECT path, language, last_modified, size_bytes, content_hash, symbol_count
             FROM files WHERE path = ?1",
            [path],
            Self::map_file_row,
        );
        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns `true` when `path` is unknown or its stored hash differs
    /// from `content_hash` — the delta check that lets re-indexing skip
    /// unchanged files (spec §4.9).
    pub fn file_needs_reindex(&self, path: &str, content_hash: &str) -> Result<bool> {
        match self.get_file(path)? {
            Some(existing) => Ok(existing.content_hash != content_hash),
            None => Ok(true),
        }
    }

    /// Cascades to `symbols`, `relationships`, and `embeddings` via
    /// their `ON DELETE CASCADE` foreign keys.
    pub fn delete_file(&self, path: &str) -> Result<()> {
        self.conn.execute("DELETE FROM files WHERE path = ?1", [path])?;
        Ok(())
    }

    pub fn list_files(&self) -> Result<Vec<FileRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT path, language, last_modified, size_bytes, content_hash, symbol_count
             FROM files ORDER BY path",
        )?;
        let rows = stmt.query_map([], Self::map_file_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn file_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT count(*) FROM files", [], |r| r.get(0))
            .map_err(Into::into)
    }

    pub fn distinct_languages(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT language FROM files ORDER BY language")?;
        let rows = stmt.query_map([], |r| r.get(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn map_file_row(row: &rusqlite::Row) -> rusqlite::Result<FileRecord> {
        Ok(FileRecord {
            path: row.get(0)?,
            language: row.get(1)?,
            last_modified: row.get(2)?,
            size_bytes: row.get(3)?,
            content_hash: row.get(4)?,
            symbol_count: row.get(5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, hash: &str) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            language: "rust".to_string(),
            last_modified: 0,
            size_bytes: 10,
            content_hash: hash.to_string(),
            symbol_count: 0,
        }
    }

    #[test]
    fn upsert_then_get_round_trips() {
        let db = SymbolDatabase::open_in_memory().unwrap();
        db.upsert_file(&record("a.rs", "h1")).unwrap();
        let fetched = db.get_file("a.rs").unwrap().unwrap();
        assert_eq!(fetched.content_hash, "h1");
    }

    #[test]
    fn reindex_needed_only_when_hash_differs() {
        let db = SymbolDatabase::open_in_memory().unwrap();
        assert!(db.file_needs_reindex("a.rs", "h1").unwrap());
        db.upsert_file(&record("a.rs", "h1")).unwrap();
        assert!(!db.file_needs_reindex("a.rs", "h1").unwrap());
        assert!(db.file_needs_reindex("a.rs", "h2").unwrap());
    }
}
