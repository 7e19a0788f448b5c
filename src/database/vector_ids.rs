//! Symbol-id ↔ dense-integer mapping (spec §3, §4.6). HNSW needs
//! contiguous `usize` ids; the store hands out sequential ids via
//! `vector_ids.dense_id AUTOINCREMENT` and never derives one by
//! hashing `original_id` (spec §9 — that was the bug in the system
//! this replaces).

use rusqlite::OptionalExtension;

use super::SymbolDatabase;
use crate::error::Result;

impl SymbolDatabase {
    /// Return the existing dense id for `original_id`, allocating the
    /// next sequential one if this is the first time it's been seen.
    /// `INSERT OR IGNORE` followed by a `SELECT` keeps re-insertion
    /// idempotent under the `UNIQUE(original_id)` constraint without a
    /// read-then-write race (spec §4.6).
    pub fn allocate_or_get_vector_id(&self, original_id: &str) -> Result<u64> {
        self.conn.execute(
            "INSERT OR IGNORE INTO vector_ids (original_id) VALUES (?1)",
            [original_id],
        )?;
        self.lookup_dense_id(original_id)?
            .ok_or_else(|| crate::error::MillerError::VectorStoreError(format!(
                "failed to allocate vector id for {original_id}"
            )))
    }

    pub fn lookup_dense_id(&self, original_id: &str) -> Result<Option<u64>> {
        self.conn
            .query_row(
                "SELECT dense_id FROM vector_ids WHERE original_id = ?1",
                [original_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map(|opt| opt.map(|v| v as u64))
            .map_err(Into::into)
    }

    pub fn original_id_for(&self, dense_id: u64) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT original_id FROM vector_ids WHERE dense_id = ?1",
                [dense_id as i64],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn clear_vector_ids(&self) -> Result<()> {
        self.conn.execute("DELETE FROM vector_ids", [])?;
        self.conn.execute("DELETE FROM embeddings", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_ids_are_sequential_and_stable() {
        let db = SymbolDatabase::open_in_memory().unwrap();
        let first = db.allocate_or_get_vector_id("sym-a").unwrap();
        let second = db.allocate_or_get_vector_id("sym-b").unwrap();
        assert_eq!(second, first + 1);
        assert_eq!(db.allocate_or_get_vector_id("sym-a").unwrap(), first);
        assert_eq!(db.original_id_for(first).unwrap().as_deref(), Some("sym-a"));
    }
}
