//! Schema creation. Foreign-key constraints between relationships and
//! symbols, the unique `(path)` on files, and the unique
//! `(original_id)` on the vector-id mapping table are enforced here by
//! the store itself, not merely by callers (spec §4.3).
//!
//! The canonical column for symbol categorization is `kind`, never
//! `type` (spec §9) — every query in this module and its siblings must
//! reference `kind`.

use super::SymbolDatabase;
use crate::error::Result;
use tracing::debug;

impl SymbolDatabase {
    pub(super) fn initialize_schema(&mut self) -> Result<()> {
        debug!("creating database schema");
        self.create_files_table()?;
        self.create_symbols_table()?;
        self.create_relationships_table()?;
        self.create_vector_ids_table()?;
        self.create_embeddings_table()?;
        self.create_symbols_fts_table()?;
        debug!("database schema created");
        Ok(())
    }

    fn create_files_table(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS files (
                path TEXT PRIMARY KEY,
                language TEXT NOT NULL,
                last_modified INTEGER NOT NULL,
                size_bytes INTEGER NOT NULL,
                content_hash TEXT NOT NULL,
                symbol_count INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_files_language ON files(language)",
            [],
        )?;
        Ok(())
    }

    fn create_symbols_table(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS symbols (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                language TEXT NOT NULL,
                file_path TEXT NOT NULL REFERENCES files(path) ON DELETE CASCADE,
                start_line INTEGER NOT NULL,
                start_column INTEGER NOT NULL,
                end_line INTEGER NOT NULL,
                end_column INTEGER NOT NULL,
                start_byte INTEGER NOT NULL,
                end_byte INTEGER NOT NULL,
                signature TEXT,
                doc_comment TEXT,
                visibility TEXT NOT NULL,
                parent_id TEXT REFERENCES symbols(id) ON DELETE SET NULL,
                resolved_type TEXT,
                is_inferred_type INTEGER,
                metadata TEXT NOT NULL DEFAULT '{}'
            )",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_symbols_kind ON symbols(kind)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_symbols_language ON symbols(language)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_symbols_file ON symbols(file_path)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_symbols_parent ON symbols(parent_id)",
            [],
        )?;
        self.conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_symbols_identity
             ON symbols(file_path, start_byte, end_byte, kind, name)",
            [],
        )?;
        Ok(())
    }

    fn create_relationships_table(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS relationships (
                id TEXT PRIMARY KEY,
                from_symbol_id TEXT NOT NULL REFERENCES symbols(id) ON DELETE CASCADE,
                to_symbol_id TEXT NOT NULL REFERENCES symbols(id) ON DELETE CASCADE,
                kind TEXT NOT NULL,
                file_path TEXT NOT NULL,
                start_line INTEGER NOT NULL,
                start_column INTEGER NOT NULL,
                end_line INTEGER NOT NULL,
                end_column INTEGER NOT NULL
            )",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_rel_from ON relationships(from_symbol_id)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_rel_to ON relationships(to_symbol_id)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_rel_file ON relationships(file_path)",
            [],
        )?;
        Ok(())
    }

    /// Symbol-id mapping (spec §3, §4.6): opaque `original_id` →
    /// sequential `dense_id`. `dense_id` is the store's own
    /// `AUTOINCREMENT` rowid surrogate, never a hash of `original_id`
    /// (spec §9 — "never derive the slot by hashing").
    fn create_vector_ids_table(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS vector_ids (
                dense_id INTEGER PRIMARY KEY AUTOINCREMENT,
                original_id TEXT NOT NULL UNIQUE
            )",
            [],
        )?;
        Ok(())
    }

    fn create_embeddings_table(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS embeddings (
                symbol_id TEXT PRIMARY KEY REFERENCES symbols(id) ON DELETE CASCADE,
                dense_id INTEGER NOT NULL REFERENCES vector_ids(dense_id),
                dimensions INTEGER NOT NULL,
                vector_data BLOB NOT NULL,
                model_name TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_embeddings_dense_id ON embeddings(dense_id)",
            [],
        )?;
        Ok(())
    }

    /// FTS5 mirror of `symbols`, used by the exact-search regex
    /// fallback and by the store-side substring query surface — the
    /// in-memory engine in `src/search/` remains the primary ranked
    /// index (spec §4.4).
    fn create_symbols_fts_table(&self) -> Result<()> {
        self.conn.execute(
            r#"CREATE VIRTUAL TABLE IF NOT EXISTS symbols_fts USING fts5(
                name, signature, doc_comment,
                tokenize = "unicode61 separators '_::->.'",
                content='symbols',
                content_rowid='rowid'
            )"#,
            [],
        )?;
        self.conn.execute(
            "CREATE TRIGGER IF NOT EXISTS symbols_ai AFTER INSERT ON symbols BEGIN
                INSERT INTO symbols_fts(rowid, name, signature, doc_comment)
                VALUES (new.rowid, new.name, new.signature, new.doc_comment);
             END",
            [],
        )?;
        self.conn.execute(
            "CREATE TRIGGER IF NOT EXISTS symbols_ad AFTER DELETE ON symbols BEGIN
                DELETE FROM symbols_fts WHERE rowid = old.rowid;
             END",
            [],
        )?;
        self.conn.execute(
            "CREATE TRIGGER IF NOT EXISTS symbols_au AFTER UPDATE ON symbols BEGIN
                UPDATE symbols_fts SET name = new.name, signature = new.signature,
                    doc_comment = new.doc_comment WHERE rowid = old.rowid;
             END",
            [],
        )?;
        Ok(())
    }
}
