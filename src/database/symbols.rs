//! Symbol-table operations (spec §4.3): per-file atomic replacement
//! and the filtered query surface the search engine and hybrid scorer
//! read from.

use rusqlite::{params, OptionalExtension};

use super::{SymbolDatabase, SymbolFilter};
use crate::error::Result;
use crate::extractors::{Symbol, SymbolKind, Visibility};

impl SymbolDatabase {
    /// Replace every symbol belonging to `file_path` with `symbols` in
    /// one transaction, so a reader never observes a half-updated file
    /// (spec §4.3, "atomic per-file replacement").
    pub fn replace_symbols_for_file(&mut self, file_path: &str, symbols: &[Symbol]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM symbols WHERE file_path = ?1", [file_path])?;
        for symbol in symbols {
            tx.execute(
                "INSERT INTO symbols (
                    id, name, kind, language, file_path,
                    start_line, start_column, end_line, end_column,
                    start_byte, end_byte, signature, doc_comment,
                    visibility, parent_id, resolved_type, is_inferred_type, metadata
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
                params![
                    symbol.id,
                    symbol.name,
                    symbol.kind.as_str(),
                    symbol.language,
                    symbol.file_path,
                    symbol.start_line,
                    symbol.start_column,
                    symbol.end_line,
                    symbol.end_column,
                    symbol.start_byte,
                    symbol.end_byte,
                    symbol.signature,
                    symbol.doc_comment,
                    symbol.visibility.as_str(),
                    symbol.parent_id,
                    symbol.resolved_type,
                    symbol.is_inferred_type,
                    serde_json::to_string(&symbol.metadata).unwrap_or_else(|_| "{}".to_string()),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_symbol(&self, id: &str) -> Result<Option<Symbol>> {
        self.conn
            .query_row(
                "SELECT id, name, kind, language, file_path, start_line, start_column,
                        end_line, end_column, start_byte, end_byte, signature,
                        doc_comment, visibility, parent_id, resolved_type, is_inferred_type, metadata
                 FROM symbols WHERE id = ?1",
                [id],
                Self::map_symbol_row,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn delete_symbols_for_file(&self, file_path: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM symbols WHERE file_path = ?1", [file_path])?;
        Ok(())
    }

    /// Full snapshot of the symbols table, read inside one transaction
    /// so the search-engine rebuild never observes a half-written
    /// write-wave (spec §4.4, §5).
    pub fn iter_all_symbols(&self) -> Result<Vec<Symbol>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, kind, language, file_path, start_line, start_column,
                    end_line, end_column, start_byte, end_byte, signature,
                    doc_comment, visibility, parent_id, resolved_type, is_inferred_type, metadata
             FROM symbols",
        )?;
        let rows = stmt.query_map([], Self::map_symbol_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn symbols_for_file(&self, file_path: &str) -> Result<Vec<Symbol>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, kind, language, file_path, start_line, start_column,
                    end_line, end_column, start_byte, end_byte, signature,
                    doc_comment, visibility, parent_id, resolved_type, is_inferred_type, metadata
             FROM symbols WHERE file_path = ?1 ORDER BY start_byte",
        )?;
        let rows = stmt.query_map([file_path], Self::map_symbol_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn find_symbols(&self, filter: &SymbolFilter) -> Result<Vec<Symbol>> {
        let mut sql = String::from(
            "SELECT id, name, kind, language, file_path, start_line, start_column,
                    end_line, end_column, start_byte, end_byte, signature,
                    doc_comment, visibility, parent_id, resolved_type, is_inferred_type, metadata
             FROM symbols WHERE 1 = 1",
        );
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(name) = &filter.name_contains {
            sql.push_str(" AND name LIKE ?");
            args.push(Box::new(format!("%{name}%")));
        }
        if let Some(language) = &filter.language {
            sql.push_str(" AND language = ?");
            args.push(Box::new(language.clone()));
        }
        if let Some(file_path) = &filter.file_path {
            sql.push_str(" AND file_path = ?");
            args.push(Box::new(file_path.clone()));
        }
        if !filter.kinds.is_empty() {
            let placeholders = vec!["?"; filter.kinds.len()].join(", ");
            sql.push_str(&format!(" AND kind IN ({placeholders})"));
            for kind in &filter.kinds {
                args.push(Box::new(kind.as_str().to_string()));
            }
        }
        sql.push_str(" ORDER BY name");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let params: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
        let rows = stmt.query_map(params.as_slice(), Self::map_symbol_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn symbol_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT count(*) FROM symbols", [], |r| r.get(0))
            .map_err(Into::into)
    }

    fn map_symbol_row(row: &rusqlite::Row) -> rusqlite::Result<Symbol> {
        let kind_str: String = row.get(2)?;
        let visibility_str: String = row.get(13)?;
        let metadata_str: String = row.get(17)?;
        Ok(Symbol {
            id: row.get(0)?,
            name: row.get(1)?,
            kind: SymbolKind::from_str_opt(&kind_str).unwrap_or(SymbolKind::Variable),
            language: row.get(3)?,
            file_path: row.get(4)?,
            start_line: row.get(5)?,
            start_column: row.get(6)?,
            end_line: row.get(7)?,
            end_column: row.get(8)?,
            start_byte: row.get(9)?,
            end_byte: row.get(10)?,
            signature: row.get(11)?,
            doc_comment: row.get(12)?,
            visibility: Visibility::from_str_opt(&visibility_str).unwrap_or(Visibility::Public),
            parent_id: row.get(14)?,
            resolved_type: row.get(15)?,
            is_inferred_type: row.get(16)?,
            metadata: serde_json::from_str(&metadata_str).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str, file: &str, start_byte: u32) -> Symbol {
        Symbol::new(
            name,
            name,
            SymbolKind::Function,
            "rust",
            file,
            1,
            0,
            1,
            name.len() as u32,
            start_byte,
            start_byte + name.len() as u32,
        )
    }

    #[test]
    fn replace_is_atomic_and_idempotent() {
        let mut db = SymbolDatabase::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO files (path, language, last_modified, size_bytes, content_hash, symbol_count)
                 VALUES ('a.rs', 'rust', 0, 0, 'h', 0)",
                [],
            )
            .unwrap();
        let first_pass = vec![sym("foo", "a.rs", 0), sym("bar", "a.rs", 10)];
        db.replace_symbols_for_file("a.rs", &first_pass).unwrap();
        assert_eq!(db.symbols_for_file("a.rs").unwrap().len(), 2);

        let second_pass = vec![sym("foo", "a.rs", 0)];
        db.replace_symbols_for_file("a.rs", &second_pass).unwrap();
        assert_eq!(db.symbols_for_file("a.rs").unwrap().len(), 1);
    }

    #[test]
    fn find_symbols_filters_by_name_and_kind() {
        let mut db = SymbolDatabase::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO files (path, language, last_modified, size_bytes, content_hash, symbol_count)
                 VALUES ('a.rs', 'rust', 0, 0, 'h', 0)",
                [],
            )
            .unwrap();
        db.replace_symbols_for_file("a.rs", &[sym("handle_request", "a.rs", 0)])
            .unwrap();

        let filter = SymbolFilter {
            name_contains: Some("handle".to_string()),
            kinds: vec![SymbolKind::Function],
            ..Default::default()
        };
        assert_eq!(db.find_symbols(&filter).unwrap().len(), 1);

        let filter = SymbolFilter {
            name_contains: Some("nope".to_string()),
            ..Default::default()
        };
        assert!(db.find_symbols(&filter).unwrap().is_empty());
    }
}
