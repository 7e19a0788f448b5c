//! Relationship-table operations (spec §4.3, §4.2 point 3).

use rusqlite::params;

use super::SymbolDatabase;
use crate::error::Result;
use crate::extractors::{Relationship, RelationshipKind};

impl SymbolDatabase {
    pub fn replace_relationships_for_file(
        &mut self,
        file_path: &str,
        relationships: &[Relationship],
    ) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM relationships WHERE file_path = ?1",
            [file_path],
        )?;
        for rel in relationships {
            tx.execute(
                "INSERT INTO relationships (
                    id, from_symbol_id, to_symbol_id, kind, file_path,
                    start_line, start_column, end_line, end_column
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    rel.id,
                    rel.from_symbol_id,
                    rel.to_symbol_id,
                    rel.kind.as_str(),
                    rel.file_path,
                    rel.start_line,
                    rel.start_column,
                    rel.end_line,
                    rel.end_column,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn relationships_from(&self, symbol_id: &str) -> Result<Vec<Relationship>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, from_symbol_id, to_symbol_id, kind, file_path,
                    start_line, start_column, end_line, end_column
             FROM relationships WHERE from_symbol_id = ?1",
        )?;
        let rows = stmt.query_map([symbol_id], Self::map_relationship_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn relationships_to(&self, symbol_id: &str) -> Result<Vec<Relationship>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, from_symbol_id, to_symbol_id, kind, file_path,
                    start_line, start_column, end_line, end_column
             FROM relationships WHERE to_symbol_id = ?1",
        )?;
        let rows = stmt.query_map([symbol_id], Self::map_relationship_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn relationship_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT count(*) FROM relationships", [], |r| r.get(0))
            .map_err(Into::into)
    }

    fn map_relationship_row(row: &rusqlite::Row) -> rusqlite::Result<Relationship> {
        let kind_str: String = row.get(3)?;
        Ok(Relationship {
            id: row.get(0)?,
            from_symbol_id: row.get(1)?,
            to_symbol_id: row.get(2)?,
            kind: RelationshipKind::from_str_opt(&kind_str).unwrap_or(RelationshipKind::References),
            file_path: row.get(4)?,
            start_line: row.get(5)?,
            start_column: row.get(6)?,
            end_line: row.get(7)?,
            end_column: row.get(8)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_is_scoped_to_file() {
        let mut db = SymbolDatabase::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO files (path, language, last_modified, size_bytes, content_hash, symbol_count)
                 VALUES ('a.rs', 'rust', 0, 0, 'h', 0)",
                [],
            )
            .unwrap();
        db.conn
            .execute(
                "INSERT INTO symbols (id, name, kind, language, file_path, start_line,
                    start_column, end_line, end_column, start_byte, end_byte, visibility, metadata)
                 VALUES ('s1','foo','function','rust','a.rs',1,0,1,3,0,3,'public','{}'),
                        ('s2','bar','function','rust','a.rs',2,0,2,3,4,7,'public','{}')",
                [],
            )
            .unwrap();

        let rel = Relationship::new("s1", "s2", RelationshipKind::Calls, "a.rs", 1, 0, 1, 3);
        db.replace_relationships_for_file("a.rs", &[rel]).unwrap();
        assert_eq!(db.relationships_from("s1").unwrap().len(), 1);
        assert_eq!(db.relationships_to("s2").unwrap().len(), 1);

        db.replace_relationships_for_file("a.rs", &[]).unwrap();
        assert!(db.relationships_from("s1").unwrap().is_empty());
    }
}
