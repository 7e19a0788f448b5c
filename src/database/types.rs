//! Row types for the Symbol Store (spec §3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    pub path: String,
    pub language: String,
    pub last_modified: i64,
    pub size_bytes: i64,
    pub content_hash: String,
    pub symbol_count: i64,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolFilter {
    pub name_contains: Option<String>,
    pub language: Option<String>,
    pub kinds: Vec<crate::extractors::SymbolKind>,
    pub file_path: Option<String>,
    pub limit: Option<usize>,
}
