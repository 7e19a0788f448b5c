//! Shared types for the extractor framework.
//!
//! Every language extractor produces records in this language-agnostic
//! model. Shared helpers are exposed as free functions / a
//! `BaseExtractor` used by composition rather than a deep inheritance
//! hierarchy, so a new extractor pulls in only the helpers it needs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Interface,
    Enum,
    EnumMember,
    Constructor,
    Variable,
    Constant,
    Property,
    Field,
    TypeAlias,
    Module,
    Parameter,
    Namespace,
}

impl SymbolKind {
    /// Tie-break priority used by the search engine's ranking rule
    /// (spec §4.4): lower value sorts first.
    pub fn rank_priority(&self) -> u8 {
        match self {
            SymbolKind::Class => 0,
            SymbolKind::Interface => 1,
            SymbolKind::Function => 2,
            SymbolKind::Method => 3,
            SymbolKind::Constructor => 4,
            SymbolKind::Enum => 5,
            SymbolKind::EnumMember => 6,
            SymbolKind::TypeAlias => 7,
            SymbolKind::Property => 8,
            SymbolKind::Field => 9,
            SymbolKind::Constant => 10,
            SymbolKind::Variable => 11,
            SymbolKind::Parameter => 12,
            SymbolKind::Module => 13,
            SymbolKind::Namespace => 14,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Enum => "enum",
            SymbolKind::EnumMember => "enum_member",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Variable => "variable",
            SymbolKind::Constant => "constant",
            SymbolKind::Property => "property",
            SymbolKind::Field => "field",
            SymbolKind::TypeAlias => "type_alias",
            SymbolKind::Module => "module",
            SymbolKind::Parameter => "parameter",
            SymbolKind::Namespace => "namespace",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        Some(match s {
            "function" => SymbolKind::Function,
            "method" => SymbolKind::Method,
            "class" => SymbolKind::Class,
            "interface" => SymbolKind::Interface,
            "enum" => SymbolKind::Enum,
            "enum_member" => SymbolKind::EnumMember,
            "constructor" => SymbolKind::Constructor,
            "variable" => SymbolKind::Variable,
            "constant" => SymbolKind::Constant,
            "property" => SymbolKind::Property,
            "field" => SymbolKind::Field,
            "type_alias" => SymbolKind::TypeAlias,
            "module" => SymbolKind::Module,
            "parameter" => SymbolKind::Parameter,
            "namespace" => SymbolKind::Namespace,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
    Protected,
    Internal,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Protected => "protected",
            Visibility::Internal => "internal",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        Some(match s {
            "public" => Visibility::Public,
            "private" => Visibility::Private,
            "protected" => Visibility::Protected,
            "internal" => Visibility::Internal,
            _ => return None,
        })
    }
}

/// A named program entity extracted from a parse tree.
///
/// Position fields span the symbol's **name**, not its body, per the
/// name-anchored-position guarantee (spec §4.2 point 1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Symbol {
    pub id: String,
    pub name: String,
    pub kind: SymbolKind,
    pub language: String,
    pub file_path: String,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub start_byte: u32,
    pub end_byte: u32,
    pub signature: Option<String>,
    pub doc_comment: Option<String>,
    pub visibility: Visibility,
    pub parent_id: Option<String>,
    /// Signature-level type, populated by `infer_types` (spec §4.2).
    /// `None` until the extractor's inference pass runs.
    pub resolved_type: Option<String>,
    pub is_inferred_type: Option<bool>,
    pub metadata: HashMap<String, String>,
}

impl Symbol {
    /// Build a new symbol with a stable, content-derived id.
    ///
    /// The fingerprint is a hash over `(file_path, qualified_name,
    /// start_byte, kind)` so that re-indexing an unchanged file
    /// reproduces the same id and relationships survive (spec §3,
    /// invariant "id is a content-derived fingerprint").
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        qualified_name: &str,
        name: impl Into<String>,
        kind: SymbolKind,
        language: impl Into<String>,
        file_path: impl Into<String>,
        start_line: u32,
        start_column: u32,
        end_line: u32,
        end_column: u32,
        start_byte: u32,
        end_byte: u32,
    ) -> Self {
        let file_path = file_path.into();
        let id = fingerprint_symbol_id(&file_path, qualified_name, start_byte, &kind);
        Self {
            id,
            name: name.into(),
            kind,
            language: language.into(),
            file_path,
            start_line,
            start_column,
            end_line,
            end_column,
            start_byte,
            end_byte,
            signature: None,
            doc_comment: None,
            visibility: Visibility::Public,
            parent_id: None,
            resolved_type: None,
            is_inferred_type: None,
            metadata: HashMap::new(),
        }
    }

    /// Apply a `TypeInfo` produced by `LanguageExtractor::infer_types`.
    pub fn apply_type_info(&mut self, info: &TypeInfo) {
        self.resolved_type = Some(info.resolved_type.clone());
        self.is_inferred_type = Some(info.is_inferred);
    }
}

/// Fingerprint = blake3(file_path || "\0" || qualified_name || "\0" ||
/// start_byte || "\0" || kind), hex-truncated to 32 chars. Deterministic
/// across runs and across process restarts, unlike a random uuid.
pub fn fingerprint_symbol_id(
    file_path: &str,
    qualified_name: &str,
    start_byte: u32,
    kind: &SymbolKind,
) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(file_path.as_bytes());
    hasher.update(b"\0");
    hasher.update(qualified_name.as_bytes());
    hasher.update(b"\0");
    hasher.update(&start_byte.to_le_bytes());
    hasher.update(b"\0");
    hasher.update(kind.as_str().as_bytes());
    hasher.finalize().to_hex()[..32].to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    Calls,
    Extends,
    Implements,
    Uses,
    Imports,
    References,
    Defines,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::Calls => "calls",
            RelationshipKind::Extends => "extends",
            RelationshipKind::Implements => "implements",
            RelationshipKind::Uses => "uses",
            RelationshipKind::Imports => "imports",
            RelationshipKind::References => "references",
            RelationshipKind::Defines => "defines",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        Some(match s {
            "calls" => RelationshipKind::Calls,
            "extends" => RelationshipKind::Extends,
            "implements" => RelationshipKind::Implements,
            "uses" => RelationshipKind::Uses,
            "imports" => RelationshipKind::Imports,
            "references" => RelationshipKind::References,
            "defines" => RelationshipKind::Defines,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relationship {
    pub id: String,
    pub from_symbol_id: String,
    pub to_symbol_id: String,
    pub kind: RelationshipKind,
    pub file_path: String,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Relationship {
    pub fn new(
        from_symbol_id: impl Into<String>,
        to_symbol_id: impl Into<String>,
        kind: RelationshipKind,
        file_path: impl Into<String>,
        start_line: u32,
        start_column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Self {
        let from_symbol_id = from_symbol_id.into();
        let to_symbol_id = to_symbol_id.into();
        let file_path = file_path.into();
        let mut hasher = blake3::Hasher::new();
        hasher.update(from_symbol_id.as_bytes());
        hasher.update(to_symbol_id.as_bytes());
        hasher.update(kind.as_str().as_bytes());
        hasher.update(&start_line.to_le_bytes());
        let id = hasher.finalize().to_hex()[..32].to_string();
        Self {
            id,
            from_symbol_id,
            to_symbol_id,
            kind,
            file_path,
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }
}

/// Signature-level type information for a symbol. `resolved_type` is
/// parsed straight out of the declared signature string; `inferred`
/// when no declared type is available (spec §4.2, "Type inference is
/// signature-level only").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypeInfo {
    pub symbol_id: String,
    pub resolved_type: String,
    pub is_inferred: bool,
}

pub const INFERRED_TYPE: &str = "inferred";

/// Everything one extractor pass over a file produces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub symbols: Vec<Symbol>,
    pub relationships: Vec<Relationship>,
    pub types: HashMap<String, TypeInfo>,
    /// Node kinds that raised an extractor error and were skipped,
    /// per the resilience guarantee (spec §4.2 point 6).
    pub diagnostics: Vec<crate::error::Diagnostic>,
}

/// Shared helpers used by every concrete extractor via composition.
pub struct BaseExtractor<'a> {
    pub language: &'static str,
    pub file_path: &'a str,
    pub content: &'a str,
}

impl<'a> BaseExtractor<'a> {
    pub fn new(language: &'static str, file_path: &'a str, content: &'a str) -> Self {
        Self {
            language,
            file_path,
            content,
        }
    }

    pub fn node_text(&self, node: &tree_sitter::Node) -> &'a str {
        self.content
            .get(node.start_byte()..node.end_byte())
            .unwrap_or("")
    }

    /// Convert a tree-sitter byte-offset `Point` pair to 1-based line /
    /// 0-based column, matching the Data Model's coordinate convention.
    pub fn position_of(node: &tree_sitter::Node) -> (u32, u32, u32, u32) {
        let start = node.start_position();
        let end = node.end_position();
        (
            start.row as u32 + 1,
            start.column as u32,
            end.row as u32 + 1,
            end.column as u32,
        )
    }

    /// Infer visibility from common syntactic markers; defaults to
    /// public when nothing distinguishes the symbol (spec §4.2 point 4).
    pub fn infer_visibility(name: &str, modifiers_text: &str) -> Visibility {
        if modifiers_text.contains("private") {
            Visibility::Private
        } else if modifiers_text.contains("protected") {
            Visibility::Protected
        } else if modifiers_text.contains("internal") {
            Visibility::Internal
        } else if name.starts_with('_') && !name.starts_with("__") {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }

    /// Walk upward from `node` looking for the nearest tree-sitter node
    /// of one of `container_kinds`, used to resolve `parent_id` for
    /// nested symbols (methods in classes, nested functions, etc.).
    pub fn find_enclosing<'t>(
        node: tree_sitter::Node<'t>,
        container_kinds: &[&str],
    ) -> Option<tree_sitter::Node<'t>> {
        let mut current = node.parent();
        while let Some(n) = current {
            if container_kinds.contains(&n.kind()) {
                return Some(n);
            }
            current = n.parent();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_across_calls() {
        let a = fingerprint_symbol_id("src/a.rs", "a::foo", 10, &SymbolKind::Function);
        let b = fingerprint_symbol_id("src/a.rs", "a::foo", 10, &SymbolKind::Function);
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_differs_on_any_input_change() {
        let base = fingerprint_symbol_id("src/a.rs", "a::foo", 10, &SymbolKind::Function);
        assert_ne!(
            base,
            fingerprint_symbol_id("src/b.rs", "a::foo", 10, &SymbolKind::Function)
        );
        assert_ne!(
            base,
            fingerprint_symbol_id("src/a.rs", "a::bar", 10, &SymbolKind::Function)
        );
        assert_ne!(
            base,
            fingerprint_symbol_id("src/a.rs", "a::foo", 11, &SymbolKind::Function)
        );
        assert_ne!(
            base,
            fingerprint_symbol_id("src/a.rs", "a::foo", 10, &SymbolKind::Method)
        );
    }

    #[test]
    fn symbol_new_spans_name_not_body() {
        let sym = Symbol::new(
            "FileWatcher",
            "FileWatcher",
            SymbolKind::Class,
            "typescript",
            "a.ts",
            1,
            13,
            1,
            24,
            13,
            24,
        );
        assert_eq!(sym.start_line, sym.end_line);
        assert!(sym.start_column <= sym.end_column);
    }
}
