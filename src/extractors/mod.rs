//! Language-agnostic extractor contract (spec §4.2).
//!
//! Each language implements [`LanguageExtractor`] once; the manager
//! dispatches by detected language and wraps every call so a failure
//! on one node degrades to a diagnostic instead of aborting the whole
//! file (the "resilience" guarantee).

pub mod base;
pub mod python;
pub mod rust;
pub mod typescript;

pub use base::{
    ExtractionResult, Relationship, RelationshipKind, Symbol, SymbolKind, TypeInfo, Visibility,
};

use crate::error::Diagnostic;

/// Uniform per-language contract. Implementors should never panic;
/// best-effort partial results plus diagnostics are always preferred
/// over aborting (spec §4.2 point 6).
pub trait LanguageExtractor: Send + Sync {
    fn language(&self) -> &'static str;

    fn extract_symbols(&self, tree: &tree_sitter::Tree, content: &str, file_path: &str) -> (Vec<Symbol>, Vec<Diagnostic>);

    fn extract_relationships(
        &self,
        tree: &tree_sitter::Tree,
        content: &str,
        file_path: &str,
        symbols: &[Symbol],
    ) -> Vec<Relationship>;

    /// Signature-level type inference (spec §4.2: "parse the declared
    /// type from signature strings; produce `inferred` when
    /// unavailable").
    fn infer_types(&self, symbols: &[Symbol]) -> std::collections::HashMap<String, TypeInfo> {
        symbols
            .iter()
            .map(|s| {
                let resolved = s
                    .signature
                    .as_deref()
                    .and_then(|_| None) // language-specific extractors override this
                    .unwrap_or(base::INFERRED_TYPE)
                    .to_string();
                let is_inferred = resolved == base::INFERRED_TYPE;
                (
                    s.id.clone(),
                    TypeInfo {
                        symbol_id: s.id.clone(),
                        resolved_type: resolved,
                        is_inferred,
                    },
                )
            })
            .collect()
    }
}

/// Owns one extractor instance per supported language and dispatches
/// `extract` for a parsed file. Same stateless-dispatch shape as the
/// upstream `miller` `ExtractorManager` (one call per file, routed by
/// detected language, degrade to a diagnostic rather than panic on an
/// unsupported one), folded into a single `extract` call that returns
/// symbols, relationships, and types together instead of three
/// separately-callable methods.
pub struct ExtractorManager {
    extractors: std::collections::HashMap<&'static str, Box<dyn LanguageExtractor>>,
}

impl Default for ExtractorManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractorManager {
    pub fn new() -> Self {
        let mut extractors: std::collections::HashMap<&'static str, Box<dyn LanguageExtractor>> =
            std::collections::HashMap::new();
        extractors.insert("rust", Box::new(rust::RustExtractor));
        extractors.insert("typescript", Box::new(typescript::TypeScriptExtractor));
        extractors.insert("python", Box::new(python::PythonExtractor));
        Self { extractors }
    }

    pub fn supported_languages(&self) -> Vec<&'static str> {
        let mut langs: Vec<_> = self.extractors.keys().copied().collect();
        langs.sort_unstable();
        langs
    }

    /// Run the full extract pipeline for one file: symbols,
    /// relationships, and signature-level types. Returns
    /// `ExtractionResult::default()` (no panic) when the language has
    /// no registered extractor — callers persist the file row with an
    /// empty symbol set, matching a `ParseError`-style degradation.
    pub fn extract(&self, language: &str, tree: &tree_sitter::Tree, content: &str, file_path: &str) -> ExtractionResult {
        let Some(extractor) = self.extractors.get(language) else {
            return ExtractionResult {
                diagnostics: vec![Diagnostic::for_path(
                    file_path,
                    format!("no extractor registered for language '{language}'"),
                )],
                ..Default::default()
            };
        };

        let (mut symbols, mut diagnostics) = extractor.extract_symbols(tree, content, file_path);
        let relationships = extractor.extract_relationships(tree, content, file_path, &symbols);
        let types = extractor.infer_types(&symbols);
        for symbol in &mut symbols {
            if let Some(info) = types.get(&symbol.id) {
                symbol.apply_type_info(info);
            }
        }
        diagnostics.retain(|d| !d.message.is_empty());

        ExtractionResult {
            symbols,
            relationships,
            types,
            diagnostics,
        }
    }
}
