//! In-memory text search index (spec §4.4). Built by streaming
//! `SymbolDatabase::iter_all_symbols` under one read; queried by
//! `fuzzy`/`exact`/`by_type`.

use std::collections::HashMap;

use regex::Regex;

use super::scoring::{score_candidate, tie_break_key};
use super::tokenizer::tokenize_fields;
use crate::extractors::{Symbol, SymbolKind};

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub limit: Option<usize>,
    pub language: Option<String>,
    pub symbol_kinds: Vec<SymbolKind>,
    pub file_pattern: Option<String>,
    pub include_signature: bool,
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub symbol: Symbol,
    pub score: f64,
}

struct IndexedSymbol {
    symbol: Symbol,
    name_tokens: Vec<String>,
    other_tokens: Vec<String>,
}

/// Token → posting list (indices into `entries`), plus the full
/// symbol snapshot the postings point into.
#[derive(Default)]
pub struct SearchIndex {
    entries: Vec<IndexedSymbol>,
    postings: HashMap<String, Vec<usize>>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole index from a fresh symbol snapshot.
    pub fn rebuild(&mut self, symbols: Vec<Symbol>) {
        self.entries.clear();
        self.postings.clear();

        for symbol in symbols {
            let name_tokens = tokenize_fields(&[&symbol.name]);
            let mut other_fields: Vec<&str> = Vec::new();
            if let Some(sig) = symbol.signature.as_deref() {
                other_fields.push(sig);
            }
            if let Some(doc) = symbol.doc_comment.as_deref() {
                other_fields.push(doc);
            }
            let other_tokens = tokenize_fields(&other_fields);

            let idx = self.entries.len();
            for token in name_tokens.iter().chain(other_tokens.iter()) {
                self.postings.entry(token.clone()).or_default().push(idx);
            }
            self.entries.push(IndexedSymbol {
                symbol,
                name_tokens,
                other_tokens,
            });
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.postings.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Levenshtein-tolerant token matching (spec §4.4). An empty query
    /// always returns `[]`.
    pub fn fuzzy(&self, query: &str, options: &SearchOptions) -> Vec<SearchHit> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let query_tokens = super::tokenizer::tokenize(query);

        let mut candidates: std::collections::HashSet<usize> = std::collections::HashSet::new();
        for token in &query_tokens {
            if let Some(ids) = self.postings.get(token) {
                candidates.extend(ids.iter().copied());
            }
        }
        // Fall back to a full scan so typo'd single-word queries still
        // match via edit distance against the whole corpus.
        if candidates.is_empty() {
            candidates.extend(0..self.entries.len());
        }

        let mut hits: Vec<SearchHit> = candidates
            .into_iter()
            .filter_map(|idx| {
                let entry = &self.entries[idx];
                if !self.passes_filters(&entry.symbol, options) {
                    return None;
                }
                let score = score_candidate(
                    query,
                    &query_tokens,
                    &entry.symbol.name,
                    &entry.name_tokens,
                    &entry.other_tokens,
                );
                Some(SearchHit {
                    symbol: entry.symbol.clone(),
                    score,
                })
            })
            .collect();

        self.sort_and_limit(&mut hits, options);
        hits
    }

    /// Substring match with optional regex; an invalid regex falls
    /// back to a literal substring search (spec §4.4).
    pub fn exact(&self, pattern: &str, options: &SearchOptions) -> Vec<SearchHit> {
        if pattern.is_empty() {
            return Vec::new();
        }
        let regex = Regex::new(pattern).ok();

        let matches = |haystack: &str| -> bool {
            match &regex {
                Some(re) => re.is_match(haystack),
                None => haystack.to_lowercase().contains(&pattern.to_lowercase()),
            }
        };

        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .filter(|entry| self.passes_filters(&entry.symbol, options))
            .filter(|entry| {
                matches(&entry.symbol.name)
                    || entry.symbol.signature.as_deref().is_some_and(matches)
                    || entry.symbol.doc_comment.as_deref().is_some_and(matches)
            })
            .map(|entry| SearchHit {
                symbol: entry.symbol.clone(),
                score: if entry.symbol.name.to_lowercase() == pattern.to_lowercase() {
                    1.0
                } else {
                    0.5
                },
            })
            .collect();

        self.sort_and_limit(&mut hits, options);
        hits
    }

    /// Restrict to symbols whose declared/inferred type equals
    /// `type_name` (populated by `LanguageExtractor::infer_types`).
    pub fn by_type(&self, type_name: &str, options: &SearchOptions) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .filter(|entry| self.passes_filters(&entry.symbol, options))
            .filter(|entry| entry.symbol.resolved_type.as_deref() == Some(type_name))
            .map(|entry| SearchHit {
                symbol: entry.symbol.clone(),
                score: 1.0,
            })
            .collect();

        self.sort_and_limit(&mut hits, options);
        hits
    }

    fn passes_filters(&self, symbol: &Symbol, options: &SearchOptions) -> bool {
        if let Some(language) = &options.language {
            if &symbol.language != language {
                return false;
            }
        }
        if !options.symbol_kinds.is_empty() && !options.symbol_kinds.contains(&symbol.kind) {
            return false;
        }
        if let Some(pattern) = &options.file_pattern {
            if !symbol.file_path.contains(pattern.as_str()) {
                return false;
            }
        }
        true
    }

    fn sort_and_limit(&self, hits: &mut Vec<SearchHit>, options: &SearchOptions) {
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    tie_break_key(&a.symbol.kind, &a.symbol.name)
                        .cmp(&tie_break_key(&b.symbol.kind, &b.symbol.name))
                })
        });
        if let Some(limit) = options.limit {
            hits.truncate(limit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::{Symbol, SymbolKind};

    fn sym(name: &str, kind: SymbolKind, lang: &str, file: &str) -> Symbol {
        Symbol::new(name, name, kind, lang, file, 1, 0, 1, name.len() as u32, 0, name.len() as u32)
    }

    #[test]
    fn empty_query_returns_nothing() {
        let mut index = SearchIndex::new();
        index.rebuild(vec![sym("getUserData", SymbolKind::Function, "typescript", "a.ts")]);
        assert!(index.fuzzy("", &SearchOptions::default()).is_empty());
    }

    #[test]
    fn fuzzy_finds_camel_and_snake_case_via_shared_token() {
        let mut index = SearchIndex::new();
        index.rebuild(vec![
            sym("getUserData", SymbolKind::Function, "typescript", "a.ts"),
            sym("get_user_data", SymbolKind::Function, "python", "b.py"),
        ]);
        let hits = index.fuzzy("data", &SearchOptions::default());
        let names: Vec<_> = hits.iter().map(|h| h.symbol.name.as_str()).collect();
        assert!(names.contains(&"getUserData"));
        assert!(names.contains(&"get_user_data"));
    }

    #[test]
    fn exact_falls_back_to_literal_on_invalid_regex() {
        let mut index = SearchIndex::new();
        index.rebuild(vec![sym("foo(bar", SymbolKind::Function, "rust", "a.rs")]);
        let hits = index.exact("foo(bar", &SearchOptions::default());
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn language_filter_excludes_other_languages() {
        let mut index = SearchIndex::new();
        index.rebuild(vec![
            sym("getUserData", SymbolKind::Function, "typescript", "a.ts"),
            sym("get_user_data", SymbolKind::Function, "python", "b.py"),
        ]);
        let options = SearchOptions {
            language: Some("python".to_string()),
            ..Default::default()
        };
        let hits = index.fuzzy("data", &options);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].symbol.language, "python");
    }
}
