//! Hybrid Search (spec §4.7) and Cross-Layer Entity Mapping (§4.8).
//!
//! Both functions are pure and synchronous: they take the structural
//! candidates, the semantic k-NN matches, and a symbol resolver
//! already gathered by the caller, rather than a live store and
//! vector-store handle. That keeps them unit-testable against a
//! trivial in-memory fake (a closure over a `HashMap`) and means the
//! caller — `MillerEngine` — decides how and when to touch the
//! `Arc<Mutex<SymbolDatabase>>` and the vector store's async lock,
//! instead of holding either across a call into this module.

use std::collections::{HashMap, HashSet};

use crate::extractors::Symbol;
use crate::search::scoring::name_similarity;
use crate::vectors::{Layer, VectorMatch};

const WEIGHT_NAME: f64 = 0.3;
const WEIGHT_STRUCTURAL: f64 = 0.3;
const WEIGHT_SEMANTIC: f64 = 0.4;
const STRUCTURAL_HIT_SCORE: f64 = 0.7;
const STRUCTURAL_MISS_SCORE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMethod {
    Structural,
    Semantic,
    Hybrid,
}

#[derive(Debug, Clone)]
pub struct HybridResult {
    pub symbol: Symbol,
    pub hybrid_score: f64,
    pub search_method: SearchMethod,
}

/// Merge structural and semantic candidates into one ranking per the
/// §4.7 scoring formula: `0.3 * name_similarity + 0.3 * structural +
/// 0.4 * semantic`. `resolve` looks up the full `Symbol` for an id
/// found only on the semantic side.
pub fn hybrid_search(
    query: &str,
    structural_results: &[Symbol],
    semantic_matches: &[VectorMatch],
    resolve: impl Fn(&str) -> Option<Symbol>,
) -> Vec<HybridResult> {
    let structural_ids: HashSet<&str> = structural_results.iter().map(|s| s.id.as_str()).collect();
    let semantic_by_id: HashMap<&str, f32> = semantic_matches
        .iter()
        .map(|m| (m.symbol_id.as_str(), m.confidence))
        .collect();

    let mut by_id: HashMap<String, Symbol> = HashMap::new();
    for symbol in structural_results {
        by_id.insert(symbol.id.clone(), symbol.clone());
    }
    for m in semantic_matches {
        if by_id.contains_key(&m.symbol_id) {
            continue;
        }
        if let Some(symbol) = resolve(&m.symbol_id) {
            by_id.insert(symbol.id.clone(), symbol);
        }
    }

    let mut results: Vec<HybridResult> = by_id
        .into_values()
        .map(|symbol| {
            let in_structural = structural_ids.contains(symbol.id.as_str());
            let semantic_score = semantic_by_id.get(symbol.id.as_str()).copied().unwrap_or(0.0) as f64;
            let structural_score = if in_structural {
                STRUCTURAL_HIT_SCORE
            } else {
                STRUCTURAL_MISS_SCORE
            };
            let hybrid_score = WEIGHT_NAME * name_similarity(&symbol.name, query)
                + WEIGHT_STRUCTURAL * structural_score
                + WEIGHT_SEMANTIC * semantic_score;

            let in_semantic = semantic_by_id.contains_key(symbol.id.as_str());
            let search_method = match (in_structural, in_semantic) {
                (true, true) => SearchMethod::Hybrid,
                (true, false) => SearchMethod::Structural,
                (false, true) => SearchMethod::Semantic,
                (false, false) => SearchMethod::Structural,
            };

            HybridResult {
                symbol,
                hybrid_score,
                search_method,
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.hybrid_score
            .partial_cmp(&a.hybrid_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| structural_rank(b.search_method).cmp(&structural_rank(a.search_method)))
    });

    results
}

fn structural_rank(method: SearchMethod) -> u8 {
    match method {
        SearchMethod::Hybrid => 2,
        SearchMethod::Structural => 1,
        SearchMethod::Semantic => 0,
    }
}

#[derive(Debug, Clone)]
pub struct CrossLayerSymbol {
    pub symbol_id: String,
    pub file: String,
    pub layer: Layer,
    pub confidence: f32,
    pub distance: f32,
}

#[derive(Debug, Clone)]
pub struct CrossLayerEntity {
    pub entity_name: String,
    pub symbols: Vec<CrossLayerSymbol>,
    pub total_confidence: f32,
}

/// Join permissive-threshold k-NN matches (already gathered by the
/// caller) against resolved symbols and classify each by
/// architectural layer (spec §4.8).
pub fn find_cross_layer_entity(
    entity_name: &str,
    semantic_matches: &[VectorMatch],
    resolve: impl Fn(&str) -> Option<Symbol>,
) -> CrossLayerEntity {
    let mut symbols = Vec::with_capacity(semantic_matches.len());
    for m in semantic_matches {
        let Some(symbol) = resolve(&m.symbol_id) else {
            continue;
        };
        symbols.push(CrossLayerSymbol {
            symbol_id: m.symbol_id.clone(),
            file: symbol.file_path.clone(),
            layer: Layer::classify(&symbol.file_path),
            confidence: m.confidence,
            distance: m.distance,
        });
    }

    let total_confidence = if symbols.is_empty() {
        0.0
    } else {
        symbols.iter().map(|s| s.confidence).sum::<f32>() / symbols.len() as f32
    };

    CrossLayerEntity {
        entity_name: entity_name.to_string(),
        symbols,
        total_confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::SymbolKind;

    fn sym(name: &str, file: &str) -> Symbol {
        Symbol::new(name, name, SymbolKind::Class, "typescript", file, 1, 0, 1, name.len() as u32, 0, name.len() as u32)
    }

    fn make_resolver(symbols: Vec<Symbol>) -> impl Fn(&str) -> Option<Symbol> {
        let map: HashMap<String, Symbol> = symbols.into_iter().map(|s| (s.id.clone(), s)).collect();
        move |id: &str| map.get(id).cloned()
    }

    #[test]
    fn hybrid_results_are_sorted_descending() {
        let structural = vec![sym("getUserData", "a.ts"), sym("other", "a.ts")];
        let semantic = vec![VectorMatch {
            symbol_id: structural[0].id.clone(),
            distance: 0.0,
            confidence: 0.95,
        }];

        let results = hybrid_search("getUserData", &structural, &semantic, make_resolver(structural.clone()));
        assert!(!results.is_empty());
        for pair in results.windows(2) {
            assert!(pair[0].hybrid_score >= pair[1].hybrid_score);
        }
        assert_eq!(results[0].search_method, SearchMethod::Hybrid);
    }

    #[test]
    fn semantic_only_match_is_resolved_and_tagged() {
        let semantic_only = sym("DomainUser", "domain/entities/user.ts");
        let semantic = vec![VectorMatch {
            symbol_id: semantic_only.id.clone(),
            distance: 0.1,
            confidence: 0.9,
        }];

        let results = hybrid_search("User", &[], &semantic, make_resolver(vec![semantic_only]));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].search_method, SearchMethod::Semantic);
    }

    #[test]
    fn cross_layer_surfaces_multiple_layers() {
        let files = [
            "api/DTOs/user_dto.ts",
            "domain/entities/user.ts",
            "database/migrations/001_user.sql",
            "components/UserCard.tsx",
        ];
        let symbols: Vec<Symbol> = files.iter().map(|f| sym("User", f)).collect();
        let semantic: Vec<VectorMatch> = symbols
            .iter()
            .map(|s| VectorMatch {
                symbol_id: s.id.clone(),
                distance: 0.05,
                confidence: 0.95,
            })
            .collect();

        let entity = find_cross_layer_entity("User", &semantic, make_resolver(symbols));
        let layers: HashSet<_> = entity.symbols.iter().map(|s| s.layer).collect();
        assert!(layers.len() >= 3, "expected multiple distinct layers, got {layers:?}");
    }
}
