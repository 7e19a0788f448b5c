//! `MillerEngine` (spec §6): the public API surface composing the
//! indexing coordinator, the in-memory search index, the vector
//! store, and the symbol store into the handful of calls a front-end
//! embeds.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::RwLock as TokioRwLock;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::database::{SymbolDatabase, SymbolFilter};
use crate::embeddings::{Embedder, TfIdfEmbedder};
use crate::error::{MillerError, Result};
use crate::extractors::{ExtractorManager, Symbol, SymbolKind};
use crate::hybrid::{self, SearchMethod};
use crate::indexer::{FileIndexOutcome, IndexSummary, IndexingCoordinator};
use crate::language::LanguageRegistry;
use crate::parser::ParserManager;
use crate::search::{SearchIndex, SearchOptions as StructuralOptions};
use crate::vectors::{Layer, VectorStore};

/// Soft per-query timeout (spec §5, "e.g., 200ms"); on expiry the
/// caller gets whatever was gathered so far with `partial = true`.
const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Default,
    CrossLayer,
}

#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub max_results: usize,
    pub include_structural: bool,
    pub include_semantic: bool,
    pub semantic_threshold: f32,
    pub mode: QueryMode,
    pub language: Option<String>,
    pub symbol_kinds: Vec<SymbolKind>,
    pub file_pattern: Option<String>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            max_results: 20,
            include_structural: true,
            include_semantic: true,
            semantic_threshold: 0.5,
            mode: QueryMode::Default,
            language: None,
            symbol_kinds: Vec::new(),
            file_pattern: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryResult {
    pub symbol: Symbol,
    pub score: f64,
    pub search_method: SearchMethod,
    pub layer: Option<Layer>,
}

#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    pub results: Vec<QueryResult>,
    pub partial: bool,
}

#[derive(Debug, Clone)]
pub struct ParserHealth {
    pub loaded: Vec<&'static str>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct StoreHealth {
    pub total_files: i64,
    pub total_symbols: i64,
}

#[derive(Debug, Clone)]
pub struct VectorHealth {
    pub semantic_search_available: bool,
    pub total_embeddings: usize,
}

#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub parsers: ParserHealth,
    pub store: StoreHealth,
    pub vectors: VectorHealth,
}

#[derive(Debug, Clone)]
pub struct SemanticStats {
    pub semantic_search_available: bool,
    pub total_embeddings: usize,
    pub embedding_progress: f64,
}

#[derive(Debug, Clone)]
pub struct WorkspaceStats {
    pub total_files: i64,
    pub total_symbols: i64,
    pub languages: Vec<String>,
    pub semantic: SemanticStats,
}

pub struct MillerEngine {
    config: EngineConfig,
    db: Arc<StdMutex<SymbolDatabase>>,
    registry: Arc<LanguageRegistry>,
    vector_store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
    coordinator: Arc<IndexingCoordinator>,
    search_index: Arc<TokioRwLock<SearchIndex>>,
    cancelled: Arc<AtomicBool>,
    watcher_task: StdMutex<Option<tokio::task::JoinHandle<()>>>,
}

impl MillerEngine {
    /// Open/create the store and vector index under
    /// `<workspace>/.miller/`, start the watcher if configured, and
    /// return ready to index or query (spec §6).
    pub async fn initialize(config: EngineConfig) -> Result<Self> {
        std::fs::create_dir_all(config.miller_dir()).map_err(|source| MillerError::IOError {
            path: config.miller_dir(),
            source,
        })?;
        std::fs::create_dir_all(config.vectors_dir()).map_err(|source| MillerError::IOError {
            path: config.vectors_dir(),
            source,
        })?;
        std::fs::create_dir_all(config.logs_dir()).map_err(|source| MillerError::IOError {
            path: config.logs_dir(),
            source,
        })?;

        let db = Arc::new(StdMutex::new(SymbolDatabase::open(&config.db_path())?));
        let registry = Arc::new(LanguageRegistry::new());
        registry.initialize();
        let parser = Arc::new(ParserManager::new(Arc::clone(&registry)));
        let extractors = Arc::new(ExtractorManager::new());

        let index_path = config.vectors_dir().join("index");
        let vector_store = Arc::new(VectorStore::new(index_path.to_string_lossy().to_string()));

        let embedder: Arc<dyn Embedder> = Arc::new(TfIdfEmbedder::new());
        embedder.initialize(&config.embedding_model)?;

        let coordinator = Arc::new(IndexingCoordinator::new(
            Arc::clone(&db),
            Arc::clone(&registry),
            parser,
            extractors,
            Arc::clone(&vector_store),
            Arc::clone(&embedder),
            config.clone(),
        ));

        let watcher_task = if config.enable_watcher {
            let coordinator = Arc::clone(&coordinator);
            let workspace = config.workspace_path.clone();
            Some(tokio::spawn(async move {
                if let Err(err) = coordinator.watch(workspace).await {
                    warn!(%err, "file watcher stopped");
                }
            }))
        } else {
            None
        };

        Ok(Self {
            config,
            db,
            registry,
            vector_store,
            embedder,
            coordinator,
            search_index: Arc::new(TokioRwLock::new(SearchIndex::new())),
            cancelled: Arc::new(AtomicBool::new(false)),
            watcher_task: StdMutex::new(watcher_task),
        })
    }

    pub async fn index_workspace(&self) -> Result<IndexSummary> {
        let workspace_path = self.config.workspace_path.clone();
        let summary = self.coordinator.index_workspace(&workspace_path).await?;
        self.rebuild_search_index().await?;
        info!(
            files_processed = summary.files_processed,
            files_skipped = summary.files_skipped,
            symbols_indexed = summary.symbols_indexed,
            "workspace indexed"
        );
        Ok(summary)
    }

    pub async fn index_file(&self, path: &Path) -> Result<FileIndexOutcome> {
        let outcome = self.coordinator.index_file(path.to_path_buf()).await?;
        self.rebuild_search_index().await?;
        Ok(outcome)
    }

    /// Stop the watcher, signal cancellation to any in-flight sweep,
    /// and let the store/vector store close on drop (spec §5's
    /// resource-lifecycle ordering).
    pub async fn shutdown(&self) -> Result<()> {
        self.cancelled.store(true, Ordering::SeqCst);
        self.coordinator.cancel();
        if let Some(handle) = self.watcher_task.lock().unwrap().take() {
            handle.abort();
        }
        Ok(())
    }

    pub async fn health_check(&self) -> Result<HealthStatus> {
        let (loaded, failed) = self.registry.health();
        let db = Arc::clone(&self.db);
        let (total_files, total_symbols) = tokio::task::spawn_blocking(move || -> Result<(i64, i64)> {
            let db = db.lock().unwrap();
            Ok((db.file_count()?, db.symbol_count()?))
        })
        .await
        .map_err(|_| MillerError::Cancelled)??;

        let vector_stats = self.vector_store.stats().await;

        Ok(HealthStatus {
            parsers: ParserHealth { loaded, failed },
            store: StoreHealth {
                total_files,
                total_symbols,
            },
            vectors: VectorHealth {
                semantic_search_available: self.config.enable_semantic_search,
                total_embeddings: vector_stats.total_vectors,
            },
        })
    }

    pub async fn get_workspace_stats(&self) -> Result<WorkspaceStats> {
        let db = Arc::clone(&self.db);
        let (total_files, total_symbols, languages) = tokio::task::spawn_blocking(move || -> Result<(i64, i64, Vec<String>)> {
            let db = db.lock().unwrap();
            Ok((db.file_count()?, db.symbol_count()?, db.distinct_languages()?))
        })
        .await
        .map_err(|_| MillerError::Cancelled)??;

        let vector_stats = self.vector_store.stats().await;
        let embedding_progress = if total_symbols > 0 {
            vector_stats.total_vectors as f64 / total_symbols as f64
        } else {
            0.0
        };

        Ok(WorkspaceStats {
            total_files,
            total_symbols,
            languages,
            semantic: SemanticStats {
                semantic_search_available: self.config.enable_semantic_search,
                total_embeddings: vector_stats.total_vectors,
                embedding_progress,
            },
        })
    }

    /// Structural-only fuzzy search over the in-memory index (spec
    /// §4.4).
    pub async fn search_code(&self, query: &str, options: &QueryOptions) -> Result<QueryOutcome> {
        let structural_options = self.structural_options(options);
        let search_index = Arc::clone(&self.search_index);
        let query = query.to_string();

        let computation = async move {
            let index = search_index.read().await;
            index.fuzzy(&query, &structural_options)
        };

        match tokio::time::timeout(DEFAULT_QUERY_TIMEOUT, computation).await {
            Ok(hits) => Ok(QueryOutcome {
                results: hits
                    .into_iter()
                    .map(|hit| QueryResult {
                        symbol: hit.symbol,
                        score: hit.score,
                        search_method: SearchMethod::Structural,
                        layer: None,
                    })
                    .collect(),
                partial: false,
            }),
            Err(_) => Ok(QueryOutcome {
                results: Vec::new(),
                partial: true,
            }),
        }
    }

    /// Embedding-based k-NN search (spec §4.5, §4.6). Degrades to
    /// `EmbedderUnavailable` when semantic search is disabled, per the
    /// error taxonomy (spec §7).
    pub async fn semantic_search(&self, query: &str, options: &QueryOptions) -> Result<QueryOutcome> {
        if !self.config.enable_semantic_search {
            return Err(MillerError::EmbedderUnavailable(
                "semantic search disabled in this workspace's configuration".to_string(),
            ));
        }

        let embedding = self.embedder.embed_query(query)?;
        let computation = async {
            let matches = self
                .vector_store
                .search(&embedding.vector, options.max_results, options.semantic_threshold)
                .await?;
            self.resolve_matches(&matches).await
        };

        match tokio::time::timeout(DEFAULT_QUERY_TIMEOUT, computation).await {
            Ok(result) => {
                let resolved = result?;
                let results = resolved
                    .into_iter()
                    .filter(|(symbol, _)| passes_filters(symbol, options))
                    .map(|(symbol, confidence)| QueryResult {
                        layer: Some(Layer::classify(&symbol.file_path)),
                        symbol,
                        score: confidence as f64,
                        search_method: SearchMethod::Semantic,
                    })
                    .collect();
                Ok(QueryOutcome { results, partial: false })
            }
            Err(_) => Ok(QueryOutcome {
                results: Vec::new(),
                partial: true,
            }),
        }
    }

    /// Blended structural + semantic ranking (spec §4.7), or the
    /// cross-layer entity view when `options.mode == CrossLayer` (spec
    /// §4.8).
    pub async fn hybrid_search(&self, query: &str, options: &QueryOptions) -> Result<QueryOutcome> {
        let structural_hits = if options.include_structural {
            let structural_options = self.structural_options(options);
            let index = self.search_index.read().await;
            index.fuzzy(query, &structural_options)
        } else {
            Vec::new()
        };
        let structural_symbols: Vec<Symbol> = structural_hits.into_iter().map(|hit| hit.symbol).collect();

        let semantic_matches = if options.include_semantic && self.config.enable_semantic_search {
            let embedding = self.embedder.embed_query(query)?;
            self.vector_store
                .search(&embedding.vector, options.max_results.max(20), options.semantic_threshold)
                .await?
        } else {
            Vec::new()
        };

        let mut unresolved_ids: Vec<String> = semantic_matches
            .iter()
            .map(|m| m.symbol_id.clone())
            .filter(|id| !structural_symbols.iter().any(|s| &s.id == id))
            .collect();
        unresolved_ids.sort_unstable();
        unresolved_ids.dedup();

        let resolved_map = self.resolve_symbol_ids(&unresolved_ids).await?;

        let mut results: Vec<QueryResult> = if options.mode == QueryMode::CrossLayer {
            let entity = hybrid::find_cross_layer_entity(query, &semantic_matches, |id| {
                structural_symbols
                    .iter()
                    .find(|s| s.id == id)
                    .cloned()
                    .or_else(|| resolved_map.get(id).cloned())
            });
            entity
                .symbols
                .into_iter()
                .filter_map(|cross| {
                    structural_symbols
                        .iter()
                        .find(|s| s.id == cross.symbol_id)
                        .cloned()
                        .or_else(|| resolved_map.get(&cross.symbol_id).cloned())
                        .map(|symbol| QueryResult {
                            symbol,
                            score: cross.confidence as f64,
                            search_method: SearchMethod::Semantic,
                            layer: Some(cross.layer),
                        })
                })
                .collect()
        } else {
            hybrid::hybrid_search(query, &structural_symbols, &semantic_matches, |id| resolved_map.get(id).cloned())
                .into_iter()
                .map(|result| QueryResult {
                    layer: Some(Layer::classify(&result.symbol.file_path)),
                    score: result.hybrid_score,
                    search_method: result.search_method,
                    symbol: result.symbol,
                })
                .collect()
        };

        results.truncate(options.max_results);
        Ok(QueryOutcome { results, partial: false })
    }

    async fn rebuild_search_index(&self) -> Result<()> {
        let db = Arc::clone(&self.db);
        let symbols = tokio::task::spawn_blocking(move || -> Result<Vec<Symbol>> {
            let db = db.lock().unwrap();
            db.iter_all_symbols()
        })
        .await
        .map_err(|_| MillerError::Cancelled)??;

        let mut index = self.search_index.write().await;
        index.rebuild(symbols);
        Ok(())
    }

    async fn resolve_matches(&self, matches: &[crate::vectors::VectorMatch]) -> Result<Vec<(Symbol, f32)>> {
        let ids: Vec<String> = matches.iter().map(|m| m.symbol_id.clone()).collect();
        let resolved = self.resolve_symbol_ids(&ids).await?;
        Ok(matches
            .iter()
            .filter_map(|m| resolved.get(&m.symbol_id).cloned().map(|symbol| (symbol, m.confidence)))
            .collect())
    }

    async fn resolve_symbol_ids(&self, ids: &[String]) -> Result<std::collections::HashMap<String, Symbol>> {
        if ids.is_empty() {
            return Ok(std::collections::HashMap::new());
        }
        let db = Arc::clone(&self.db);
        let ids = ids.to_vec();
        tokio::task::spawn_blocking(move || -> Result<std::collections::HashMap<String, Symbol>> {
            let db = db.lock().unwrap();
            let mut map = std::collections::HashMap::new();
            for id in ids {
                if let Some(symbol) = db.get_symbol(&id)? {
                    map.insert(id, symbol);
                }
            }
            Ok(map)
        })
        .await
        .map_err(|_| MillerError::Cancelled)?
    }

    fn structural_options(&self, options: &QueryOptions) -> StructuralOptions {
        StructuralOptions {
            limit: Some(options.max_results),
            language: options.language.clone(),
            symbol_kinds: options.symbol_kinds.clone(),
            file_pattern: options.file_pattern.clone(),
            include_signature: true,
        }
    }
}

fn passes_filters(symbol: &Symbol, options: &QueryOptions) -> bool {
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

/// Build a `SymbolFilter` for a caller that wants a plain store query
/// instead of going through the search index (e.g. the CLI's `--type`
/// flag on a cold store before the first `index_workspace`).
pub fn filter_from_options(options: &QueryOptions) -> SymbolFilter {
    SymbolFilter {
        name_contains: None,
        language: options.language.clone(),
        kinds: options.symbol_kinds.clone(),
        file_path: options.file_pattern.clone(),
        limit: Some(options.max_results),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn engine(dir: &std::path::Path) -> MillerEngine {
        let config = EngineConfig {
            workspace_path: dir.to_path_buf(),
            enable_watcher: false,
            ..EngineConfig::default()
        };
        MillerEngine::initialize(config).await.unwrap()
    }

    #[tokio::test]
    async fn index_then_search_code_finds_symbol() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.ts"), "function getUserData() {}").unwrap();
        let engine = engine(dir.path()).await;

        let summary = engine.index_workspace().await.unwrap();
        assert_eq!(summary.files_processed, 1);

        let outcome = engine.search_code("data", &QueryOptions::default()).await.unwrap();
        assert!(!outcome.partial);
        assert!(outcome.results.iter().any(|r| r.symbol.name == "getUserData"));
    }

    #[tokio::test]
    async fn hybrid_search_returns_descending_scores() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.ts"), "function getUserData() {}\nfunction other() {}").unwrap();
        let engine = engine(dir.path()).await;
        engine.index_workspace().await.unwrap();

        let outcome = engine
            .hybrid_search("getUserData", &QueryOptions::default())
            .await
            .unwrap();
        for pair in outcome.results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn workspace_stats_reflect_indexed_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "def hello(): pass").unwrap();
        let engine = engine(dir.path()).await;
        engine.index_workspace().await.unwrap();

        let stats = engine.get_workspace_stats().await.unwrap();
        assert_eq!(stats.total_files, 1);
        assert_eq!(stats.total_symbols, 1);
        assert!(stats.languages.contains(&"python".to_string()));
    }

    #[tokio::test]
    async fn semantic_search_errors_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            workspace_path: dir.path().to_path_buf(),
            enable_watcher: false,
            enable_semantic_search: false,
            ..EngineConfig::default()
        };
        let engine = MillerEngine::initialize(config).await.unwrap();
        let err = engine.semantic_search("data", &QueryOptions::default()).await.unwrap_err();
        assert!(matches!(err, MillerError::EmbedderUnavailable(_)));
    }
}
