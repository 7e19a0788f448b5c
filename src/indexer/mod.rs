//! Indexing Coordinator (spec §4.9): discovery → delta check →
//! parse/extract/persist pipeline → batched embedding submission, plus
//! the watcher-driven incremental path. All `SymbolDatabase` access
//! happens inside `spawn_blocking`, matching the blocking-mutex
//! boundary documented on the type itself (spec §5).

pub mod discovery;
pub mod watcher;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tracing::warn;

use crate::config::EngineConfig;
use crate::database::{FileRecord, SymbolDatabase};
use crate::embeddings::{EmbedContext, Embedder};
use crate::error::{Diagnostic, MillerError, Result};
use crate::extractors::ExtractorManager;
use crate::language::LanguageRegistry;
use crate::parser::ParserManager;
use crate::vectors::VectorStore;

pub use watcher::{FileWatcher, WatchEvent};

#[derive(Debug, Default, Clone)]
pub struct IndexSummary {
    pub files_processed: usize,
    pub files_skipped: usize,
    pub symbols_indexed: usize,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct FileIndexOutcome {
    pub path: PathBuf,
    pub skipped: bool,
    pub symbols_indexed: usize,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Clone)]
struct PendingEmbedding {
    symbol_id: String,
    snippet: String,
    context: EmbedContext,
}

pub struct IndexingCoordinator {
    db: Arc<StdMutex<SymbolDatabase>>,
    registry: Arc<LanguageRegistry>,
    parser: Arc<ParserManager>,
    extractors: Arc<ExtractorManager>,
    vector_store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
    config: EngineConfig,
    cancelled: Arc<AtomicBool>,
}

impl IndexingCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Arc<StdMutex<SymbolDatabase>>,
        registry: Arc<LanguageRegistry>,
        parser: Arc<ParserManager>,
        extractors: Arc<ExtractorManager>,
        vector_store: Arc<VectorStore>,
        embedder: Arc<dyn Embedder>,
        config: EngineConfig,
    ) -> Self {
        Self {
            db,
            registry,
            parser,
            extractors,
            vector_store,
            embedder,
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Discover, delta-check, and index every supported file under
    /// `root`. Checks cancellation between files (spec §5).
    pub async fn index_workspace(&self, root: &Path) -> Result<IndexSummary> {
        let files = discovery::discover_files(root, &self.registry, &self.config.ignore_dirs);
        let mut summary = IndexSummary::default();
        for path in files {
            if self.is_cancelled() {
                return Err(MillerError::Cancelled);
            }
            let outcome = self.index_file(path).await?;
            if outcome.skipped {
                summary.files_skipped += 1;
            } else {
                summary.files_processed += 1;
                summary.symbols_indexed += outcome.symbols_indexed;
            }
            summary.diagnostics.extend(outcome.diagnostics);
        }
        Ok(summary)
    }

    /// Run the parse → extract → persist pipeline for one file,
    /// skipping it if its content hash is unchanged.
    pub async fn index_file(&self, path: PathBuf) -> Result<FileIndexOutcome> {
        let db = Arc::clone(&self.db);
        let parser = Arc::clone(&self.parser);
        let extractors = Arc::clone(&self.extractors);
        let path_for_blocking = path.clone();

        let (outcome, pending) = tokio::task::spawn_blocking(move || {
            index_file_sync(&db, &parser, &extractors, &path_for_blocking)
        })
        .await
        .map_err(|_| MillerError::Cancelled)??;

        if !outcome.skipped && self.config.enable_semantic_search && !pending.is_empty() {
            self.embed_pending(pending).await?;
        }

        Ok(outcome)
    }

    pub async fn delete_file(&self, path: &Path) -> Result<()> {
        let db = Arc::clone(&self.db);
        let path_str = path.to_string_lossy().to_string();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let db = db.lock().unwrap();
            db.delete_file(&path_str)
        })
        .await
        .map_err(|_| MillerError::Cancelled)??;
        Ok(())
    }

    /// Batch embedding computation (size clamped to 10-100, spec
    /// §4.9) and submission to the vector store. Dense-id allocation
    /// runs inside its own `spawn_blocking` so the `Arc<VectorStore>`
    /// write never happens while the `SymbolDatabase` mutex guard is
    /// held across an `.await`.
    async fn embed_pending(&self, items: Vec<PendingEmbedding>) -> Result<()> {
        let batch_size = self.config.batch_size_clamped();
        for chunk in items.chunks(batch_size) {
            let embedder = Arc::clone(&self.embedder);
            let chunk_owned = chunk.to_vec();
            let embedded: Vec<(String, Vec<f32>)> = tokio::task::spawn_blocking(move || {
                chunk_owned
                    .into_iter()
                    .filter_map(|item| {
                        embedder
                            .embed_code(&item.snippet, &item.context)
                            .ok()
                            .map(|out| (item.symbol_id, out.vector))
                    })
                    .collect()
            })
            .await
            .map_err(|_| MillerError::Cancelled)?;

            if embedded.is_empty() {
                continue;
            }

            let db = Arc::clone(&self.db);
            let symbol_ids: Vec<String> = embedded.iter().map(|(id, _)| id.clone()).collect();
            let ids: Vec<(String, u64)> = tokio::task::spawn_blocking(move || -> Result<Vec<(String, u64)>> {
                let db = db.lock().unwrap();
                symbol_ids
                    .into_iter()
                    .map(|id| db.allocate_or_get_vector_id(&id).map(|dense| (id, dense)))
                    .collect()
            })
            .await
            .map_err(|_| MillerError::Cancelled)??;

            let dense_by_id: HashMap<&str, u64> = ids.iter().map(|(id, dense)| (id.as_str(), *dense)).collect();
            for (symbol_id, vector) in embedded {
                if let Some(dense_id) = dense_by_id.get(symbol_id.as_str()) {
                    self.vector_store.set_embedding(*dense_id, symbol_id, vector).await;
                }
            }
        }
        Ok(())
    }

    /// Start the debounced watcher; each coalesced event re-runs the
    /// delta-check pipeline, or `delete_file` for a removal.
    pub async fn watch(self: Arc<Self>, root: PathBuf) -> anyhow::Result<()> {
        let debounce = Duration::from_millis(self.config.watcher_debounce_ms);
        let (_watcher, mut events) = FileWatcher::start(&root, debounce)?;
        while let Some(event) = events.recv().await {
            if self.is_cancelled() {
                break;
            }
            match event {
                WatchEvent::Changed(path) => {
                    if self.registry.is_file_supported(&path) {
                        if let Err(err) = self.index_file(path.clone()).await {
                            warn!(?path, %err, "watcher-triggered index failed");
                        }
                    }
                }
                WatchEvent::Removed(path) => {
                    if let Err(err) = self.delete_file(&path).await {
                        warn!(?path, %err, "watcher-triggered delete failed");
                    }
                }
            }
        }
        Ok(())
    }
}

/// Synchronous core of `index_file`, entirely off the async executor.
/// Returns the persisted outcome plus the symbols newly eligible for
/// embedding.
fn index_file_sync(
    db: &StdMutex<SymbolDatabase>,
    parser: &ParserManager,
    extractors: &ExtractorManager,
    path: &Path,
) -> Result<(FileIndexOutcome, Vec<PendingEmbedding>)> {
    let path_str = path.to_string_lossy().to_string();
    let bytes = std::fs::read(path).map_err(|source| MillerError::IOError {
        path: path.to_path_buf(),
        source,
    })?;
    let content_hash = blake3::hash(&bytes).to_hex().to_string();
    let last_modified = std::fs::metadata(path)
        .ok()
        .and_then(|m| m.modified().ok())
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    let needs_reindex = {
        let db = db.lock().unwrap();
        db.file_needs_reindex(&path_str, &content_hash)?
    };
    if !needs_reindex {
        return Ok((
            FileIndexOutcome {
                path: path.to_path_buf(),
                skipped: true,
                symbols_indexed: 0,
                diagnostics: Vec::new(),
            },
            Vec::new(),
        ));
    }

    let parsed = match parser.parse(path, &bytes) {
        Ok(parsed) => parsed,
        Err(MillerError::UnsupportedLanguage { .. }) => {
            return Ok((
                FileIndexOutcome {
                    path: path.to_path_buf(),
                    skipped: true,
                    symbols_indexed: 0,
                    diagnostics: Vec::new(),
                },
                Vec::new(),
            ));
        }
        Err(err @ MillerError::ParseError { .. }) => {
            // Hash already differs from the stored row (or the file is
            // new), so symbols from a prior successful parse would now
            // be stale rather than merely unchanged — clear them.
            let diagnostic = Diagnostic::from(&err);
            let mut db = db.lock().unwrap();
            db.delete_symbols_for_file(&path_str)?;
            db.upsert_file(&FileRecord {
                path: path_str.clone(),
                language: "unknown".to_string(),
                last_modified,
                size_bytes: bytes.len() as i64,
                content_hash,
                symbol_count: 0,
            })?;
            return Ok((
                FileIndexOutcome {
                    path: path.to_path_buf(),
                    skipped: false,
                    symbols_indexed: 0,
                    diagnostics: vec![diagnostic],
                },
                Vec::new(),
            ));
        }
        Err(err) => return Err(err),
    };

    let content = std::str::from_utf8(&bytes).map_err(|e| MillerError::ParseError {
        path: path.to_path_buf(),
        message: format!("invalid utf-8: {e}"),
    })?;

    let result = extractors.extract(parsed.language, &parsed.tree, content, &path_str);

    let pending = result
        .symbols
        .iter()
        .map(|symbol| PendingEmbedding {
            symbol_id: symbol.id.clone(),
            snippet: symbol.signature.clone().unwrap_or_else(|| symbol.name.clone()),
            context: EmbedContext {
                language: Some(symbol.language.clone()),
                file_path: Some(symbol.file_path.clone()),
            },
        })
        .collect();

    let symbol_count = result.symbols.len();
    {
        let mut db = db.lock().unwrap();
        db.replace_symbols_for_file(&path_str, &result.symbols)?;
        db.replace_relationships_for_file(&path_str, &result.relationships)?;
        db.upsert_file(&FileRecord {
            path: path_str.clone(),
            language: parsed.language.to_string(),
            last_modified,
            size_bytes: bytes.len() as i64,
            content_hash,
            symbol_count: symbol_count as i64,
        })?;
    }

    Ok((
        FileIndexOutcome {
            path: path.to_path_buf(),
            skipped: false,
            symbols_indexed: symbol_count,
            diagnostics: result.diagnostics,
        },
        pending,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::TfIdfEmbedder;

    fn coordinator(dir: &std::path::Path) -> IndexingCoordinator {
        let registry = Arc::new(LanguageRegistry::new());
        registry.initialize();
        let parser = Arc::new(ParserManager::new(Arc::clone(&registry)));
        let db = Arc::new(StdMutex::new(SymbolDatabase::open_in_memory().unwrap()));
        let mut config = EngineConfig::default();
        config.workspace_path = dir.to_path_buf();
        IndexingCoordinator::new(
            db,
            registry,
            parser,
            Arc::new(ExtractorManager::new()),
            Arc::new(VectorStore::new(":memory:")),
            Arc::new(TfIdfEmbedder::new()),
            config,
        )
    }

    #[tokio::test]
    async fn s3_identical_bytes_are_skipped_on_second_pass() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("x.ts");
        std::fs::write(&file, "function hello() {}").unwrap();
        let coordinator = coordinator(dir.path());

        let first = coordinator.index_file(file.clone()).await.unwrap();
        assert!(!first.skipped);
        assert_eq!(first.symbols_indexed, 1);

        let second = coordinator.index_file(file).await.unwrap();
        assert!(second.skipped);
    }

    #[tokio::test]
    async fn s4_modified_file_replaces_symbols_without_duplication() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("x.ts");
        std::fs::write(&file, "function hello() {}").unwrap();
        let coordinator = coordinator(dir.path());
        coordinator.index_file(file.clone()).await.unwrap();

        std::fs::write(&file, "function hello() {}\nfunction world() {}").unwrap();
        let outcome = coordinator.index_file(file.clone()).await.unwrap();
        assert!(!outcome.skipped);
        assert_eq!(outcome.symbols_indexed, 2);

        let db = coordinator.db.lock().unwrap();
        assert_eq!(db.symbols_for_file(&file.to_string_lossy()).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unsupported_extension_is_skipped_not_errored() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "not code").unwrap();
        let coordinator = coordinator(dir.path());

        let outcome = coordinator.index_file(file).await.unwrap();
        assert!(outcome.skipped);
        assert_eq!(outcome.symbols_indexed, 0);
    }

    #[tokio::test]
    async fn index_workspace_skips_ignored_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        std::fs::write(dir.path().join("node_modules/vendor.rs"), "fn v() {}").unwrap();

        let coordinator = coordinator(dir.path());
        let summary = coordinator.index_workspace(dir.path()).await.unwrap();
        assert_eq!(summary.files_processed, 1);
    }
}
