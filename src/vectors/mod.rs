//! Vector Store (spec §4.6): HNSW-backed cosine-similarity k-NN,
//! translating between opaque symbol ids and the dense integers the
//! index needs.
//!
//! `hnsw_rs`'s graph borrows the vectors it indexes and exposes no
//! update/remove call, so the store keeps the dense-id-indexed
//! embedding arena as the source of truth and rebuilds a fresh graph
//! from it on every read. That keeps `store`'s idempotent-replace
//! contract trivial (overwrite the arena slot) without a
//! self-referential struct or unsafe lifetime surgery — the tradeoff
//! is a rebuild per query rather than a persistent incrementally
//! updated graph.

pub mod layer;

pub use layer::Layer;

use std::collections::HashMap;

use hnsw_rs::prelude::*;
use tokio::sync::RwLock;

use crate::database::SymbolDatabase;
use crate::error::{MillerError, Result};

const MAX_NB_CONNECTION: usize = 16;
const MAX_LAYER: usize = 16;
const EF_CONSTRUCTION: usize = 200;
const EF_SEARCH: usize = 64;

#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub symbol_id: String,
    pub distance: f32,
    pub confidence: f32,
}

#[derive(Debug, Clone)]
pub struct VectorStoreStats {
    pub total_vectors: usize,
    pub index_path: String,
}

#[derive(Default)]
struct IndexState {
    /// `dense_id -> embedding`, the arena `search` rebuilds the HNSW
    /// graph from on every call.
    vectors: Vec<Option<Vec<f32>>>,
    /// `dense_id -> opaque symbol id`.
    id_mapping: Vec<Option<String>>,
}

impl IndexState {
    fn set(&mut self, dense_id: usize, symbol_id: String, embedding: Vec<f32>) {
        if self.vectors.len() <= dense_id {
            self.vectors.resize(dense_id + 1, None);
            self.id_mapping.resize(dense_id + 1, None);
        }
        self.vectors[dense_id] = Some(embedding);
        self.id_mapping[dense_id] = Some(symbol_id);
    }

    fn total_vectors(&self) -> usize {
        self.vectors.iter().filter(|v| v.is_some()).count()
    }

    fn live_entries(&self) -> Vec<(&Vec<f32>, usize)> {
        self.vectors
            .iter()
            .enumerate()
            .filter_map(|(id, v)| v.as_ref().map(|v| (v, id)))
            .collect()
    }
}

/// `hnsw_rs`-backed index plus the symbol-id/dense-integer bridge into
/// the store (spec §4.6). Exclusive writer during insert, shared
/// readers during search, per the Concurrency & Resource Model.
pub struct VectorStore {
    index_path: String,
    state: RwLock<IndexState>,
}

impl VectorStore {
    pub fn new(index_path: impl Into<String>) -> Self {
        Self {
            index_path: index_path.into(),
            state: RwLock::new(IndexState::default()),
        }
    }

    /// Idempotent by `symbol_id`: an existing mapping reuses its dense
    /// slot and its vector is replaced in place; otherwise a new slot
    /// is allocated sequentially under the store's unique constraint
    /// (spec §4.6 — never hash the slot).
    pub async fn store(&self, db: &SymbolDatabase, symbol_id: &str, embedding: &[f32]) -> Result<()> {
        let dense_id = db.allocate_or_get_vector_id(symbol_id)?;
        let mut state = self.state.write().await;
        state.set(dense_id as usize, symbol_id.to_string(), embedding.to_vec());
        Ok(())
    }

    /// Batched insert: dense ids are allocated up front (serialized
    /// through the store's unique constraint), then written into the
    /// arena in one pass.
    pub async fn store_batch(&self, db: &SymbolDatabase, items: &[(String, Vec<f32>)]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let mut state = self.state.write().await;
        for (symbol_id, embedding) in items {
            let dense_id = db.allocate_or_get_vector_id(symbol_id)?;
            state.set(dense_id as usize, symbol_id.clone(), embedding.clone());
        }
        Ok(())
    }

    /// Write directly into the arena when the dense id has already
    /// been allocated elsewhere — used by the indexing coordinator,
    /// which allocates ids inside its own blocking-mutex boundary
    /// around `SymbolDatabase` and must never hold that guard across
    /// this call's `.await` (see `src/indexer/mod.rs`).
    pub async fn set_embedding(&self, dense_id: u64, symbol_id: String, embedding: Vec<f32>) {
        let mut state = self.state.write().await;
        state.set(dense_id as usize, symbol_id, embedding);
    }

    /// Cosine-similarity k-NN; `confidence = max(0, 1 - distance)`
    /// (spec §4.6).
    pub async fn search(&self, query: &[f32], k: usize, similarity_threshold: f32) -> Result<Vec<VectorMatch>> {
        let state = self.state.read().await;
        let entries = state.live_entries();
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let hnsw = Hnsw::<f32, DistCosine>::new(
            MAX_NB_CONNECTION,
            entries.len(),
            MAX_LAYER,
            EF_CONSTRUCTION,
            DistCosine {},
        );
        hnsw.parallel_insert(&entries);

        let neighbours = hnsw.search(query, k, EF_SEARCH);
        let mut matches = Vec::with_capacity(neighbours.len());
        for neighbour in neighbours {
            let Some(Some(symbol_id)) = state.id_mapping.get(neighbour.d_id) else {
                continue;
            };
            let confidence = (1.0 - neighbour.distance).max(0.0);
            if confidence < similarity_threshold {
                continue;
            }
            matches.push(VectorMatch {
                symbol_id: symbol_id.clone(),
                distance: neighbour.distance,
                confidence,
            });
        }
        Ok(matches)
    }

    pub async fn clear(&self, db: &SymbolDatabase) -> Result<()> {
        db.clear_vector_ids()?;
        let mut state = self.state.write().await;
        *state = IndexState::default();
        Ok(())
    }

    pub async fn stats(&self) -> VectorStoreStats {
        let state = self.state.read().await;
        VectorStoreStats {
            total_vectors: state.total_vectors(),
            index_path: self.index_path.clone(),
        }
    }
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("index_path", &self.index_path)
            .finish()
    }
}

/// Join permissive-threshold k-NN results against the store to attach
/// file paths and classify by architectural layer (spec §4.8).
pub async fn classify_matches_by_layer(
    db: &SymbolDatabase,
    matches: &[VectorMatch],
) -> Result<HashMap<Layer, Vec<VectorMatch>>> {
    let mut grouped: HashMap<Layer, Vec<VectorMatch>> = HashMap::new();
    for m in matches {
        let symbol = db
            .get_symbol(&m.symbol_id)?
            .ok_or_else(|| MillerError::VectorStoreError(format!("dangling symbol id {}", m.symbol_id)))?;
        let layer = Layer::classify(&symbol.file_path);
        grouped.entry(layer).or_default().push(m.clone());
    }
    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_vec(dims: usize, hot: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; dims];
        v[hot] = 1.0;
        v
    }

    #[tokio::test]
    async fn store_then_search_is_idempotent_on_symbol_id() {
        let db = SymbolDatabase::open_in_memory().unwrap();
        let store = VectorStore::new(":memory:");
        let vector = unit_vec(8, 0);

        store.store(&db, "sym-a", &vector).await.unwrap();
        store.store(&db, "sym-a", &vector).await.unwrap();

        let stats = store.stats().await;
        assert_eq!(stats.total_vectors, 1);
    }

    #[tokio::test]
    async fn search_returns_self_with_high_confidence() {
        let db = SymbolDatabase::open_in_memory().unwrap();
        let store = VectorStore::new(":memory:");
        let vector = unit_vec(8, 0);
        store.store(&db, "sym-a", &vector).await.unwrap();

        let results = store.search(&vector, 5, 0.5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].symbol_id, "sym-a");
        assert!(results[0].confidence > 0.9);
    }

    #[tokio::test]
    async fn ten_distinct_ids_all_get_unique_sequential_dense_ids() {
        let db = SymbolDatabase::open_in_memory().unwrap();
        let store = VectorStore::new(":memory:");
        let mut seen = std::collections::HashSet::new();
        for i in 0..10 {
            let id = db.allocate_or_get_vector_id(&format!("sym-{i}")).unwrap();
            assert!(seen.insert(id), "dense id {id} was reused");
            store.store(&db, &format!("sym-{i}"), &unit_vec(8, i % 8)).await.unwrap();
        }
        assert_eq!(seen.len(), 10);
    }
}
