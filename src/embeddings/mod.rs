//! Embedder interface (spec §4.5): pluggable, with TF-IDF as the
//! default implementation in `tfidf.rs`.

pub mod tfidf;

pub use tfidf::{TfIdfEmbedder, Vocabulary};

use crate::error::Result;

/// Fixed output dimensionality for the default embedder (spec §4.5).
pub const EMBEDDING_DIMENSIONS: usize = 384;

#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub vector: Vec<f32>,
    /// Number of new terms this call added to the shared vocabulary,
    /// i.e. how much the vocabulary state moved — callers use this to
    /// decide whether a batch needs a version check before re-reading
    /// cached query vectors.
    pub vocabulary_delta: usize,
}

/// Any replacement embedder must expose this interface and guarantee
/// cross-thread vocabulary consistency (spec §4.5).
pub trait Embedder: Send + Sync {
    fn initialize(&self, model_name: &str) -> Result<()>;

    fn embed_code(&self, snippet: &str, context: &EmbedContext) -> Result<EmbeddingOutput>;

    fn embed_query(&self, text: &str) -> Result<EmbeddingOutput>;

    fn clear_cache(&self);

    /// Current vocabulary version; a mismatch against the version a
    /// cached query vector was embedded under means the caller should
    /// re-embed (spec §4.5).
    fn vocabulary_version(&self) -> u64;
}

/// Extra terms mixed into a snippet's token stream before embedding:
/// language name and path segments (spec §4.5, "augmented with
/// language- and path-hinted extra terms").
#[derive(Debug, Clone, Default)]
pub struct EmbedContext {
    pub language: Option<String>,
    pub file_path: Option<String>,
}
