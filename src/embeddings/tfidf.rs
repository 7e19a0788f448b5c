//! Default TF-IDF embedder (spec §4.5). Shares the exact tokenizer
//! used by the text search engine and keeps document-frequency state
//! behind a `parking_lot::RwLock` so the indexer's writers and the
//! query path's readers always observe the same vocabulary.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{EmbedContext, EmbeddingOutput, Embedder, EMBEDDING_DIMENSIONS};
use crate::error::Result;
use crate::search::tokenizer::tokenize;

/// `term -> (document_frequency, idf_weight)`, plus corpus-wide state.
/// `version` increments every time a document is folded in, so a
/// caller holding a cached query vector can detect staleness.
#[derive(Debug, Default)]
pub struct Vocabulary {
    document_frequency: HashMap<String, u64>,
    idf_weight: HashMap<String, f64>,
    total_documents: u64,
    version: u64,
}

impl Vocabulary {
    pub fn total_documents(&self) -> u64 {
        self.total_documents
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn term_count(&self) -> usize {
        self.document_frequency.len()
    }

    /// Fold one document's unique terms into the corpus state. Returns
    /// how many terms were newly seen (the `vocabulary_delta`).
    fn record_document(&mut self, terms: &[String]) -> usize {
        self.total_documents += 1;
        let mut new_terms = 0;
        let mut touched: Vec<&str> = Vec::with_capacity(terms.len());
        for term in terms {
            let df = self.document_frequency.entry(term.clone()).or_insert(0);
            if *df == 0 {
                new_terms += 1;
            }
            *df += 1;
            touched.push(term.as_str());
        }
        for term in touched {
            let df = self.document_frequency[term];
            self.idf_weight.insert(term.to_string(), self.idf_for(df));
        }
        self.version += 1;
        new_terms
    }

    /// Smoothed idf: `ln((1 + N) / (1 + df)) + 1`, always positive and
    /// defined even for `df = 0` (an as-yet-unseen term).
    fn idf_for(&self, df: u64) -> f64 {
        ((1.0 + self.total_documents as f64) / (1.0 + df as f64)).ln() + 1.0
    }

    fn idf(&self, term: &str) -> f64 {
        self.idf_weight
            .get(term)
            .copied()
            .unwrap_or_else(|| self.idf_for(0))
    }
}

pub struct TfIdfEmbedder {
    vocabulary: RwLock<Vocabulary>,
    dimensions: usize,
    model_name: RwLock<String>,
}

impl Default for TfIdfEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl TfIdfEmbedder {
    pub fn new() -> Self {
        Self {
            vocabulary: RwLock::new(Vocabulary::default()),
            dimensions: EMBEDDING_DIMENSIONS,
            model_name: RwLock::new("tfidf-384".to_string()),
        }
    }

    pub fn vocabulary_snapshot(&self) -> (u64, usize, u64) {
        let vocab = self.vocabulary.read();
        (vocab.total_documents(), vocab.term_count(), vocab.version())
    }

    fn term_frequencies(tokens: &[String]) -> HashMap<&str, u32> {
        let mut tf = HashMap::new();
        for token in tokens {
            *tf.entry(token.as_str()).or_insert(0) += 1;
        }
        tf
    }

    /// Deterministic hash-into-`[0, D)`-with-sign projection (spec
    /// §4.5): every term maps to exactly one dimension and a fixed
    /// sign, so the same term always nudges the same axis the same
    /// way across documents and queries.
    fn project(&self, weighted_terms: &HashMap<&str, f64>) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for (term, weight) in weighted_terms {
            let hash = blake3::hash(term.as_bytes());
            let bytes = hash.as_bytes();
            let index = (u64::from_le_bytes(bytes[0..8].try_into().unwrap()) as usize) % self.dimensions;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign * *weight as f32;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }

    fn tokens_for(snippet: &str, context: &EmbedContext) -> Vec<String> {
        let mut tokens = tokenize(snippet);
        if let Some(language) = &context.language {
            tokens.extend(tokenize(language));
        }
        if let Some(path) = &context.file_path {
            for segment in path.split(['/', '\\']) {
                tokens.extend(tokenize(segment));
            }
        }
        tokens
    }
}

impl Embedder for TfIdfEmbedder {
    fn initialize(&self, model_name: &str) -> Result<()> {
        *self.model_name.write() = model_name.to_string();
        Ok(())
    }

    fn embed_code(&self, snippet: &str, context: &EmbedContext) -> Result<EmbeddingOutput> {
        let tokens = Self::tokens_for(snippet, context);
        let tf = Self::term_frequencies(&tokens);
        let unique_terms: Vec<String> = tf.keys().map(|t| t.to_string()).collect();

        let mut vocab = self.vocabulary.write();
        let vocabulary_delta = vocab.record_document(&unique_terms);

        let doc_len = tokens.len().max(1) as f64;
        let weighted: HashMap<&str, f64> = tf
            .iter()
            .map(|(term, count)| {
                let tf_weight = *count as f64 / doc_len;
                (*term, tf_weight * vocab.idf(term))
            })
            .collect();

        Ok(EmbeddingOutput {
            vector: self.project(&weighted),
            vocabulary_delta,
        })
    }

    fn embed_query(&self, text: &str) -> Result<EmbeddingOutput> {
        let tokens = tokenize(text);
        let tf = Self::term_frequencies(&tokens);
        let doc_len = tokens.len().max(1) as f64;

        let vocab = self.vocabulary.read();
        let weighted: HashMap<&str, f64> = tf
            .iter()
            .map(|(term, count)| {
                let tf_weight = *count as f64 / doc_len;
                (*term, tf_weight * vocab.idf(term))
            })
            .collect();

        Ok(EmbeddingOutput {
            vector: self.project(&weighted),
            vocabulary_delta: 0,
        })
    }

    fn clear_cache(&self) {
        *self.vocabulary.write() = Vocabulary::default();
    }

    fn vocabulary_version(&self) -> u64 {
        self.vocabulary.read().version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l2_norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn embed_code_produces_unit_length_vector() {
        let embedder = TfIdfEmbedder::new();
        let out = embedder
            .embed_code("fn get_user_data() {}", &EmbedContext::default())
            .unwrap();
        assert_eq!(out.vector.len(), EMBEDDING_DIMENSIONS);
        assert!((l2_norm(&out.vector) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn query_and_corpus_share_nonzero_similarity() {
        let embedder = TfIdfEmbedder::new();
        embedder
            .embed_code("fn get_user_data() {}", &EmbedContext::default())
            .unwrap();
        let query = embedder.embed_query("get user data").unwrap();
        let corpus = embedder
            .embed_code("fn get_user_data() {}", &EmbedContext::default())
            .unwrap();

        let dot: f32 = query
            .vector
            .iter()
            .zip(corpus.vector.iter())
            .map(|(a, b)| a * b)
            .sum();
        assert!(dot > 0.0, "expected nonzero cosine similarity, got {dot}");
    }

    #[test]
    fn version_bumps_on_each_document() {
        let embedder = TfIdfEmbedder::new();
        let before = embedder.vocabulary_version();
        embedder
            .embed_code("fn foo() {}", &EmbedContext::default())
            .unwrap();
        assert!(embedder.vocabulary_version() > before);
    }

    #[test]
    fn clear_cache_resets_vocabulary() {
        let embedder = TfIdfEmbedder::new();
        embedder
            .embed_code("fn foo() {}", &EmbedContext::default())
            .unwrap();
        embedder.clear_cache();
        let (total_documents, terms, version) = embedder.vocabulary_snapshot();
        assert_eq!(total_documents, 0);
        assert_eq!(terms, 0);
        assert_eq!(version, 0);
    }
}
