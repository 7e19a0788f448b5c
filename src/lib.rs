//! Miller: a multi-language code-intelligence engine.
//!
//! Parses source with tree-sitter, extracts symbols and relationships
//! per language, persists them in a SQLite store, and serves fuzzy,
//! exact, type, and hybrid semantic search over the result.

pub mod config;
pub mod database;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod extractors;
pub mod hybrid;
pub mod indexer;
pub mod language;
pub mod parser;
pub mod search;
pub mod vectors;

pub use config::EngineConfig;
pub use engine::MillerEngine;
pub use error::{MillerError, Result};
