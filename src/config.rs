//! Engine configuration.
//!
//! Mirrors the config shape described in spec §6: everything the
//! public API's `initialize(config)` call accepts, with the same
//! defaults the coordinator and watcher fall back to when a field is
//! omitted from the workspace's `miller.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const MILLER_DIR: &str = ".miller";
pub const DB_FILE: &str = "db.sqlite";
pub const VECTORS_DIR: &str = "vectors";
pub const LOGS_DIR: &str = "logs";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub workspace_path: PathBuf,
    pub enable_watcher: bool,
    pub watcher_debounce_ms: u64,
    pub enable_semantic_search: bool,
    pub embedding_model: String,
    pub embedding_process_count: usize,
    pub batch_size: usize,
    pub ignore_dirs: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workspace_path: PathBuf::from("."),
            enable_watcher: true,
            watcher_debounce_ms: 100,
            enable_semantic_search: true,
            embedding_model: "tfidf-384".to_string(),
            embedding_process_count: num_cpus::get(),
            batch_size: 32,
            ignore_dirs: default_ignore_dirs(),
        }
    }
}

/// Default ignore list per spec §4.9: `.git`, `node_modules`, `dist`,
/// `build`, `coverage`, and any dotted directory (handled separately
/// by the discovery walker, not listed here).
pub fn default_ignore_dirs() -> Vec<String> {
    vec![
        ".git".to_string(),
        "node_modules".to_string(),
        "dist".to_string(),
        "build".to_string(),
        "coverage".to_string(),
    ]
}

impl EngineConfig {
    pub fn miller_dir(&self) -> PathBuf {
        self.workspace_path.join(MILLER_DIR)
    }

    pub fn db_path(&self) -> PathBuf {
        self.miller_dir().join(DB_FILE)
    }

    pub fn vectors_dir(&self) -> PathBuf {
        self.miller_dir().join(VECTORS_DIR)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.miller_dir().join(LOGS_DIR)
    }

    pub fn batch_size_clamped(&self) -> usize {
        self.batch_size.clamp(10, 100)
    }

    /// Load from `<workspace>/miller.toml` if present, otherwise defaults
    /// rooted at `workspace_path`.
    pub fn load_or_default(workspace_path: &Path) -> anyhow::Result<Self> {
        let toml_path = workspace_path.join("miller.toml");
        let mut config = if toml_path.exists() {
            let content = std::fs::read_to_string(&toml_path)?;
            toml::from_str(&content)?
        } else {
            EngineConfig::default()
        };
        config.workspace_path = workspace_path.to_path_buf();
        Ok(config)
    }
}
