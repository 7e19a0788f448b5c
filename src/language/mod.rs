//! Grammar Registry (spec §2, §4.1).
//!
//! Owns the set of supported languages, their file-extension
//! associations, and a lazy cache of loaded `tree_sitter::Language`
//! values. A grammar that fails to load is marked unavailable and
//! logged — never fatal to the rest of the registry.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use tracing::warn;

#[derive(Debug, Clone)]
pub struct LanguageDescriptor {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
}

fn known_languages() -> Vec<LanguageDescriptor> {
    vec![
        LanguageDescriptor {
            name: "rust",
            extensions: &["rs"],
        },
        LanguageDescriptor {
            name: "typescript",
            extensions: &["ts", "tsx"],
        },
        LanguageDescriptor {
            name: "python",
            extensions: &["py", "pyi"],
        },
    ]
}

fn load_grammar(name: &str) -> Option<tree_sitter::Language> {
    match name {
        "rust" => Some(tree_sitter_rust::LANGUAGE.into()),
        "typescript" => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        "python" => Some(tree_sitter_python::LANGUAGE.into()),
        _ => None,
    }
}

/// Lazily-populated, read-mostly cache of loaded grammars, guarded by
/// a single-writer lock (spec §5, "Grammar cache").
pub struct LanguageRegistry {
    descriptors: Vec<LanguageDescriptor>,
    extension_index: HashMap<&'static str, &'static str>,
    cache: RwLock<HashMap<&'static str, tree_sitter::Language>>,
    failed: RwLock<Vec<String>>,
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageRegistry {
    pub fn new() -> Self {
        let descriptors = known_languages();
        let mut extension_index = HashMap::new();
        for d in &descriptors {
            for ext in d.extensions {
                extension_index.insert(*ext, d.name);
            }
        }
        Self {
            descriptors,
            extension_index,
            cache: RwLock::new(HashMap::new()),
            failed: RwLock::new(Vec::new()),
        }
    }

    /// Eagerly load every known grammar. Failures are recorded but
    /// never abort initialization (spec §4.1).
    pub fn initialize(&self) {
        for d in &self.descriptors {
            if let Err(name) = self.ensure_loaded(d.name) {
                warn!(language = %name, "grammar failed to load; marking unavailable");
            }
        }
    }

    fn ensure_loaded(&self, name: &'static str) -> Result<(), String> {
        if self.cache.read().unwrap().contains_key(name) {
            return Ok(());
        }
        match load_grammar(name) {
            Some(lang) => {
                self.cache.write().unwrap().insert(name, lang);
                Ok(())
            }
            None => {
                self.failed.write().unwrap().push(name.to_string());
                Err(name.to_string())
            }
        }
    }

    pub fn language_for_extension(&self, ext: &str) -> Option<&'static str> {
        self.extension_index.get(ext).copied()
    }

    pub fn detect_language(&self, path: &Path) -> Option<&'static str> {
        let ext = path.extension()?.to_str()?;
        self.language_for_extension(ext)
    }

    /// Fetch a cached grammar, lazily loading it on first use if
    /// `initialize()` was never called for this language.
    pub fn get_grammar(&self, name: &str) -> Option<tree_sitter::Language> {
        if let Some(g) = self.cache.read().unwrap().get(name) {
            return Some(g.clone());
        }
        let descriptor = self.descriptors.iter().find(|d| d.name == name)?;
        let _ = self.ensure_loaded(descriptor.name);
        self.cache.read().unwrap().get(descriptor.name).cloned()
    }

    pub fn supported_extensions(&self) -> Vec<&'static str> {
        let mut exts: Vec<_> = self.extension_index.keys().copied().collect();
        exts.sort_unstable();
        exts
    }

    pub fn supported_languages(&self) -> Vec<&'static str> {
        self.descriptors.iter().map(|d| d.name).collect()
    }

    pub fn is_file_supported(&self, path: &Path) -> bool {
        self.detect_language(path).is_some()
    }

    pub fn health(&self) -> (Vec<&'static str>, Vec<String>) {
        (
            self.cache.read().unwrap().keys().copied().collect(),
            self.failed.read().unwrap().clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn detects_by_extension() {
        let registry = LanguageRegistry::new();
        assert_eq!(registry.detect_language(&PathBuf::from("a.ts")), Some("typescript"));
        assert_eq!(registry.detect_language(&PathBuf::from("a.py")), Some("python"));
        assert_eq!(registry.detect_language(&PathBuf::from("a.go")), None);
    }

    #[test]
    fn initialize_never_panics_on_unknown_grammar() {
        let registry = LanguageRegistry::new();
        registry.initialize();
        let (loaded, _failed) = registry.health();
        assert!(loaded.contains(&"rust"));
    }
}
