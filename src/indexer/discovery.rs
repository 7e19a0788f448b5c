//! Ignore-list-aware recursive walk (spec §4.9). Only files whose
//! extension the grammar registry recognizes are emitted.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::language::LanguageRegistry;

/// Recursively walk `root`, honoring `.gitignore` plus `extra_ignores`
/// (directory names, matched against any path segment) in addition to
/// any dotted directory, and emitting only files the registry can
/// parse.
pub fn discover_files(root: &Path, registry: &LanguageRegistry, extra_ignores: &[String]) -> Vec<PathBuf> {
    let mut builder = WalkBuilder::new(root);
    builder.hidden(false).git_ignore(true).git_exclude(true);

    let mut walker = builder.build();
    let mut out = Vec::new();
    while let Some(entry) = walker.next() {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.path();
        if is_ignored(path, root, extra_ignores) {
            continue;
        }
        if registry.is_file_supported(path) {
            out.push(path.to_path_buf());
        }
    }
    out
}

fn is_ignored(path: &Path, root: &Path, extra_ignores: &[String]) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.components().any(|component| {
        let segment = component.as_os_str().to_string_lossy();
        segment.starts_with('.') || extra_ignores.iter().any(|ignored| ignored == segment.as_ref())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_supported_files_and_skips_ignored_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();
        fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules/vendored.rs"), "fn x() {}").unwrap();
        fs::write(dir.path().join("notes.txt"), "irrelevant").unwrap();

        let registry = LanguageRegistry::new();
        registry.initialize();
        let found = discover_files(dir.path(), &registry, &crate::config::default_ignore_dirs());

        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("a.rs"));
    }

    #[test]
    fn skips_dotted_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".miller")).unwrap();
        fs::write(dir.path().join(".miller/cache.rs"), "fn x() {}").unwrap();
        fs::write(dir.path().join("b.py"), "def f(): pass").unwrap();

        let registry = LanguageRegistry::new();
        registry.initialize();
        let found = discover_files(dir.path(), &registry, &crate::config::default_ignore_dirs());

        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("b.py"));
    }
}
