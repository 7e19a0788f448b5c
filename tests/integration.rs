//! End-to-end coverage of `MillerEngine`'s public API against the
//! scenarios a single workspace walks through: index, re-index
//! unchanged, modify, cross-layer search, and health/stats reporting.

use miller::config::EngineConfig;
use miller::engine::{QueryMode, QueryOptions};
use miller::MillerEngine;

async fn engine_for(dir: &std::path::Path) -> MillerEngine {
    let config = EngineConfig {
        workspace_path: dir.to_path_buf(),
        enable_watcher: false,
        ..EngineConfig::default()
    };
    MillerEngine::initialize(config).await.unwrap()
}

/// S1 — fuzzy search finds camelCase and snake_case via a shared token.
#[tokio::test]
async fn fuzzy_search_finds_camel_and_snake_case() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.ts"), "function getUserData() {}").unwrap();
    std::fs::write(dir.path().join("b.py"), "def get_user_data():\n    pass").unwrap();

    let engine = engine_for(dir.path()).await;
    engine.index_workspace().await.unwrap();

    let outcome = engine.search_code("data", &QueryOptions::default()).await.unwrap();
    assert!(!outcome.partial);
    let names: Vec<_> = outcome.results.iter().map(|r| r.symbol.name.as_str()).collect();
    assert!(names.contains(&"getUserData"));
    assert!(names.contains(&"get_user_data"));
}

/// S3 — indexing unchanged bytes a second time leaves the symbol count
/// untouched and reports the file as skipped.
#[tokio::test]
async fn delta_skip_leaves_symbol_count_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("x.ts"), "function hello() {}").unwrap();
    let engine = engine_for(dir.path()).await;

    let first = engine.index_workspace().await.unwrap();
    assert_eq!(first.files_processed, 1);
    let stats_after_first = engine.get_workspace_stats().await.unwrap();

    let second = engine.index_workspace().await.unwrap();
    assert_eq!(second.files_skipped, 1);
    assert_eq!(second.files_processed, 0);
    let stats_after_second = engine.get_workspace_stats().await.unwrap();
    assert_eq!(stats_after_first.total_symbols, stats_after_second.total_symbols);
}

/// S4 — a modified file has its old symbols replaced, not duplicated.
#[tokio::test]
async fn modified_file_replaces_symbols_without_duplication() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("x.ts");
    std::fs::write(&file, "function hello() {}").unwrap();
    let engine = engine_for(dir.path()).await;
    engine.index_workspace().await.unwrap();

    std::fs::write(&file, "function hello() {}\nfunction world() {}").unwrap();
    let outcome = engine.index_file(&file).await.unwrap();
    assert!(!outcome.skipped);
    assert_eq!(outcome.symbols_indexed, 2);

    let stats = engine.get_workspace_stats().await.unwrap();
    assert_eq!(stats.total_symbols, 2);
}

/// S5 — symbols named after one entity across several layered
/// directories all surface under cross-layer hybrid search.
#[tokio::test]
async fn cross_layer_search_surfaces_multiple_layers() {
    let dir = tempfile::tempdir().unwrap();
    let layout = [
        ("types/user.ts", "interface User {}"),
        ("api/DTOs/user_dto.ts", "class User {}"),
        ("domain/entities/user.ts", "class User {}"),
        ("database/migrations/001_user.ts", "class User {}"),
    ];
    for (relative, content) in layout {
        let path = dir.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    let engine = engine_for(dir.path()).await;
    engine.index_workspace().await.unwrap();

    let options = QueryOptions {
        mode: QueryMode::CrossLayer,
        max_results: 10,
        ..QueryOptions::default()
    };
    let outcome = engine.hybrid_search("User", &options).await.unwrap();
    let layers: std::collections::HashSet<_> = outcome.results.iter().filter_map(|r| r.layer).collect();
    assert!(layers.len() >= 3, "expected symbols from several layers, got {layers:?}");
}

/// Property 7 — hybrid results are sorted by score descending.
#[tokio::test]
async fn hybrid_search_is_sorted_descending() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("a.ts"),
        "function getUserData() {}\nfunction listUsers() {}\nfunction unrelated() {}",
    )
    .unwrap();
    let engine = engine_for(dir.path()).await;
    engine.index_workspace().await.unwrap();

    let outcome = engine.hybrid_search("getUserData", &QueryOptions::default()).await.unwrap();
    for pair in outcome.results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn health_check_reports_loaded_parsers_and_store_counts() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();
    let engine = engine_for(dir.path()).await;
    engine.index_workspace().await.unwrap();

    let health = engine.health_check().await.unwrap();
    assert!(health.parsers.loaded.contains(&"rust"));
    assert_eq!(health.store.total_files, 1);
}

#[tokio::test]
async fn unsupported_files_are_skipped_across_a_mixed_workspace() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();
    std::fs::write(dir.path().join("notes.md"), "# not code").unwrap();
    let engine = engine_for(dir.path()).await;

    let summary = engine.index_workspace().await.unwrap();
    assert_eq!(summary.files_processed, 1);
    assert_eq!(summary.files_skipped, 1);
}
