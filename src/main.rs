//! Thin CLI front-end over `MillerEngine` (spec §6).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use miller::config::EngineConfig;
use miller::engine::{QueryMode, QueryOptions};
use miller::{MillerEngine, MillerError};

#[derive(Parser)]
#[command(name = "miller", about = "Multi-language code intelligence engine")]
struct Cli {
    /// Workspace root to operate on.
    #[arg(long, global = true, default_value = ".")]
    workspace: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index every supported file under the workspace.
    Index,
    /// Fuzzy/exact structural search over indexed symbols.
    Search {
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        language: Option<String>,
    },
    /// Embedding-based semantic search.
    Semantic {
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Blended structural + semantic search, optionally cross-layer.
    Hybrid {
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        cross_layer: bool,
    },
    /// Print workspace symbol/embedding statistics.
    Stats,
    /// Index once, then watch for changes until interrupted.
    Watch,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "command failed");
            eprintln!("error: {err}");
            exit_code_for(&err)
        }
    }
}

fn exit_code_for(err: &MillerError) -> ExitCode {
    match err {
        MillerError::UnsupportedLanguage { .. } | MillerError::ParseError { .. } => ExitCode::from(2),
        MillerError::PermissionDenied { .. } | MillerError::IOError { .. } => ExitCode::from(3),
        MillerError::Cancelled => ExitCode::from(4),
        _ => ExitCode::FAILURE,
    }
}

async fn run(cli: Cli) -> miller::Result<()> {
    let config = EngineConfig::load_or_default(&cli.workspace).map_err(|err| MillerError::IOError {
        path: cli.workspace.clone(),
        source: std::io::Error::other(err.to_string()),
    })?;
    let engine = MillerEngine::initialize(config).await?;

    match cli.command {
        Command::Index => {
            let summary = engine.index_workspace().await?;
            println!(
                "indexed {} files ({} skipped, {} symbols, {} diagnostics)",
                summary.files_processed,
                summary.files_skipped,
                summary.symbols_indexed,
                summary.diagnostics.len()
            );
            for diagnostic in &summary.diagnostics {
                println!("  warning: {}", diagnostic.message);
            }
        }
        Command::Search { query, limit, language } => {
            let options = QueryOptions {
                max_results: limit,
                language,
                ..QueryOptions::default()
            };
            let outcome = engine.search_code(&query, &options).await?;
            print_results(&outcome);
        }
        Command::Semantic { query, limit } => {
            let options = QueryOptions {
                max_results: limit,
                ..QueryOptions::default()
            };
            let outcome = engine.semantic_search(&query, &options).await?;
            print_results(&outcome);
        }
        Command::Hybrid { query, limit, cross_layer } => {
            let options = QueryOptions {
                max_results: limit,
                mode: if cross_layer { QueryMode::CrossLayer } else { QueryMode::Default },
                ..QueryOptions::default()
            };
            let outcome = engine.hybrid_search(&query, &options).await?;
            print_results(&outcome);
        }
        Command::Stats => {
            let stats = engine.get_workspace_stats().await?;
            println!("files: {}", stats.total_files);
            println!("symbols: {}", stats.total_symbols);
            println!("languages: {}", stats.languages.join(", "));
            println!(
                "semantic search: {} ({} embeddings, {:.0}% complete)",
                stats.semantic.semantic_search_available,
                stats.semantic.total_embeddings,
                stats.semantic.embedding_progress * 100.0
            );
        }
        Command::Watch => {
            engine.index_workspace().await?;
            println!("watching for changes, press Ctrl+C to stop");
            tokio::signal::ctrl_c().await.ok();
            engine.shutdown().await?;
        }
    }

    Ok(())
}

fn print_results(outcome: &miller::engine::QueryOutcome) {
    if outcome.partial {
        println!("(partial results — query timed out)");
    }
    for result in &outcome.results {
        let layer = result
            .layer
            .map(|l| format!(" [{l:?}]"))
            .unwrap_or_default();
        println!(
            "{:.3}  {}  {}{}  {}",
            result.score,
            result.symbol.kind.as_str(),
            result.symbol.name,
            layer,
            result.symbol.file_path,
        );
    }
}
