use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use sift::content::ContentStore;
use sift::output::{print_page, print_stats};
use sift::{IndexableDocument, MemoryContentStore, SearchConfig, SearchEngine};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Persistent full-text index and keyword search for content modules")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to config.json in the app data directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured index directory
    #[arg(short, long, global = true)]
    index: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the index entries of one module from a content file
    Reindex {
        /// JSON array of content records
        #[arg(long)]
        content: PathBuf,

        /// Module to reindex
        #[arg(short, long)]
        module: String,
    },
    /// Search one module
    Search {
        /// Keyword, classic query syntax
        keyword: String,

        /// Module to search in
        #[arg(short, long)]
        module: String,

        /// Page number, 1-based (omit for the unpaged top hits)
        #[arg(short, long)]
        page: Option<usize>,

        /// Hits per page
        #[arg(short, long, default_value_t = 10)]
        size: usize,

        /// Content file used to resolve hits
        #[arg(long)]
        content: Option<PathBuf>,
    },
    /// Add or replace one record
    Add {
        /// JSON array of content records
        #[arg(long)]
        content: PathBuf,

        /// Record id
        id: u64,
    },
    /// Delete a document by id
    Delete {
        /// Document id
        id: String,
    },
    /// Show index statistics
    Stats,
    /// Merge all segments and drop deleted documents
    Compact,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => SearchConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => SearchConfig::load().context("failed to load config")?,
    };
    if let Some(index) = &cli.index {
        config.index_path = index.clone();
    }

    match cli.command {
        Commands::Reindex { content, module } => {
            let engine = open_engine(config, load_content(&content)?)?;
            let report = engine
                .reindex_module(&module)
                .with_context(|| format!("failed to reindex module {module}"))?;
            println!(
                "Reindexed {} records of '{}' in {:.2}s",
                report.indexed,
                report.module,
                report.elapsed.as_secs_f64()
            );
        }
        Commands::Search {
            keyword,
            module,
            page,
            size,
            content,
        } => {
            let store = match content {
                Some(path) => load_content(&path)?,
                None => MemoryContentStore::new(),
            };
            let engine = open_engine(config, store)?;
            let results = match page {
                Some(page) => engine.search_page(&keyword, &module, page, size),
                None => engine.search(&keyword, &module),
            }
            .with_context(|| format!("search for {keyword:?} failed"))?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_page(&results, !cli.no_color)?;
            }
        }
        Commands::Add { content, id } => {
            let store = load_content(&content)?;
            let Some(record) = store.find_by_id(id)? else {
                bail!("record {id} not found in {}", content.display());
            };
            let engine = open_engine(config, store)?;
            engine
                .add_bean(&IndexableDocument::from_content(&record))
                .with_context(|| format!("failed to index record {id}"))?;
            println!("Indexed record {id}");
        }
        Commands::Delete { id } => {
            let engine = open_engine(config, MemoryContentStore::new())?;
            engine
                .delete_bean(&id)
                .with_context(|| format!("failed to delete {id}"))?;
            println!("Deleted {id}");
        }
        Commands::Stats => {
            let path = config.resolved_index_path();
            let engine = open_engine(config, MemoryContentStore::new())?;
            let stats = engine.stats().context("failed to read index statistics")?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&path, &stats, !cli.no_color)?;
            }
        }
        Commands::Compact => {
            let engine = open_engine(config, MemoryContentStore::new())?;
            let info = engine.compact().context("failed to compact index")?;
            if info.merged {
                println!(
                    "Compacted into {} segment(s), {} live documents",
                    info.segments, info.live_docs
                );
            } else {
                println!("Nothing to compact");
            }
        }
    }

    Ok(())
}

fn load_content(path: &Path) -> Result<MemoryContentStore> {
    MemoryContentStore::load_json(path)
        .with_context(|| format!("failed to load content from {}", path.display()))
}

fn open_engine(
    config: SearchConfig,
    content: MemoryContentStore,
) -> Result<SearchEngine<MemoryContentStore>> {
    let path = config.resolved_index_path();
    let engine = SearchEngine::new(config, content);
    engine
        .init()
        .with_context(|| format!("failed to open index at {}", path.display()))?;
    Ok(engine)
}
