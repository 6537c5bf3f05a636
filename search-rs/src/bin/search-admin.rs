//! Maintenance tool for the search index and property schema
//!
//! # Usage
//!
//! ```bash
//! # Validate a property group schema
//! search-admin check-schema property-groups.toml
//!
//! # Run a raw statement against the index
//! search-admin --config search.toml query "budget AND draft" --limit 20
//!
//! # Show index statistics
//! search-admin --config search.toml stats
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use search_rs::executor::normalize_score;
use search_rs::index::{EntityIndexer, IndexRequest, SearchIndex};
use search_rs::schema::parse_schema;
use search_rs::scope::ROOT_PATH;
use search_rs::{logging, Config};

#[derive(Parser)]
#[command(name = "search-admin")]
#[command(about = "Inspect the search index and property schema", long_about = None)]
struct Cli {
    /// Configuration file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a property group schema and list its fields
    CheckSchema {
        /// Schema file
        file: PathBuf,
    },
    /// Run a raw statement under the main hierarchy
    Query {
        /// Statement in index query syntax
        statement: String,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show index statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::default(),
    };
    logging::init(&config.logging)?;

    match cli.command {
        Commands::CheckSchema { file } => {
            let body = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;

            let schema = match parse_schema(&body) {
                Ok(schema) => schema,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            for group in schema.groups() {
                println!("{} ({})", group.name, group.label);
                for field in &group.fields {
                    println!("  {:<40} {:?}", field.name, field.field_type);
                }
            }
            println!(
                "\n✓ {} group(s), {} field(s)",
                schema.groups().len(),
                schema.field_count()
            );
        }
        Commands::Query {
            statement,
            offset,
            limit,
        } => {
            let indexer = open_index(&config)?;
            let limit = config.search.page_size(limit);
            let request = IndexRequest::Raw {
                statement,
                context: Some(ROOT_PATH.trim_start_matches('/').to_string()),
            };

            let page = indexer.search(&request, offset, limit).await?;

            if page.hits.is_empty() {
                println!("No hits.");
            } else {
                println!("{:<40} {:>5}  {}", "Entity", "Score", "Excerpt");
                println!("{:-<80}", "");
                for hit in &page.hits {
                    println!(
                        "{:<40} {:>5}  {}",
                        hit.entity_id,
                        normalize_score(hit.score),
                        hit.excerpt.as_deref().unwrap_or("")
                    );
                }
            }
            println!("\nTotal: {} match(es)", page.total);
        }
        Commands::Stats => {
            let stats = open_index(&config)?.stats();
            println!("Documents: {}", stats.document_count);
            println!("Segments:  {}", stats.segment_count);
        }
    }

    Ok(())
}

fn open_index(config: &Config) -> anyhow::Result<EntityIndexer> {
    let indexer = EntityIndexer::open(Path::new(&config.index.path), config.index.writer_heap_bytes)
        .with_context(|| format!("opening index at {}", config.index.path))?
        .with_excerpt_length(config.search.excerpt_length);
    Ok(indexer)
}
