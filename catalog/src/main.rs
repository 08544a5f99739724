use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use shelf_core::catalog::{extract_books_csv, load_catalog_csv};
use shelf_core::index::{IdfWeighting, TfidfConfig};
use shelf_core::{CatalogIndex, Recommendation};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "catalog")]
#[command(about = "Prepare and query the reference book catalog", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract books.csv from the dataset archive
    Extract {
        #[arg(long, default_value = "Books.zip")]
        archive: PathBuf,
        #[arg(long, default_value = "data/books_data/books.csv")]
        csv: PathBuf,
    },
    /// Report entry count and vocabulary size
    Stats {
        #[arg(long, default_value = "data/books_data/books.csv")]
        csv: PathBuf,
    },
    /// Print the best catalog match for a query as JSON
    Query {
        #[arg(long, default_value = "data/books_data/books.csv")]
        csv: PathBuf,
        /// Use ln(N/df) instead of the smoothed IDF
        #[arg(long, default_value_t = false)]
        plain_idf: bool,
        /// Use 1 + ln(tf) term frequencies
        #[arg(long, default_value_t = false)]
        sublinear_tf: bool,
        query: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract { archive, csv } => {
            if !extract_books_csv(&archive, &csv)? {
                bail!("no books.csv member in {}", archive.display());
            }
            println!("{}", csv.display());
            Ok(())
        }
        Commands::Stats { csv } => {
            let entries = load_catalog_csv(&csv)?;
            let index = CatalogIndex::build(entries);
            let stats = serde_json::json!({
                "entries": index.len(),
                "vocabulary": index.vocabulary_len(),
                "ready": index.is_ready(),
            });
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        Commands::Query { csv, plain_idf, sublinear_tf, query } => {
            let idf = if plain_idf { IdfWeighting::Plain } else { IdfWeighting::Smoothed };
            let index = CatalogIndex::build_with(load_catalog_csv(&csv)?, TfidfConfig { idf, sublinear_tf });
            let out = match index.recommend(&query) {
                Recommendation::Found { item, score } => serde_json::json!({ "match": item, "score": score }),
                other => {
                    tracing::info!(outcome = other.kind(), "no catalog match");
                    serde_json::json!({ "match": null, "outcome": other.kind() })
                }
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
    }
}
