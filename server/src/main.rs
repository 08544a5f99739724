use anyhow::Result;
use clap::Parser;
use shelf_core::index::{IdfWeighting, TfidfConfig};
use shelf_server::{build_app, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Base directory for the review database and uploads
    #[arg(long, env = "SHELF_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,
    /// Keep reviews in memory instead of the on-disk store
    #[arg(long, default_value_t = false)]
    in_memory: bool,
    /// Catalog CSV (defaults to <data-dir>/data/books_data/books.csv)
    #[arg(long, env = "SHELF_CATALOG")]
    catalog: Option<PathBuf>,
    /// Archive to extract the catalog from when the CSV is missing (defaults to <data-dir>/Books.zip)
    #[arg(long, env = "SHELF_CATALOG_ARCHIVE")]
    catalog_archive: Option<PathBuf>,
    /// Use ln(N/df) instead of the smoothed IDF
    #[arg(long, default_value_t = false)]
    plain_idf: bool,
    /// Directory with index.html and static assets
    #[arg(long, env = "SHELF_STATIC_DIR")]
    static_dir: Option<PathBuf>,
    /// Host to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let idf = if self.plain_idf { IdfWeighting::Plain } else { IdfWeighting::Smoothed };
        ServerConfig {
            db_path: (!self.in_memory).then(|| self.data_dir.join("reviews.db")),
            catalog_csv: self.catalog.unwrap_or_else(|| self.data_dir.join("data/books_data/books.csv")),
            catalog_archive: Some(self.catalog_archive.unwrap_or_else(|| self.data_dir.join("Books.zip"))),
            tfidf: TfidfConfig { idf, sublinear_tf: false },
            uploads_dir: self.data_dir.join("uploads"),
            static_dir: self.static_dir,
            cors_allow_origin: std::env::var("CORS_ALLOW_ORIGIN").ok(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let app = build_app(&args.into_config())?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
