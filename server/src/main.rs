use anyhow::Result;
use axum::Router;
use clap::Parser;
use neardup_core::{IdfMode, SimilarityConfig};
use neardup_server::build_app_from_dir;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Data directory (sled database with documents and similarity cache)
    #[arg(long, default_value = "./data")]
    data: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Minimum similarity score for duplicates (overrides MATCHING_THRESHOLD)
    #[arg(long)]
    threshold: Option<f64>,
    /// Use smoothed IDF = ln(1 + N/df) instead of ln(N/df)
    #[arg(long, default_value_t = false)]
    smoothed_idf: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let mut config = SimilarityConfig::from_env();
    if let Some(t) = args.threshold {
        config = config.with_threshold(t);
    }
    if args.smoothed_idf {
        config = config.with_idf(IdfMode::Smoothed);
    }
    tracing::info!(threshold = config.matching_threshold, idf = ?config.idf, data = %args.data, "starting");

    // Index is fully built before the listener accepts connections
    let app: Router = build_app_from_dir(&args.data, config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
