use anyhow::Result;
use axum::Router;
use clap::Parser;
use quarry_core::scoring::IdfMode;
use quarry_core::SearchConfig;
use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};
use server::build_app;
use tokio::net::TcpListener;

#[derive(Parser)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Score multiplier for exact phrase matches
    #[arg(long, default_value_t = 1.5)]
    phrase_boost: f64,
    /// Display rescaling applied to every score
    #[arg(long, default_value_t = 1.0)]
    score_scale: f64,
    /// Use smoothed IDF = ln(1 + N/df) instead of ln(N/df)
    #[arg(long, default_value_t = false)]
    smoothed_idf: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = SearchConfig {
        phrase_boost: args.phrase_boost,
        score_scale: args.score_scale,
        idf_mode: if args.smoothed_idf { IdfMode::Smoothed } else { IdfMode::Standard },
        ..Default::default()
    };
    let app: Router = build_app(args.index.clone(), config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
