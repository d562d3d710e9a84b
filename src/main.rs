//! JananiSetu - maternal health tracking backend

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use janani_setu::{config::Args, db::CareDb, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("janani_setu={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  JananiSetu - maternal health backend");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Database: {}", args.database_path.display());
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!(
        "CORS origin: {}",
        args.cors_origin().as_deref().unwrap_or("(none)")
    );
    info!("======================================");

    let db = match CareDb::open(&args.database_path) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let state = match server::AppState::new(args, db) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to initialize: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Loaded {} mother record(s)",
        state.care_read().map(|s| s.len()).unwrap_or(0)
    );

    if let Err(e) = server::run(state).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
