//! Sluice - water-use permit portal backend

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sluice::{
    auth::verification::spawn_sweep_task,
    config::Args,
    db::MongoClient,
    server::{self, AppState},
    store::Stores,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("sluice={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Missing store endpoint or secret fails here, not mid-request
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Sluice - Water Permit Portal");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Permit lookahead: {} days", args.permit_lookahead_days);
    info!("Review SLA: {} days", args.review_sla_days);
    info!("======================================");

    // Connect to MongoDB (optional in dev mode)
    let state = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(mongo) => {
            let stores = Stores::init(&mongo, args.review_sla_days).await?;
            info!("MongoDB connected, collections indexed");
            AppState::with_stores(args, mongo, stores)?
        }
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB connection failed (dev mode, continuing without): {}", e);
                AppState::new(args)?
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    let state = Arc::new(state);

    // Expired verification codes are swept every minute
    spawn_sweep_task(
        Arc::clone(&state.verification),
        std::time::Duration::from_secs(60),
    );

    server::run(state).await?;

    Ok(())
}
