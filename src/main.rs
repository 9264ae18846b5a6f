// src/main.rs
use std::sync::Arc;

use env_logger::Builder;
use log::{error, info, LevelFilter};
use warp::Filter;

use dividend_tracker::api;
use dividend_tracker::config::Config;
use dividend_tracker::db;
use dividend_tracker::error;
use dividend_tracker::sync::SnapshotHub;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    Builder::new()
        .filter_level(LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };

    let session = match db::init(&config).await {
        Ok(session) => Arc::new(session),
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return;
        }
    };
    info!("Connected to database...");

    let hub = Arc::new(SnapshotHub::new());
    let api = api::routes(session, hub, config.clone()).recover(error::handle_rejection);

    info!("Server running on http://{}", config.bind_addr);
    warp::serve(api).run(config.bind_addr).await;
}
