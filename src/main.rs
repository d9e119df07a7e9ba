mod core;
mod storage;
mod web;

use anyhow::Result;
use tracing::{error, info};

use crate::core::app::App;
use crate::core::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forum_api=info,tower_http=info".into()),
        )
        .init();

    info!("Starting forum API");

    // Load configuration
    let config = Config::load().await?;

    // Initialize the application
    let app = App::new(config).await?;

    // Start the application
    if let Err(e) = app.run().await {
        error!("Application error: {}", e);
        return Err(e);
    }

    Ok(())
}
