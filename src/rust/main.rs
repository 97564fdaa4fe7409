use clap::Parser;
use log::info;
use triage::{bootstrap, init_logger, ServiceConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real environment variables still apply
    dotenvy::dotenv().ok();
    init_logger();
    let config = ServiceConfig::parse();

    info!("=== Starting Text Classification Service ===");
    bootstrap::run(config).await?;
    Ok(())
}
