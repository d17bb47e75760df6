use std::sync::Arc;
use tracing::info;
use tracing_subscriber::FmtSubscriber;
use zkmail_rs::api::ApiServer;
use zkmail_rs::config::Config;
use zkmail_rs::storage::SqliteStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = if std::path::Path::new("config.toml").exists() {
        Config::from_file("config.toml")?
    } else {
        Config::default()
    };

    // Initialize logging
    let level = config
        .logging
        .level
        .parse()
        .unwrap_or(tracing::Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .pretty()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("Starting zkmail-rs server");
    info!("  Listening on: {}", config.server.listen_addr);
    info!("  Service domain: {}", config.server.domain);
    info!("  Mail-exchange identity: {}", config.server.mx_host);
    info!("  Database: {}", config.storage.database_url);

    let config = Arc::new(config);
    let store = Arc::new(SqliteStore::new(&config.storage.database_url).await?);

    let server = ApiServer::new(Arc::clone(&config), store);
    server.run().await?;

    Ok(())
}
