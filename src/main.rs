mod config;
mod error;
mod persona;
mod store;
mod web;

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::persona::PersonaResolver;
use crate::web::server::WebServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "grade-persona.toml".to_string());

    let config = Config::load(&config_path)?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log.filter.clone().into());
    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("🎓 grade-persona v{} starting...", env!("CARGO_PKG_VERSION"));
    if std::path::Path::new(&config_path).exists() {
        info!("Config loaded from {}", config_path);
    } else {
        info!("No config at {}, using defaults and environment", config_path);
    }

    let config = Arc::new(config);

    let store = store::connect(&config.database).await?;
    let query_timeout = config.database.query_timeout_ms.map(Duration::from_millis);
    if let Some(limit) = query_timeout {
        info!("Store lookups bounded to {:?}", limit);
    }
    let resolver = Arc::new(PersonaResolver::new(store, query_timeout));

    WebServer::new(resolver, config).run().await
}
