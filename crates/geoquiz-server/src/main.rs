use std::sync::Arc;

use geoquiz_countries::CountryProvider;
use geoquiz_room::{spawn_sweeper, CacheConfig, Hub, NoopAccountStore, RoomConfig, RoomStateCache};
use geoquiz_server::{GeoquizServer, ServerError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("GEOQUIZ_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    // No country table, no server.
    let countries = Arc::new(CountryProvider::embedded()?);
    let cache = Arc::new(RoomStateCache::new(CacheConfig::default()));
    spawn_sweeper(Arc::clone(&cache));

    let hub = Hub::new(
        RoomConfig::default(),
        countries,
        cache,
        Arc::new(NoopAccountStore),
    );
    let server = GeoquizServer::bind(&addr, hub).await?;
    server.run().await
}
