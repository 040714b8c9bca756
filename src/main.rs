use library_catalog::config::Config;
use library_catalog::database::{SqliteAuthorRepository, SqliteBookRepository, establish_pool};
use library_catalog::http::{AppState, HttpServer, HttpServerConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = establish_pool(config.database_url(), config.database_max_connections()).await?;
    let state = AppState::new(
        Arc::new(SqliteAuthorRepository::new(pool.clone())),
        Arc::new(SqliteBookRepository::new(pool)),
    );
    let server_config = HttpServerConfig::new(config.server_port());
    let http_server = HttpServer::new(state, server_config).await?;
    http_server.run().await
}
