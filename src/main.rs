use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod aws_clients;
mod config;
mod domain;
mod errors;
mod handlers;
mod joke_source;
mod models;
mod repositories;
mod routes;
mod service;
mod startup;

use crate::config::{Config, StoreBackend};
use crate::domain::JokeRepository;
use crate::errors::AppError;
use crate::joke_source::HttpJokeSource;
use crate::repositories::{DynamoDbJokeRepository, InMemoryJokeRepository};
use crate::service::JokeProvider;

/// AppState holds shared resources for the web server.
pub struct AppState {
    pub provider: JokeProvider,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "joke_cache_service=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = Arc::new(Config::load()?);
    tracing::info!(
        version = %config.version,
        environment = %config.environment,
        store = ?config.store_backend,
        "Starting joke cache service"
    );

    // --- Joke Store ---
    let repo: Arc<dyn JokeRepository> = match config.store_backend {
        StoreBackend::DynamoDb => {
            tracing::info!("Initializing AWS DynamoDB client...");
            let sdk_config = aws_clients::create_sdk_config(&config).await;
            let db_client = aws_clients::create_dynamodb_client(&sdk_config);
            startup::init_resources(&db_client, &config.jokes_table_name).await?;
            Arc::new(DynamoDbJokeRepository::new(db_client, config.jokes_table_name.clone()))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory joke store; cached jokes are lost on restart");
            Arc::new(InMemoryJokeRepository::new())
        }
    };

    // --- External Joke Source ---
    let source = HttpJokeSource::new(config.joke_api_url.clone(), config.joke_api_timeout)
        .map_err(|e| AppError::InitError(format!("Failed to build joke API client: {}", e)))?;

    // --- Application State ---
    let state = Arc::new(AppState {
        provider: JokeProvider::new(repo, Arc::new(source)),
        config: config.clone(),
    });

    let app = routes::create_router(state);

    // --- Server Startup ---
    tracing::info!("Server listening on http://{}", config.bind_address);

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
