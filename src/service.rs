use crate::{
    domain::{JokeRepository, JokeSource},
    errors::JokeError,
    models::{HealthReport, Joke, JokeSummary, NewJoke, Pagination},
};
use std::sync::Arc;
use tracing;
use uuid::Uuid;

/// Serves jokes from the store when allowed, otherwise from the external source.
#[derive(Clone)]
pub struct JokeProvider {
    repo: Arc<dyn JokeRepository>,
    source: Arc<dyn JokeSource>,
}

impl JokeProvider {
    pub fn new(repo: Arc<dyn JokeRepository>, source: Arc<dyn JokeSource>) -> Self {
        Self { repo, source }
    }

    /// Returns a cached joke when `use_cache` is set and the store has one.
    /// Otherwise fetches a fresh joke, caches it best-effort, and returns it.
    pub async fn get_random_joke(&self, use_cache: bool) -> Result<JokeSummary, JokeError> {
        if use_cache {
            match self.repo.random().await {
                Ok(Some(cached)) => {
                    tracing::info!(joke_id = %cached.id, "Returning cached joke");
                    return Ok(cached.into());
                }
                Ok(None) => tracing::debug!("Joke cache is empty, fetching from source"),
                Err(e) => tracing::warn!(error = %e, "Joke cache lookup failed, fetching from source"),
            }
        }

        let fresh = self.source.fetch_random().await?;
        self.cache_best_effort(fresh.clone());
        Ok(fresh.into())
    }

    /// Stores a freshly fetched joke on a background task. The caller never
    /// waits on the write; failures are logged and dropped.
    fn cache_best_effort(&self, joke: NewJoke) {
        let repo = Arc::clone(&self.repo);
        tokio::spawn(async move {
            match repo.create(joke).await {
                Ok(stored) => tracing::info!(joke_id = %stored.id, "Joke saved to cache"),
                Err(e) => tracing::warn!(error = %e, "Failed to cache joke"),
            }
        });
    }

    pub async fn list_jokes(&self, page: Pagination) -> Result<Vec<Joke>, JokeError> {
        Ok(self.repo.list(page).await?)
    }

    /// Looks up a joke by its textual id. Ids that do not parse were never issued.
    pub async fn get_joke_by_id(&self, id: &str) -> Result<Joke, JokeError> {
        let Ok(joke_id) = Uuid::parse_str(id) else {
            tracing::debug!(invalid_joke_id = %id, "Joke id is not a UUID");
            return Err(JokeError::NotFound(id.to_string()));
        };
        self.repo
            .get_by_id(joke_id)
            .await?
            .ok_or_else(|| JokeError::not_found(joke_id))
    }

    pub async fn health(&self, version: &str, environment: &str) -> HealthReport {
        let database = match self.repo.ping().await {
            Ok(()) => "ok",
            Err(e) => {
                tracing::error!(error = %e, "Database health check failed");
                "error"
            }
        };
        HealthReport {
            status: if database == "ok" { "healthy" } else { "unhealthy" }.to_string(),
            version: version.to_string(),
            environment: environment.to_string(),
            database: database.to_string(),
        }
    }
}
