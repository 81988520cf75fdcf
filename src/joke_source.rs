use crate::{
    domain::JokeSource,
    errors::SourceError,
    models::NewJoke,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing;

/// Body returned by `GET /random_joke`.
#[derive(Debug, Deserialize)]
struct RandomJokeBody {
    setup: String,
    punchline: String,
    #[serde(rename = "type")]
    joke_type: Option<String>,
    id: Option<serde_json::Value>,
}

/// Fetches jokes from an official-joke-api compatible endpoint.
#[derive(Debug, Clone)]
pub struct HttpJokeSource {
    client: Client,
    base_url: String,
}

impl HttpJokeSource {
    /// Every request made by this source is bounded by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("joke-cache-service/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::info!(%base_url, ?timeout, "Initializing HttpJokeSource");
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl JokeSource for HttpJokeSource {
    async fn fetch_random(&self) -> Result<NewJoke, SourceError> {
        let url = format!("{}/random_joke", self.base_url);
        tracing::debug!(%url, "Joke API: Requesting random joke");

        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::error!(%url, error = %e, "Joke API: Request failed");
            SourceError::Transport(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(%url, %status, "Joke API: Non-success status");
            return Err(SourceError::Status(status));
        }

        let body = response.bytes().await?;
        let joke: RandomJokeBody = serde_json::from_slice(&body)
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        if joke.setup.trim().is_empty() || joke.punchline.trim().is_empty() {
            return Err(SourceError::Malformed("setup and punchline must be non-empty".into()));
        }

        tracing::info!(upstream_id = ?joke.id, "Joke fetched from API");
        Ok(NewJoke::from_official_api(joke.setup, joke.punchline, joke.joke_type))
    }
}
