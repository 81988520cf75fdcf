use crate::{
    errors::AppError,
    models::{HealthReport, Joke, JokeSummary, Pagination, DEFAULT_PAGE_LIMIT},
    AppState,
};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use tracing;

#[derive(Debug, Deserialize)]
pub struct RandomJokeParams {
    #[serde(default = "default_use_cache", deserialize_with = "lenient_bool")]
    pub use_cache: bool,
}

fn default_use_cache() -> bool {
    true
}

/// Pagination values that do not parse fall back to their defaults.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default, deserialize_with = "lenient_int")]
    pub skip: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub limit: Option<i64>,
}

impl ListParams {
    pub fn pagination(&self) -> Pagination {
        Pagination::clamped(self.skip.unwrap_or(0), self.limit.unwrap_or(DEFAULT_PAGE_LIMIT))
    }
}

/// Accepts the boolean spellings HTTP clients commonly send
/// (`true`/`True`/`1`/`yes`/`on` and their negatives).
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_bool(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("'{}' is not a recognised boolean", raw))
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "t" | "y" => Some(true),
        "false" | "0" | "no" | "off" | "f" | "n" => Some(false),
        _ => None,
    }
}

fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_int))
}

/// Integers parse as-is; finite decimals are truncated; anything else is ignored.
fn parse_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f as i64)
    })
}

/// Handler for GET /jokes/random
pub async fn get_random_joke(
    State(state): State<Arc<AppState>>,
    params: Result<Query<RandomJokeParams>, QueryRejection>,
) -> Result<Json<JokeSummary>, AppError> {
    let Query(params) = params?;
    tracing::debug!(use_cache = params.use_cache, "Random joke requested via handler");
    let joke = state.provider.get_random_joke(params.use_cache).await?;
    tracing::info!("Random joke served");
    Ok(Json(joke))
}

/// Handler for GET /jokes
pub async fn list_jokes(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Joke>>, AppError> {
    let Query(params) = params?;
    let page = params.pagination();
    tracing::debug!(skip = page.skip, limit = page.limit, "Listing jokes via handler");
    let jokes = state.provider.list_jokes(page).await?;
    tracing::info!("Handler successfully retrieved {} jokes", jokes.len());
    Ok(Json(jokes))
}

/// Handler for GET /jokes/{id}
pub async fn get_joke(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Json<Joke>, AppError> {
    tracing::debug!(joke_id = %id_str, "Fetching joke details via handler");
    let joke = state.provider.get_joke_by_id(&id_str).await?;
    Ok(Json(joke))
}

/// Handler for GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    Json(
        state
            .provider
            .health(&state.config.version, &state.config.environment)
            .await,
    )
}

/// Handler for GET /
pub async fn root(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Welcome to the joke cache service",
        "version": state.config.version,
        "health": "/health",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_spellings() {
        for raw in ["true", "True", "TRUE", "1", "yes", "On"] {
            assert_eq!(parse_bool(raw), Some(true), "{}", raw);
        }
        for raw in ["false", "False", "0", "no", "OFF"] {
            assert_eq!(parse_bool(raw), Some(false), "{}", raw);
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn integers_parse_leniently() {
        assert_eq!(parse_int("12"), Some(12));
        assert_eq!(parse_int(" -3 "), Some(-3));
        assert_eq!(parse_int("1.5"), Some(1));
        assert_eq!(parse_int("abc"), None);
        assert_eq!(parse_int("NaN"), None);
    }

    #[test]
    fn unparseable_pagination_uses_defaults() {
        let params = ListParams { skip: None, limit: None };
        assert_eq!(params.pagination(), Pagination::default());
    }
}
