use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Source tag stamped on jokes fetched from the public joke API.
pub const DEFAULT_JOKE_SOURCE: &str = "official-joke-api";

pub const DEFAULT_PAGE_LIMIT: i64 = 100;
pub const MAX_PAGE_LIMIT: i64 = 100;

/// A persisted joke. `id` and `created_at` are assigned by the store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Joke {
    pub id: Uuid,
    pub setup: String,
    pub punchline: String,
    pub joke_type: Option<String>,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

/// A joke that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJoke {
    pub setup: String,
    pub punchline: String,
    pub joke_type: Option<String>,
    pub source: String,
}

impl NewJoke {
    pub fn from_official_api(setup: String, punchline: String, joke_type: Option<String>) -> Self {
        Self {
            setup,
            punchline,
            joke_type,
            source: DEFAULT_JOKE_SOURCE.to_string(),
        }
    }
}

/// Simplified response body for `GET /jokes/random`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JokeSummary {
    pub setup: String,
    pub punchline: String,
    #[serde(rename = "type")]
    pub joke_type: Option<String>,
}

impl From<Joke> for JokeSummary {
    fn from(joke: Joke) -> Self {
        Self {
            setup: joke.setup,
            punchline: joke.punchline,
            joke_type: joke.joke_type,
        }
    }
}

impl From<NewJoke> for JokeSummary {
    fn from(joke: NewJoke) -> Self {
        Self {
            setup: joke.setup,
            punchline: joke.punchline,
            joke_type: joke.joke_type,
        }
    }
}

/// Offset/limit window over the stored jokes, always within bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub skip: usize,
    pub limit: usize,
}

impl Pagination {
    /// Clamps raw query values: negative skip becomes 0, limit is forced into 1..=100.
    pub fn clamped(skip: i64, limit: i64) -> Self {
        Self {
            skip: skip.max(0) as usize,
            limit: limit.clamp(1, MAX_PAGE_LIMIT) as usize,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::clamped(0, DEFAULT_PAGE_LIMIT)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HealthReport {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub database: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_clamps_out_of_range_values() {
        assert_eq!(Pagination::clamped(-5, 0), Pagination { skip: 0, limit: 1 });
        assert_eq!(Pagination::clamped(3, 500), Pagination { skip: 3, limit: 100 });
        assert_eq!(Pagination::clamped(7, 25), Pagination { skip: 7, limit: 25 });
    }

    #[test]
    fn default_pagination_is_first_hundred() {
        assert_eq!(Pagination::default(), Pagination { skip: 0, limit: 100 });
    }

    #[test]
    fn summary_serializes_category_as_type() {
        let summary = JokeSummary::from(NewJoke::from_official_api(
            "Why did the chicken cross the road?".into(),
            "To get to the other side!".into(),
            Some("general".into()),
        ));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["type"], "general");
        assert!(json.get("joke_type").is_none());
    }

    #[test]
    fn official_api_jokes_carry_default_source() {
        let joke = NewJoke::from_official_api("a".into(), "b".into(), None);
        assert_eq!(joke.source, DEFAULT_JOKE_SOURCE);
    }
}
