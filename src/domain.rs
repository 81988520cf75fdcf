use crate::errors::{RepoError, SourceError};
use crate::models::{Joke, NewJoke, Pagination};
use async_trait::async_trait;
use uuid::Uuid;

/// Trait defining operations for storing and retrieving cached jokes.
#[async_trait]
pub trait JokeRepository: Send + Sync + 'static { // Send+Sync+'static required for Arc<dyn>
    /// Persists a joke, assigning its id and creation timestamp.
    async fn create(&self, joke: NewJoke) -> Result<Joke, RepoError>;

    /// Retrieves a joke by its unique ID.
    /// Returns Ok(None) if the joke is not found.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Joke>, RepoError>;

    /// Picks one stored joke at random, or Ok(None) when the store is empty.
    async fn random(&self) -> Result<Option<Joke>, RepoError>;

    /// Lists stored jokes, newest first.
    async fn list(&self, page: Pagination) -> Result<Vec<Joke>, RepoError>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<(), RepoError>;
}

/// Trait for the remote service that supplies fresh jokes.
#[async_trait]
pub trait JokeSource: Send + Sync + 'static {
    async fn fetch_random(&self) -> Result<NewJoke, SourceError>;
}
