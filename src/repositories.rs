use crate::{
    domain::JokeRepository,
    errors::RepoError,
    models::{Joke, NewJoke, Pagination},
};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_dynamodb::{
    types::AttributeValue,
    Client as DynamoDbClient,
};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{self, info};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct DynamoDbJokeRepository {
    client: DynamoDbClient,
    table_name: String, // Store the table name
}

impl DynamoDbJokeRepository {
    /// Creates a new repository instance configured for a specific table.
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        info!(%table_name, "Initializing DynamoDbJokeRepository");
        Self { client, table_name }
    }

    /// Scans the whole table, following `LastEvaluatedKey` pagination.
    async fn scan_all(&self) -> Result<Vec<Joke>, RepoError> {
        tracing::debug!("DynamoDB: Scanning table '{}' for all jokes", self.table_name);
        let mut jokes: Vec<Joke> = Vec::new();
        let mut last_evaluated_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let mut request_builder = self.client.scan().table_name(&self.table_name);

            // Apply ExclusiveStartKey if paginating from previous response
            if let Some(lek) = last_evaluated_key {
                request_builder = request_builder.set_exclusive_start_key(Some(lek));
            }

            let resp = request_builder
                .send()
                .await
                .context(format!("DynamoDB: Failed to scan table '{}'", self.table_name))
                .map_err(RepoError::BackendError)?;

            for item in resp.items.unwrap_or_default() {
                match item_to_joke(&item) {
                    Some(joke) => jokes.push(joke),
                    None => {
                        let item_id = item.get("joke_id").and_then(|v| v.as_s().ok());
                        tracing::error!(item.id = ?item_id, table_name = %self.table_name, "DynamoDB: Failed to parse item from scan into Joke");
                        // Fail fast if data in the table is corrupt
                        return Err(RepoError::DataCorruption(format!(
                            "DynamoDB: Failed to parse item {:?} during scan of table '{}'",
                            item_id, self.table_name
                        )));
                    }
                }
            }

            last_evaluated_key = resp.last_evaluated_key;
            if last_evaluated_key.is_none() {
                break;
            }
            tracing::debug!("DynamoDB Scan (table: {}): Continuing with LastEvaluatedKey...", self.table_name);
        }

        tracing::debug!("DynamoDB (table: {}): Scanned {} jokes", self.table_name, jokes.len());
        Ok(jokes)
    }

    /// Single-item scan starting after `start`, or at the beginning of the table.
    async fn scan_one(&self, start: Option<HashMap<String, AttributeValue>>) -> Result<Option<Joke>, RepoError> {
        let resp = self.client
            .scan()
            .table_name(&self.table_name)
            .limit(1)
            .set_exclusive_start_key(start)
            .send()
            .await
            .context(format!("DynamoDB: Failed to sample table '{}'", self.table_name))
            .map_err(RepoError::BackendError)?;

        match resp.items.unwrap_or_default().into_iter().next() {
            Some(item) => item_to_joke(&item).map(Some).ok_or_else(|| {
                tracing::error!(table_name = %self.table_name, "DynamoDB: Failed to parse sampled item into Joke");
                RepoError::DataCorruption(format!(
                    "DynamoDB: Failed to parse sampled item from table '{}'",
                    self.table_name
                ))
            }),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl JokeRepository for DynamoDbJokeRepository {
    /// Stores a new joke using PutItem.
    async fn create(&self, joke: NewJoke) -> Result<Joke, RepoError> {
        let joke = assign_identity(joke);
        let mut request = self.client
            .put_item()
            .table_name(&self.table_name)
            .item("joke_id", AttributeValue::S(joke.id.to_string()))
            .item("setup", AttributeValue::S(joke.setup.clone()))
            .item("punchline", AttributeValue::S(joke.punchline.clone()))
            .item("source", AttributeValue::S(joke.source.clone()))
            .item("created_at", AttributeValue::S(joke.created_at.to_rfc3339()))
            // Never overwrite an existing row
            .condition_expression("attribute_not_exists(joke_id)");
        if let Some(joke_type) = &joke.joke_type {
            request = request.item("joke_type", AttributeValue::S(joke_type.clone()));
        }

        request
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to put joke (id: {})", self.table_name, joke.id))
            .map_err(RepoError::BackendError)?;

        tracing::debug!(joke_id = %joke.id, table_name = %self.table_name, "DynamoDB: Joke stored");
        Ok(joke)
    }

    /// Retrieves a joke using GetItem.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Joke>, RepoError> {
        let id_str = id.to_string();
        let resp = self.client
            .get_item()
            .table_name(&self.table_name)
            .key("joke_id", AttributeValue::S(id_str.clone()))
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to get joke (id: {})", self.table_name, id_str))
            .map_err(RepoError::BackendError)?;

        match resp.item {
            Some(item) => match item_to_joke(&item) {
                Some(joke) => Ok(Some(joke)),
                None => {
                    tracing::error!(joke_id = %id_str, table_name = %self.table_name, "DynamoDB: Retrieved item but failed to parse into Joke");
                    Err(RepoError::DataCorruption(format!(
                        "Failed to parse joke data retrieved from DynamoDB table '{}' for id {}",
                        self.table_name, id_str
                    )))
                }
            },
            None => Ok(None), // Item not found is not an error
        }
    }

    /// Reads one item starting just past a random key, wrapping to the start
    /// of the table when the random key lands after the last item. Two
    /// single-item scans at most, regardless of table size. Selection is
    /// arbitrary rather than uniform: items after wide hash gaps win more often.
    async fn random(&self) -> Result<Option<Joke>, RepoError> {
        if let Some(joke) = self.scan_one(Some(random_start_key())).await? {
            return Ok(Some(joke));
        }
        self.scan_one(None).await
    }

    /// DynamoDB has no server-side ordering on a scan, so ordering and the
    /// skip/limit window are applied after the full scan.
    async fn list(&self, page: Pagination) -> Result<Vec<Joke>, RepoError> {
        let mut jokes = self.scan_all().await?;
        jokes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let jokes: Vec<Joke> = jokes.into_iter().skip(page.skip).take(page.limit).collect();
        tracing::info!("DynamoDB (table: {}): Listed {} jokes", self.table_name, jokes.len());
        Ok(jokes)
    }

    async fn ping(&self) -> Result<(), RepoError> {
        self.client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
            .context(format!("DynamoDB: Failed to describe table '{}'", self.table_name))
            .map_err(RepoError::BackendError)?;
        Ok(())
    }
}

/// Keeps jokes in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryJokeRepository {
    jokes: RwLock<Vec<Joke>>,
}

impl InMemoryJokeRepository {
    pub fn new() -> Self {
        info!("Initializing InMemoryJokeRepository");
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.jokes.read().await.len()
    }
}

#[async_trait]
impl JokeRepository for InMemoryJokeRepository {
    async fn create(&self, joke: NewJoke) -> Result<Joke, RepoError> {
        let joke = assign_identity(joke);
        self.jokes.write().await.push(joke.clone());
        tracing::debug!(joke_id = %joke.id, "Memory: Joke stored");
        Ok(joke)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Joke>, RepoError> {
        Ok(self.jokes.read().await.iter().find(|j| j.id == id).cloned())
    }

    async fn random(&self) -> Result<Option<Joke>, RepoError> {
        let jokes = self.jokes.read().await;
        Ok(jokes.choose(&mut rand::thread_rng()).cloned())
    }

    async fn list(&self, page: Pagination) -> Result<Vec<Joke>, RepoError> {
        // Newest insert first, so equal timestamps still come out most-recent-first.
        let mut jokes: Vec<Joke> = self.jokes.read().await.iter().rev().cloned().collect();
        jokes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jokes.into_iter().skip(page.skip).take(page.limit).collect())
    }

    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

fn random_start_key() -> HashMap<String, AttributeValue> {
    HashMap::from([("joke_id".to_string(), AttributeValue::S(Uuid::new_v4().to_string()))])
}

fn assign_identity(joke: NewJoke) -> Joke {
    Joke {
        id: Uuid::new_v4(),
        setup: joke.setup,
        punchline: joke.punchline,
        joke_type: joke.joke_type,
        source: joke.source,
        created_at: Utc::now(),
    }
}

// Helper function to convert DynamoDB item map to Joke struct
fn item_to_joke(item: &HashMap<String, AttributeValue>) -> Option<Joke> {
    let id = item
        .get("joke_id")?
        .as_s()
        .ok()
        .and_then(|s| Uuid::parse_str(s).ok())?;
    let setup = item.get("setup")?.as_s().ok()?.to_string();
    let punchline = item.get("punchline")?.as_s().ok()?.to_string();
    let joke_type = match item.get("joke_type") {
        Some(value) => Some(value.as_s().ok()?.to_string()),
        None => None,
    };
    let source = item.get("source")?.as_s().ok()?.to_string();
    let created_at = item
        .get("created_at")?
        .as_s()
        .ok()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())?
        .with_timezone(&Utc);

    if setup.trim().is_empty() || punchline.trim().is_empty() {
        return None;
    }

    Some(Joke {
        id,
        setup,
        punchline,
        joke_type,
        source,
        created_at,
    })
}
