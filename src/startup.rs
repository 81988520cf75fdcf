use crate::errors::AppError;
use aws_sdk_dynamodb::{
    types::{AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType},
    Client as DynamoDbClient, error::SdkError as DynamoSdkError,
};
use backoff::ExponentialBackoff;
use std::time::Duration;
use tracing;

/// How long to keep retrying while DynamoDB (or LocalStack) is still coming up.
const TABLE_BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates the DynamoDB table if it doesn't exist.
///
/// Dispatch/timeout failures are retried with exponential backoff; service
/// errors other than "already exists" are permanent.
async fn create_dynamodb_table_if_not_exists(client: &DynamoDbClient, table_name: &str) -> Result<(), AppError> {
    let attribute = AttributeDefinition::builder()
        .attribute_name("joke_id")
        .attribute_type(ScalarAttributeType::S)
        .build()?;
    let key_schema = KeySchemaElement::builder()
        .attribute_name("joke_id")
        .key_type(KeyType::Hash)
        .build()?;

    let policy = ExponentialBackoff {
        max_elapsed_time: Some(TABLE_BOOTSTRAP_TIMEOUT),
        ..ExponentialBackoff::default()
    };

    let (attribute, key_schema) = (&attribute, &key_schema);
    backoff::future::retry(policy, || async move {
        let result = client
            .create_table()
            .table_name(table_name)
            .attribute_definitions(attribute.clone())
            .key_schema(key_schema.clone())
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await;

        match result {
            Ok(_) => {
                tracing::info!("Startup: Table '{}' created successfully or setup initiated.", table_name);
                Ok(())
            }
            Err(e) => {
                if let DynamoSdkError::ServiceError(service_err) = &e {
                    if service_err.err().is_resource_in_use_exception() {
                        tracing::info!("Startup: Table '{}' already exists, no action needed.", table_name);
                        Ok(())
                    } else {
                        let context = format!("Startup: Service error creating DynamoDB table '{}'", table_name);
                        tracing::error!("{}: {:?}", context, service_err);
                        Err(backoff::Error::permanent(AppError::InitError(format!("{}: {}", context, e))))
                    }
                } else {
                    let context = format!("Startup: SDK error creating DynamoDB table '{}'", table_name);
                    tracing::warn!("{}: {} (retrying)", context, e);
                    Err(backoff::Error::transient(AppError::InitError(format!("{}: {}", context, e))))
                }
            }
        }
    })
    .await
}

/// Initializes required AWS resources (the jokes table).
pub async fn init_resources(db_client: &DynamoDbClient, table_name: &str) -> Result<(), AppError> {
    tracing::info!("Startup: Initializing AWS resources...");
    create_dynamodb_table_if_not_exists(db_client, table_name).await?;
    tracing::info!("Startup: AWS resource initialization complete.");
    Ok(())
}
