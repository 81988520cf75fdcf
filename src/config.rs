use std::{env, net::SocketAddr, str::FromStr, time::Duration};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
}

/// Which `JokeRepository` backend to run with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    DynamoDb,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dynamodb" => Ok(StoreBackend::DynamoDb),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

#[derive(Clone, Debug)] // Clone needed if passed around, Debug for logging
pub struct Config {
    pub bind_address: SocketAddr,
    pub store_backend: StoreBackend,
    pub jokes_table_name: String,
    // Store region as string for simplicity here, aws_clients can convert
    pub aws_region: String,
    // Optional endpoint for LocalStack
    pub localstack_endpoint: Option<String>,
    pub joke_api_url: String,
    pub joke_api_timeout: Duration,
    pub environment: String,
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
    pub version: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignores errors, relies on env vars otherwise)
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, applying defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = SocketAddr::from_str(&bind_address_str)
            .map_err(|e| ConfigError::InvalidVar("BIND_ADDRESS".into(), e.to_string()))?;

        let store_backend = var_or("JOKE_STORE", "dynamodb")
            .parse::<StoreBackend>()
            .map_err(|e| ConfigError::InvalidVar("JOKE_STORE".into(), e))?;

        let jokes_table_name = var_or("JOKES_TABLE_NAME", "jokes");
        if jokes_table_name.trim().is_empty() {
            return Err(ConfigError::MissingVar("JOKES_TABLE_NAME".into()));
        }

        let aws_region = var_or("AWS_DEFAULT_REGION", "ca-central-1");

        // Allow overriding endpoint for localstack/testing
        let localstack_endpoint = lookup("AWS_ENDPOINT_URL").filter(|v| !v.trim().is_empty());

        let joke_api_url = var_or("JOKE_API_URL", "https://official-joke-api.appspot.com")
            .trim_end_matches('/')
            .to_string();
        if !(joke_api_url.starts_with("http://") || joke_api_url.starts_with("https://")) {
            return Err(ConfigError::InvalidVar(
                "JOKE_API_URL".into(),
                format!("'{}' is not an http(s) URL", joke_api_url),
            ));
        }

        let timeout_secs = var_or("JOKE_API_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidVar("JOKE_API_TIMEOUT_SECS".into(), e.to_string()))?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidVar(
                "JOKE_API_TIMEOUT_SECS".into(),
                "must be greater than zero".into(),
            ));
        }

        let environment = var_or("ENVIRONMENT", "production");

        let allowed_origins = var_or("ALLOWED_ORIGINS", "*")
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty() && *o != "*")
            .map(String::from)
            .collect();

        Ok(Config {
            bind_address,
            store_backend,
            jokes_table_name,
            aws_region,
            localstack_endpoint,
            joke_api_url,
            joke_api_timeout: Duration::from_secs(timeout_secs),
            environment,
            allowed_origins,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}
