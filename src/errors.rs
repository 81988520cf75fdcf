use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use uuid::Uuid;

// --- Domain/Infrastructure Errors ---

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Database backend error: {0}")]
    BackendError(#[from] anyhow::Error), // Wrap Anyhow errors from DB layer

    #[error("Stored joke data is corrupt: {0}")]
    DataCorruption(String),
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Joke API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Joke API responded with status {0}")]
    Status(reqwest::StatusCode),

    #[error("Joke API returned an unusable body: {0}")]
    Malformed(String),
}

/// Errors surfaced by the joke provider.
#[derive(Error, Debug)]
pub enum JokeError {
    #[error("Joke not found with ID: {0}")]
    NotFound(String),

    #[error("Could not fetch joke from external service")]
    SourceUnavailable(#[source] SourceError),

    #[error("Joke store operation failed")]
    Repository(#[from] RepoError),
}

impl JokeError {
    pub fn not_found(id: Uuid) -> Self {
        JokeError::NotFound(id.to_string())
    }
}

impl From<SourceError> for JokeError {
    fn from(err: SourceError) -> Self {
        JokeError::SourceUnavailable(err)
    }
}

// --- Web Layer Error ---

#[derive(Error, Debug)]
pub enum AppError {
    // Input validation / request parsing errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Joke not found with ID: {0}")]
    JokeNotFound(String),
    #[error("Could not fetch joke from external service")]
    SourceUnavailable(#[source] SourceError),
    #[error("Could not access joke data")]
    RepositoryError(#[source] RepoError), // Source allows seeing underlying RepoError

    // Configuration / Startup errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Initialization error: {0}")]
    InitError(String),

    // Generic Internal Server Error
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

// --- Conversions from Domain Errors to AppError ---

impl From<JokeError> for AppError {
    fn from(err: JokeError) -> Self {
        match err {
            JokeError::NotFound(id) => AppError::JokeNotFound(id),
            JokeError::SourceUnavailable(e) => AppError::SourceUnavailable(e),
            JokeError::Repository(e) => AppError::RepositoryError(e),
        }
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<axum::extract::rejection::QueryRejection> for AppError {
    fn from(rejection: axum::extract::rejection::QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InitError(format!("I/O error: {}", err))
    }
}

impl From<aws_smithy_types::error::operation::BuildError> for AppError {
    fn from(err: aws_smithy_types::error::operation::BuildError) -> Self {
        AppError::InitError(format!("Failed to build AWS request: {}", err))
    }
}

// --- Axum Response Implementation ---

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::JokeNotFound(_) => StatusCode::NOT_FOUND,
            AppError::SourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::RepositoryError(_)
            | AppError::ConfigError(_)
            | AppError::InitError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            // 4xx Client Errors
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::JokeNotFound(_) => "Joke not found".to_string(),

            // 5xx Server Errors
            AppError::SourceUnavailable(e) => {
                tracing::error!(error.source = %e, "Joke source unavailable");
                "Could not fetch joke from external service".to_string()
            }
            AppError::RepositoryError(e) => {
                tracing::error!(error.source = ?e, "Repository error occurred");
                "Database operation failed".to_string()
            }
            AppError::ConfigError(msg) => {
                tracing::error!("Configuration error: {}", msg);
                "Server configuration error".to_string()
            }
            AppError::InitError(msg) => {
                tracing::error!("Initialization error: {}", msg);
                "Server initialization error".to_string()
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                "Internal server error".to_string()
            }
        };

        tracing::error!(error.message=%error_message, error.detail=%self, "Responding with error");

        let body = Json(serde_json::json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_http_statuses() {
        let not_found: AppError = JokeError::NotFound("abc".into()).into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let unavailable: AppError =
            JokeError::from(SourceError::Status(reqwest::StatusCode::BAD_GATEWAY)).into();
        assert_eq!(unavailable.status(), StatusCode::SERVICE_UNAVAILABLE);

        let repo: AppError =
            JokeError::from(RepoError::DataCorruption("bad item".into())).into();
        assert_eq!(repo.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn error_body_hides_internal_detail() {
        let resp = AppError::RepositoryError(RepoError::DataCorruption("secret".into()))
            .into_response();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "Database operation failed");
    }
}
