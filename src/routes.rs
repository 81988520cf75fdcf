use crate::{
    errors::AppError,
    handlers, // Import handlers module
    AppState, // Use the AppState defined in main.rs
};
use axum::{
    extract::Request,
    http::HeaderValue,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::{any::Any as PanicPayload, sync::Arc};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

/// Creates the Axum router and associates routes with handlers.
pub fn create_router(state: Arc<AppState>) -> Router {
    let allowed_origins = state.config.allowed_origins.clone();

    let router = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/jokes", get(handlers::list_jokes))
        // Static segment wins over the `{id}` capture
        .route("/jokes/random", get(handlers::get_random_joke))
        .route("/jokes/{id}", get(handlers::get_joke))
        .with_state(state); // Pass the application state

    with_middleware(router, &allowed_origins)
}

/// Middleware Layers, innermost first. Every request gets an `x-request-id`
/// (kept if the client sent one), recorded on its trace span and echoed on
/// the response. Panics become a JSON 500.
fn with_middleware(router: Router, allowed_origins: &[String]) -> Router {
    router
        .layer(cors_layer(allowed_origins))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        }))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

fn panic_response(payload: Box<dyn PanicPayload + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    AppError::InternalServerError(format!("handler panicked: {}", detail)).into_response()
}

/// Any origin when none are configured, otherwise only the listed ones.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(origin = %o, error = %e, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        domain::JokeRepository,
        models::{Joke, JokeSummary},
        repositories::InMemoryJokeRepository,
        service::{
            test_support::{chicken_joke, wait_for_rows, CountingSource},
            JokeProvider,
        },
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    fn make_app(repo: Arc<InMemoryJokeRepository>, source: Arc<CountingSource>) -> Router {
        let config = Config::from_lookup(|_| None).unwrap();
        let state = Arc::new(AppState {
            provider: JokeProvider::new(repo, source),
            config: Arc::new(config),
        });
        create_router(state)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn random_joke_returns_simplified_body() {
        let repo = Arc::new(InMemoryJokeRepository::new());
        let source = Arc::new(CountingSource::returning(chicken_joke()));
        let app = make_app(repo.clone(), source.clone());

        let (status, json) = get(app, "/jokes/random?use_cache=false").await;

        assert_eq!(status, StatusCode::OK);
        let joke: JokeSummary = serde_json::from_value(json).unwrap();
        assert_eq!(joke, JokeSummary::from(chicken_joke()));
        assert_eq!(source.call_count(), 1);
        wait_for_rows(&repo, 1).await;
    }

    #[tokio::test]
    async fn random_joke_uses_cache_by_default() {
        let repo = Arc::new(InMemoryJokeRepository::new());
        repo.create(chicken_joke()).await.unwrap();
        let source = Arc::new(CountingSource::failing());

        let (status, _) = get(make_app(repo, source.clone()), "/jokes/random").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn source_outage_is_503() {
        let repo = Arc::new(InMemoryJokeRepository::new());
        let app = make_app(repo.clone(), Arc::new(CountingSource::failing()));

        let (status, json) = get(app, "/jokes/random?use_cache=false").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["error"], "Could not fetch joke from external service");
        assert_eq!(repo.len().await, 0);
    }

    #[tokio::test]
    async fn list_clamps_limit() {
        let repo = Arc::new(InMemoryJokeRepository::new());
        for _ in 0..3 {
            repo.create(chicken_joke()).await.unwrap();
        }
        let app = make_app(repo, Arc::new(CountingSource::failing()));

        let (status, json) = get(app.clone(), "/jokes?skip=1&limit=500").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 2);

        let (status, json) = get(app, "/jokes?skip=-4&limit=0").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_by_id_round_trips_and_404s() {
        let repo = Arc::new(InMemoryJokeRepository::new());
        let stored = repo.create(chicken_joke()).await.unwrap();
        let app = make_app(repo, Arc::new(CountingSource::failing()));

        let (status, json) = get(app.clone(), &format!("/jokes/{}", stored.id)).await;
        assert_eq!(status, StatusCode::OK);
        let joke: Joke = serde_json::from_value(json).unwrap();
        assert_eq!(joke.id, stored.id);
        assert_eq!(joke.source, "official-joke-api");

        let (status, json) = get(app.clone(), &format!("/jokes/{}", uuid::Uuid::new_v4())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Joke not found");

        let (status, _) = get(app, "/jokes/99999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_and_root_report_version() {
        let app = make_app(
            Arc::new(InMemoryJokeRepository::new()),
            Arc::new(CountingSource::failing()),
        );

        let (status, json) = get(app.clone(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["environment"], "production");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));

        let (status, json) = get(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["health"], "/health");
    }

    #[tokio::test]
    async fn use_cache_accepts_common_boolean_spellings() {
        let repo = Arc::new(InMemoryJokeRepository::new());
        repo.create(chicken_joke()).await.unwrap();
        let source = Arc::new(CountingSource::returning(chicken_joke()));
        let app = make_app(repo, source.clone());

        let (status, _) = get(app.clone(), "/jokes/random?use_cache=True").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(source.call_count(), 0);

        let (status, _) = get(app.clone(), "/jokes/random?use_cache=0").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(source.call_count(), 1);

        let (status, json) = get(app, "/jokes/random?use_cache=maybe").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("use_cache"));
    }

    #[tokio::test]
    async fn unparseable_pagination_falls_back_to_defaults() {
        let repo = Arc::new(InMemoryJokeRepository::new());
        for _ in 0..3 {
            repo.create(chicken_joke()).await.unwrap();
        }
        let app = make_app(repo, Arc::new(CountingSource::failing()));

        let (status, json) = get(app.clone(), "/jokes?limit=abc").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 3);

        let (status, json) = get(app, "/jokes?skip=1.5&limit=").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn responses_carry_a_request_id() {
        let app = make_app(
            Arc::new(InMemoryJokeRepository::new()),
            Arc::new(CountingSource::failing()),
        );

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        let id = resp.headers().get("x-request-id").expect("x-request-id header");
        assert!(uuid::Uuid::parse_str(id.to_str().unwrap()).is_ok());

        let req = Request::builder()
            .uri("/jokes/random?use_cache=false")
            .header("x-request-id", "client-supplied-id")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(resp.headers()["x-request-id"], "client-supplied-id");
    }

    #[tokio::test]
    async fn handler_panic_becomes_json_500() {
        async fn explode() -> StatusCode {
            panic!("kaboom")
        }
        let router = Router::new().route("/boom", axum::routing::get(explode));
        let app = with_middleware(router, &[]);

        let req = Request::builder().uri("/boom").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(resp.headers().contains_key("x-request-id"));
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }
}
