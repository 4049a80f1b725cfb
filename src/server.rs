//! HTTP server exposing the search pipeline.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/search` | Fetch and index a page, return the chunks most similar to the query |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "Failed to fetch content." } }
//! ```
//!
//! A non-success upstream fetch is a `bad_request` (400) with that fixed
//! message. Every other pipeline failure is `internal` (500) carrying the
//! error's own text.
//!
//! # CORS
//!
//! Exactly one origin — `[server] cors_origin` — is allowed, with
//! credentials. Methods and headers mirror the request.

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::embedding::{self, EmbeddingProvider};
use crate::fetch::FetchFailed;
use crate::search::{self, SearchOutcome};
use crate::store::{self, VectorStore};

/// Shared application state passed to all route handlers via Axum's `State`
/// extractor. The provider and store are built once at startup and reused
/// by every request.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

/// Starts the HTTP server.
///
/// Builds the embedding provider and vector store from config, binds to
/// `[server].bind`, and serves until the process is terminated.
///
/// # Errors
///
/// Returns an error if the store credentials are missing, the configured
/// CORS origin is not a valid header value, or binding fails.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let provider = embedding::create_provider(&config.embedding)?;
    let store = store::connect(config)?;

    tracing::info!(
        model = provider.model_name(),
        dims = provider.dims(),
        store = %config.store.provider,
        "pipeline ready"
    );

    let state = AppState {
        config: Arc::new(config.clone()),
        provider: Arc::from(provider),
        store: Arc::from(store),
    };

    let origin: HeaderValue = config.server.cors_origin.parse().map_err(|_| {
        anyhow::anyhow!("Invalid server.cors_origin: {}", config.server.cors_origin)
    })?;

    // allow_credentials cannot be combined with wildcard methods/headers,
    // so those mirror whatever the preflight asks for.
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    let app = Router::new()
        .route("/search", post(handle_search))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    println!("recall server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and human-readable message.
#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"internal"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Constructs a 500 Internal Server Error.
fn internal_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Maps pipeline failures onto the two-tier contract: an upstream fetch
/// with a non-success status becomes a 400 with a fixed message; everything
/// else is a 500 carrying the error's own text.
fn classify_search_error(err: anyhow::Error) -> AppError {
    if err.downcast_ref::<FetchFailed>().is_some() {
        bad_request("Failed to fetch content.")
    } else {
        internal_error(err.to_string())
    }
}

// ============ POST /search ============

/// JSON body for `POST /search`.
#[derive(Deserialize)]
struct SearchRequest {
    url: String,
    query: String,
}

/// Handler for `POST /search`.
///
/// Runs the full pipeline for the given page and query and returns the
/// ranked results. The response is a bare array of texts under the "page"
/// extract policy, or an array of `{text, html}` objects under "elements".
async fn handle_search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchOutcome>, AppError> {
    let outcome = search::run_search(
        &state.config,
        state.provider.as_ref(),
        state.store.as_ref(),
        &request.url,
        &request.query,
    )
    .await
    .map_err(classify_search_error)?;

    Ok(Json(outcome))
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

/// Handler for `GET /health`.
///
/// Returns a simple health check response with the server status and version.
/// This endpoint is used by load balancers and monitoring tools.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_failures_become_a_fixed_bad_request() {
        let err = anyhow::Error::new(FetchFailed {
            status: reqwest::StatusCode::NOT_FOUND,
        });
        let app_err = classify_search_error(err);
        assert_eq!(app_err.status, StatusCode::BAD_REQUEST);
        assert_eq!(app_err.code, "bad_request");
        assert_eq!(app_err.message, "Failed to fetch content.");
    }

    #[test]
    fn other_failures_become_internal_with_their_own_message() {
        let err = anyhow::anyhow!("model exploded");
        let app_err = classify_search_error(err);
        assert_eq!(app_err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(app_err.code, "internal");
        assert_eq!(app_err.message, "model exploded");
    }
}
