//! HTTP boundary: accepts raw credentials plus a window, runs token setup
//! and one harvest, and answers with the aggregated messages.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::graph::GraphApi;
use crate::harvest::{self, HarvestOptions};
use crate::token::{self, Credentials};

#[derive(Clone)]
pub struct AppState {
    pub graph: Arc<dyn GraphApi>,
    pub defaults: HarvestOptions,
}

#[derive(Debug, Deserialize)]
pub struct FetchMessagesRequest {
    pub app_id: String,
    pub app_secret: String,
    pub user_access_token: String,
    pub page_id: String,
    /// Trailing window in days; falls back to the configured default.
    pub days_ago: Option<i64>,
}

/// Build the application router. Origins that do not parse as header values
/// are dropped with a warning rather than aborting startup.
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%origin, %err, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/fetch-messages", post(fetch_messages))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
}

/// One full credential-escalation plus harvest per request; nothing is
/// cached between calls.
async fn fetch_messages(
    State(state): State<AppState>,
    Json(req): Json<FetchMessagesRequest>,
) -> Response {
    let creds = Credentials {
        app_id: req.app_id,
        app_secret: req.app_secret,
        user_access_token: req.user_access_token,
        page_id: req.page_id,
    };

    let tokens = match token::setup(state.graph.as_ref(), &creds).await {
        Ok(tokens) => tokens,
        Err(err) => {
            warn!(%err, "token setup failed");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "status": "error", "message": err.to_string() })),
            )
                .into_response();
        }
    };

    let mut options = state.defaults.clone();
    if let Some(days) = req.days_ago {
        if days < 1 || chrono::Duration::try_days(days).is_none() {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "status": "error", "message": "days_ago must be a positive number of days" })),
            )
                .into_response();
        }
        options.window_days = days;
    }

    let messages = harvest::harvest(state.graph.as_ref(), &tokens, &creds.page_id, &options).await;
    if messages.is_empty() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "status": "error", "message": "No messages found." })),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        Json(json!({ "status": "success", "messages": messages })),
    )
        .into_response()
}
