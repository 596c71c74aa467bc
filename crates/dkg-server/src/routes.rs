use super::config::ServerConfig;
use dkg_core::{
    primitives::{
        BridgeFault, CommitResponse, ErrorKind, Fault, FinalizeResponse, InitResponse,
        ProtocolError,
    },
    Orchestrator,
};

use axum::{
    body::Bytes,
    error_handling::HandleErrorLayer,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::{BoxError, ServiceBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

type AppState = Arc<Orchestrator>;

/// The body of every failed request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
}

/// A failed request, rendered as a status code and an `ErrorBody`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, kind: &str, error: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                kind: kind.to_owned(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &ErrorBody {
        &self.body
    }
}

impl From<ProtocolError> for ApiError {
    fn from(err: ProtocolError) -> Self {
        Self::new(status_of(&err), err.kind().as_str(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Maps a protocol error to the status it is served with
pub fn status_of(err: &ProtocolError) -> StatusCode {
    if let ProtocolError::EngineFailure {
        fault: Fault::Bridge(BridgeFault::Timeout(_)),
        ..
    } = err
    {
        return StatusCode::GATEWAY_TIMEOUT;
    }
    match err.kind() {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::SequenceError => StatusCode::CONFLICT,
        ErrorKind::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::EngineFault | ErrorKind::BridgeFault | ErrorKind::ProtocolInvariantViolation => {
            StatusCode::BAD_GATEWAY
        }
    }
}

pub fn app(orchestrator: Arc<Orchestrator>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/init_dkg", post(init_dkg))
        .route("/commit", post(commit))
        .route("/finalize_dkg", post(finalize_dkg))
        .layer(CorsLayer::permissive())
        .layer(
            ServiceBuilder::new()
                // Handle errors from middleware
                .layer(HandleErrorLayer::new(handle_error))
                .load_shed()
                .concurrency_limit(config.concurrency_limit)
                .timeout(config.request_timeout()),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(orchestrator)
}

// Bodies are taken raw so that malformed JSON is reported like any other
// invalid input
async fn init_dkg(
    State(orchestrator): State<AppState>,
    body: Bytes,
) -> Result<Json<InitResponse>, ApiError> {
    Ok(Json(orchestrator.handle_init(&body).await?))
}

async fn commit(
    State(orchestrator): State<AppState>,
    body: Bytes,
) -> Result<Json<CommitResponse>, ApiError> {
    Ok(Json(orchestrator.handle_commit(&body).await?))
}

async fn finalize_dkg(
    State(orchestrator): State<AppState>,
    body: Bytes,
) -> Result<Json<FinalizeResponse>, ApiError> {
    Ok(Json(orchestrator.handle_finalize(&body).await?))
}

async fn health_check() -> &'static str {
    "ok"
}

async fn handle_error(error: BoxError) -> ApiError {
    if error.is::<tower::timeout::error::Elapsed>() {
        return ApiError::new(
            StatusCode::REQUEST_TIMEOUT,
            "request_timeout",
            "request timed out",
        );
    }

    if error.is::<tower::load_shed::error::Overloaded>() {
        return ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "overloaded",
            "service is overloaded, try again later",
        );
    }

    tracing::error!(%error, "unhandled middleware error");
    ApiError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal",
        format!("Unhandled internal error: {}", error),
    )
}
