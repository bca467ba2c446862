//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::game::round::RoundPhase;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = match &state.config.client_origin {
        // Comma-separated allow-list
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
                .collect();
            CorsLayer::new().allow_origin(allowed_origins)
        }
        None => CorsLayer::new().allow_origin(Any),
    }
    .allow_methods([Method::GET, Method::OPTIONS])
    .allow_headers([header::CONTENT_TYPE]);

    // Browser client bundle; `/` resolves to index.html
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .fallback_service(static_files)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    participants: usize,
    round: u64,
    phase: &'static str,
    time_left: u32,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let round = state.session.round_status();
    let status = if state.session.is_closed() {
        "degraded"
    } else {
        "ok"
    };

    Json(HealthResponse {
        status,
        uptime_secs: uptime_secs(),
        participants: state.session.participant_count(),
        round: round.round,
        phase: match round.phase {
            RoundPhase::Active { .. } => "active",
            RoundPhase::Ended { .. } => "ended",
        },
        time_left: round.time_left,
    })
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Session is not accepting connections")]
    Unavailable,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, Json(body)).into_response()
    }
}
