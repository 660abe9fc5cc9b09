//! Health endpoints
//!
//! - /health  - liveness, plus what the process loaded at startup
//! - /ping-db - round trip to the history backend

use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use super::{error_response, json_response, BoxBody};
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub status: &'static str,
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    pub timestamp: String,
    pub mode: &'static str,
    pub history_backend: &'static str,
    pub user_backend: &'static str,
    pub model: String,
    pub corpus: CorpusSummary,
}

#[derive(Serialize)]
pub struct CorpusSummary {
    pub rows: usize,
    pub groups: usize,
}

/// GET /health
pub fn health_check(state: Arc<AppState>) -> Response<BoxBody> {
    let response = HealthResponse {
        healthy: true,
        status: "online",
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if state.args.dev_mode {
            "development"
        } else {
            "production"
        },
        history_backend: state.history.backend(),
        user_backend: state.users.backend(),
        model: state.model_summary.clone(),
        corpus: CorpusSummary {
            rows: state.corpus_rows,
            groups: state.corpus_groups,
        },
    };

    json_response(StatusCode::OK, &response)
}

/// GET /ping-db
pub async fn ping_db(state: Arc<AppState>) -> Response<BoxBody> {
    match state.history.ping().await {
        Ok(()) => {
            let message = match state.history.backend() {
                "mongo" => "Conexión exitosa a MongoDB".to_string(),
                other => format!("Conexión exitosa al almacenamiento ({})", other),
            };
            json_response(StatusCode::OK, &json!({ "message": message }))
        }
        Err(e) => error_response(e),
    }
}
