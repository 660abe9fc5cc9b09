//! Saved prediction endpoints (authenticated)
//!
//! - POST   /save          - store a prediction for the caller
//! - GET    /history       - the caller's records, oldest first
//! - DELETE /history/{id}  - remove one of the caller's records
//!
//! The token is checked before the body is read.

use bytes::Bytes;
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use super::{error_response, json_response, parse_json_body, BoxBody};
use crate::auth::authenticate;
use crate::history::{HistoryRecord, NewHistoryRecord};
use crate::server::AppState;

pub const SAVED_MESSAGE: &str = "Predicción guardada con éxito";
pub const DELETED_MESSAGE: &str = "Registro eliminado correctamente";

fn get_auth_header<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// POST /save
pub async fn handle_save<B>(req: Request<B>, state: Arc<AppState>) -> Response<BoxBody>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let owner = match authenticate(&state.jwt, get_auth_header(&req)) {
        Ok(o) => o,
        Err(e) => return error_response(e),
    };

    let body = match parse_json_body(req.into_body()).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    let record = match NewHistoryRecord::from_raw(&body) {
        Ok(r) => r,
        Err(e) => return error_response(e),
    };

    match state.history.append(&owner, record).await {
        Ok(saved) => {
            info!(owner = %owner, id = %saved.id, "Prediction saved");
            json_response(
                StatusCode::CREATED,
                &json!({ "message": SAVED_MESSAGE, "_id": saved.id }),
            )
        }
        Err(e) => error_response(e),
    }
}

/// GET /history
pub async fn handle_list<B>(req: Request<B>, state: Arc<AppState>) -> Response<BoxBody> {
    let owner = match authenticate(&state.jwt, get_auth_header(&req)) {
        Ok(o) => o,
        Err(e) => return error_response(e),
    };

    match state.history.list_by_owner(&owner).await {
        Ok(records) => {
            let body: Vec<_> = records.iter().map(HistoryRecord::to_json).collect();
            json_response(StatusCode::OK, &body)
        }
        Err(e) => error_response(e),
    }
}

/// DELETE /history/{id}
pub async fn handle_delete<B>(
    req: Request<B>,
    state: Arc<AppState>,
    id: &str,
) -> Response<BoxBody> {
    let owner = match authenticate(&state.jwt, get_auth_header(&req)) {
        Ok(o) => o,
        Err(e) => return error_response(e),
    };

    match state.history.delete_by_owner_and_id(&owner, id).await {
        Ok(()) => {
            info!(owner = %owner, id, "Prediction deleted");
            json_response(StatusCode::OK, &json!({ "message": DELETED_MESSAGE }))
        }
        Err(e) => error_response(e),
    }
}
