//! Public scoring endpoints
//!
//! - POST /predict - score an objective for a group
//! - POST /suggest - a past successful policy for a group, re-scored

use bytes::Bytes;
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;

use super::{error_response, json_response, parse_json_body, respond, BoxBody};
use crate::server::AppState;

/// POST /predict
pub async fn handle_predict<B>(req: Request<B>, state: Arc<AppState>) -> Response<BoxBody>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body = match parse_json_body(req.into_body()).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    respond(StatusCode::OK, state.prediction.predict(&body))
}

/// POST /suggest
///
/// An empty result is a 200 with a `mensaje` body, not an error.
pub async fn handle_suggest<B>(req: Request<B>, state: Arc<AppState>) -> Response<BoxBody>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body = match parse_json_body(req.into_body()).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    match state.suggestion.suggest_raw(&body) {
        Ok(outcome) => json_response(StatusCode::OK, &outcome.to_json()),
        Err(e) => error_response(e),
    }
}
