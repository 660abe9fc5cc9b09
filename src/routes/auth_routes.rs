//! Account endpoints
//!
//! - POST /register - create an account
//! - POST /login    - exchange credentials for a token

use bytes::Bytes;
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use serde_json::json;
use std::sync::Arc;

use super::{error_response, json_response, parse_json_body, respond, BoxBody};
use crate::auth::{self, REGISTERED_MESSAGE};
use crate::server::AppState;

/// POST /register
pub async fn handle_register<B>(req: Request<B>, state: Arc<AppState>) -> Response<BoxBody>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body = match parse_json_body(req.into_body()).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    match auth::register(state.users.as_ref(), &body).await {
        Ok(_) => json_response(StatusCode::CREATED, &json!({ "message": REGISTERED_MESSAGE })),
        Err(e) => error_response(e),
    }
}

/// POST /login
pub async fn handle_login<B>(req: Request<B>, state: Arc<AppState>) -> Response<BoxBody>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body = match parse_json_body(req.into_body()).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    respond(
        StatusCode::OK,
        auth::login(state.users.as_ref(), &state.jwt, &body).await,
    )
}
