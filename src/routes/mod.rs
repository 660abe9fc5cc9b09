//! HTTP route handlers
//!
//! Handlers take already-extracted inputs (parsed JSON, auth header) and
//! return a complete response. Every response carries CORS headers.

pub mod auth_routes;
pub mod health;
pub mod history;
pub mod predict;

pub use auth_routes::{handle_login, handle_register};
pub use health::{health_check, ping_db};
pub use history::{handle_delete, handle_list, handle_save};
pub use predict::{handle_predict, handle_suggest};

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::types::PolicyError;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 64 * 1024;

const ALLOW_METHODS: &str = "GET, POST, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";

fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

fn with_cors(builder: hyper::http::response::Builder) -> hyper::http::response::Builder {
    builder
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", ALLOW_METHODS)
        .header("Access-Control-Allow-Headers", ALLOW_HEADERS)
}

fn build(builder: hyper::http::response::Builder, body: BoxBody) -> Response<BoxBody> {
    builder.body(body).unwrap_or_else(|e| {
        error!("Failed to build response: {}", e);
        let mut fallback = Response::new(full_body("{}"));
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}

/// JSON response with CORS headers
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    build(
        with_cors(Response::builder().status(status))
            .header("Content-Type", "application/json"),
        full_body(json),
    )
}

/// Map an error to its status and JSON body
///
/// Server-side faults are logged with their detail; the client only sees the
/// generic message.
pub fn error_response(err: PolicyError) -> Response<BoxBody> {
    let status = err.status_code();
    if status.is_server_error() {
        error!(status = status.as_u16(), "Request failed: {}", err);
    } else {
        warn!(status = status.as_u16(), "Request rejected: {}", err);
    }
    json_response(status, &err.to_json())
}

/// Render a handler result
pub fn respond<T: Serialize>(status: StatusCode, result: Result<T, PolicyError>) -> Response<BoxBody> {
    match result {
        Ok(body) => json_response(status, &body),
        Err(e) => error_response(e),
    }
}

pub fn cors_preflight() -> Response<BoxBody> {
    build(
        with_cors(Response::builder().status(StatusCode::NO_CONTENT))
            .header("Access-Control-Max-Age", "86400"),
        full_body(Bytes::new()),
    )
}

pub fn not_found(path: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({ "error": "Not Found", "path": path }),
    )
}

pub fn method_not_allowed() -> Response<BoxBody> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &serde_json::json!({ "error": "Method not allowed" }),
    )
}

/// Read a request body as JSON
///
/// An empty body reads as `{}` so the caller reports the missing fields.
/// Reading stops at the first frame that crosses `MAX_BODY_BYTES`.
pub async fn parse_json_body<B>(body: B) -> Result<Value, PolicyError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let collected = Limited::new(body, MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                PolicyError::BadRequest("Request body too large".into())
            } else {
                PolicyError::BadRequest(format!("Failed to read body: {}", e))
            }
        })?;

    let bytes = collected.to_bytes();

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| PolicyError::BadRequest(format!("JSON inválido: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_parse_json_body() {
        let value = parse_json_body(Full::new(Bytes::from(r#"{"Grupo":"Salud"}"#)))
            .await
            .unwrap();
        assert_eq!(value["Grupo"], "Salud");
    }

    #[tokio::test]
    async fn test_empty_body_reads_as_empty_object() {
        let value = parse_json_body(Full::new(Bytes::new())).await.unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_malformed_and_oversized_bodies() {
        let err = parse_json_body(Full::new(Bytes::from("{nope"))).await.unwrap_err();
        assert!(matches!(err, PolicyError::BadRequest(_)));

        let big = format!(r#"{{"x":"{}"}}"#, "a".repeat(MAX_BODY_BYTES));
        let err = parse_json_body(Full::new(Bytes::from(big))).await.unwrap_err();
        assert!(matches!(err, PolicyError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_oversized_stream_stops_reading() {
        use futures_util::stream;
        use http_body_util::StreamBody;
        use hyper::body::Frame;
        use std::convert::Infallible;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = pulled.clone();
        let frames = stream::iter((0..512).map(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(Frame::data(Bytes::from(vec![b' '; MAX_BODY_BYTES])))
        }));

        let err = parse_json_body(StreamBody::new(frames)).await.unwrap_err();
        match err {
            PolicyError::BadRequest(msg) => assert_eq!(msg, "Request body too large"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(pulled.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_error_response_hides_server_detail() {
        let response = error_response(PolicyError::Internal("secret path /etc".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers()["Access-Control-Allow-Origin"],
            "*"
        );
    }

    #[test]
    fn test_preflight() {
        let response = cors_preflight();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response
            .headers()["Access-Control-Allow-Methods"]
            .to_str()
            .unwrap()
            .contains("DELETE"));
    }
}
