//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo, one task per connection. Routing lives in
//! [`route`], which is generic over the request body so it can be driven
//! without a socket.

use bytes::Bytes;
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::{JwtValidator, UserStore};
use crate::config::Args;
use crate::corpus::PolicyIndex;
use crate::history::HistoryStore;
use crate::model::ModelAdapter;
use crate::routes::{self, BoxBody};
use crate::services::{PredictionService, SuggestionService};
use crate::types::PolicyError;

/// Shared application state
///
/// Built once at startup; nothing in it is mutated afterwards except
/// through the stores' own synchronization.
pub struct AppState {
    pub args: Args,
    pub prediction: PredictionService,
    pub suggestion: SuggestionService,
    pub history: Arc<dyn HistoryStore>,
    pub users: Arc<dyn UserStore>,
    pub jwt: JwtValidator,
    pub model_summary: String,
    pub corpus_rows: usize,
    pub corpus_groups: usize,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        args: Args,
        adapter: ModelAdapter,
        index: Arc<PolicyIndex>,
        history: Arc<dyn HistoryStore>,
        users: Arc<dyn UserStore>,
    ) -> Result<Self, PolicyError> {
        let jwt = match (&args.jwt_secret, args.dev_mode) {
            (Some(secret), _) => JwtValidator::new(secret.clone(), args.jwt_expiry_seconds)?,
            (None, true) => {
                warn!("No JWT_SECRET_KEY set, using the built-in dev secret");
                JwtValidator::new_dev(args.jwt_expiry_seconds)
            }
            (None, false) => {
                return Err(PolicyError::Config(
                    "JWT_SECRET_KEY is required in production mode".into(),
                ))
            }
        };

        Ok(Self {
            model_summary: adapter.describe(),
            corpus_rows: index.len(),
            corpus_groups: index.group_count(),
            prediction: PredictionService::new(adapter.clone()),
            suggestion: SuggestionService::new(index, adapter),
            history,
            users,
            jwt,
            args,
            started_at: Instant::now(),
        })
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), PolicyError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Policy verdict listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - not for production use");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    info!("[{}] {} {}", addr, req.method(), req.uri().path());
    Ok(route(state, req).await)
}

/// Dispatch a request to its handler
pub async fn route<B>(state: Arc<AppState>, req: Request<B>) -> Response<BoxBody>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    if method == Method::OPTIONS {
        return routes::cors_preflight();
    }

    match (&method, path.as_str()) {
        (&Method::POST, "/predict") => routes::handle_predict(req, state).await,
        (&Method::POST, "/suggest") => routes::handle_suggest(req, state).await,
        (&Method::POST, "/save") => routes::handle_save(req, state).await,
        (&Method::GET, "/history") => routes::handle_list(req, state).await,
        (&Method::POST, "/register") => routes::handle_register(req, state).await,
        (&Method::POST, "/login") => routes::handle_login(req, state).await,
        (&Method::GET, "/ping-db") => routes::ping_db(state).await,
        (&Method::GET, "/health") => routes::health_check(state),

        (_, "/predict")
        | (_, "/suggest")
        | (_, "/save")
        | (_, "/history")
        | (_, "/register")
        | (_, "/login")
        | (_, "/ping-db")
        | (_, "/health") => routes::method_not_allowed(),

        (_, p) => match history_id(p) {
            Some(id) if method == Method::DELETE => routes::handle_delete(req, state, id).await,
            Some(_) => routes::method_not_allowed(),
            None => routes::not_found(p),
        },
    }
}

/// `{id}` from `/history/{id}`
fn history_id(path: &str) -> Option<&str> {
    path.strip_prefix("/history/")
        .filter(|id| !id.is_empty() && !id.contains('/'))
}
