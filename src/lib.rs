//! Policy verdict - outcome prediction for public policy proposals
//!
//! Scores a policy objective for a thematic group with a trained classifier,
//! suggests past successful policies for a group, and keeps a per-user
//! history of saved predictions.
//!
//! ## Components
//!
//! - **Model**: classifier contract and the on-disk linear text artifact
//! - **Corpus**: read-only index of evaluated policies, loaded at startup
//! - **Services**: prediction and suggestion over raw JSON requests
//! - **History**: owner-scoped records in MongoDB, a JSON file, or memory
//! - **Auth**: accounts, Argon2id passwords and JWT sessions
//! - **Server/Routes**: hyper HTTP front end with CORS

pub mod auth;
pub mod config;
pub mod corpus;
pub mod db;
pub mod history;
pub mod logging;
pub mod model;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{route, run, AppState};
pub use types::{PolicyError, Result};
