//! Database layer
//!
//! MongoDB storage for users and saved predictions.

pub mod mongo;
pub mod schemas;

pub use mongo::{redact_uri, MongoClient, MongoCollection};
pub use schemas::{PredictionDoc, UserDoc};
