//! Database schemas
//!
//! MongoDB document structures for users and saved predictions.

mod prediction;
mod user;

pub use prediction::{PredictionDoc, PREDICTION_COLLECTION};
pub use user::{UserDoc, USER_COLLECTION};
