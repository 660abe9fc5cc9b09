//! Prediction and suggestion services
//!
//! Both services are built once at startup over the shared model adapter
//! (and, for suggestions, the reference corpus) and never mutated.

pub mod input;
pub mod prediction;
pub mod suggestion;

pub use prediction::{PolicyQuery, PredictionService};
pub use suggestion::{Suggestion, SuggestionOutcome, SuggestionService, NO_SUGGESTIONS_MESSAGE};
