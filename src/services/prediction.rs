//! Prediction service
//!
//! Validates the raw request, builds the query and delegates to the model
//! adapter. Prediction never persists anything; saving is a separate action.

use serde_json::Value;
use tracing::debug;

use super::input::required_text;
use crate::model::{ModelAdapter, Verdict, GROUP_FIELD, OBJECTIVE_FIELD};
use crate::types::Result;

/// Objective plus group, as submitted by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyQuery {
    pub objective: String,
    pub group: String,
}

impl PolicyQuery {
    /// Validate a raw JSON body into a query
    pub fn from_raw(raw: &Value) -> Result<Self> {
        let values = required_text(raw, &[OBJECTIVE_FIELD, GROUP_FIELD])?;
        Ok(Self {
            objective: values[0].to_string(),
            group: values[1].to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct PredictionService {
    adapter: ModelAdapter,
}

impl PredictionService {
    pub fn new(adapter: ModelAdapter) -> Self {
        Self { adapter }
    }

    pub fn predict_query(&self, query: &PolicyQuery) -> Result<Verdict> {
        let verdict = self.adapter.classify(&query.objective, &query.group)?;
        debug!(
            group = %query.group,
            label = %verdict.label,
            probability = verdict.success_probability,
            "Prediction computed"
        );
        Ok(verdict)
    }

    /// Validate and score a raw request body
    pub fn predict(&self, raw: &Value) -> Result<Verdict> {
        let query = PolicyQuery::from_raw(raw)?;
        self.predict_query(&query)
    }
}
