//! Suggestion service
//!
//! Recommends a past successful policy from the same group. The candidate is
//! picked uniformly at random and re-scored through the live model, so the
//! attached probability reflects the current artifact, not the archive.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use super::input::required_text;
use crate::corpus::PolicyIndex;
use crate::model::{ModelAdapter, GROUP_FIELD};
use crate::types::Result;

/// Message returned when no qualifying policy exists
pub const NO_SUGGESTIONS_MESSAGE: &str = "No hay sugerencias para este grupo";

/// A recommended historical policy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    #[serde(rename = "Objetivo principal")]
    pub objective: String,
    #[serde(rename = "Grupo")]
    pub group: String,
    #[serde(rename = "Probabilidad_exito")]
    pub success_probability: f64,
    #[serde(rename = "Evaluacion")]
    pub rationale: Option<String>,
}

/// Either a suggestion or the explicit "nothing to suggest" result
#[derive(Debug, Clone, PartialEq)]
pub enum SuggestionOutcome {
    Suggested(Suggestion),
    Empty,
}

impl SuggestionOutcome {
    pub fn to_json(&self) -> Value {
        match self {
            SuggestionOutcome::Suggested(s) => json!(s),
            SuggestionOutcome::Empty => json!({ "mensaje": NO_SUGGESTIONS_MESSAGE }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SuggestionService {
    index: Arc<PolicyIndex>,
    adapter: ModelAdapter,
}

impl SuggestionService {
    pub fn new(index: Arc<PolicyIndex>, adapter: ModelAdapter) -> Self {
        Self { index, adapter }
    }

    /// Suggest using the thread-local RNG
    pub fn suggest(&self, group: &str) -> Result<SuggestionOutcome> {
        self.suggest_with_rng(group, &mut rand::thread_rng())
    }

    pub fn suggest_with_rng<R: Rng + ?Sized>(
        &self,
        group: &str,
        rng: &mut R,
    ) -> Result<SuggestionOutcome> {
        let candidates = self.index.successful_in_group(group);

        let row = match candidates.choose(rng) {
            Some(row) => *row,
            None => {
                debug!(group, "No successful policies for group");
                return Ok(SuggestionOutcome::Empty);
            }
        };

        let verdict = self.adapter.classify(&row.objective, group)?;

        debug!(
            group,
            candidates = candidates.len(),
            probability = verdict.success_probability,
            "Suggestion selected"
        );

        Ok(SuggestionOutcome::Suggested(Suggestion {
            objective: row.objective.clone(),
            group: group.to_string(),
            success_probability: verdict.success_probability,
            rationale: row.rationale(),
        }))
    }

    /// Validate a raw request body and suggest
    pub fn suggest_raw(&self, raw: &Value) -> Result<SuggestionOutcome> {
        let values = required_text(raw, &[GROUP_FIELD])?;
        self.suggest(values[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusRow;
    use crate::model::tests::fixed_adapter;
    use crate::types::PolicyError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn service(rows: Vec<CorpusRow>) -> SuggestionService {
        SuggestionService::new(Arc::new(PolicyIndex::from_rows(rows)), fixed_adapter(1, 0.8123))
    }

    #[test]
    fn test_single_candidate_scenario() {
        let service = service(vec![CorpusRow::new("X", "Salud", "Éxito: mejora medible")]);

        for _ in 0..10 {
            let outcome = service.suggest("Salud").unwrap();
            assert_eq!(
                outcome,
                SuggestionOutcome::Suggested(Suggestion {
                    objective: "X".into(),
                    group: "Salud".into(),
                    success_probability: 81.23,
                    rationale: Some("mejora medible".into()),
                })
            );
        }
    }

    #[test]
    fn test_empty_when_no_successful_rows() {
        let service = service(vec![
            CorpusRow::new("A", "Salud", "Fracaso: costoso"),
            CorpusRow::new("B", "Transporte", "Éxito: rápido"),
        ]);

        assert_eq!(service.suggest("Salud").unwrap(), SuggestionOutcome::Empty);
        assert_eq!(service.suggest("Vivienda").unwrap(), SuggestionOutcome::Empty);
        assert_eq!(
            service.suggest("Salud").unwrap().to_json(),
            json!({ "mensaje": NO_SUGGESTIONS_MESSAGE })
        );
    }

    #[test]
    fn test_random_choice_stays_within_candidates() {
        let service = service(vec![
            CorpusRow::new("A", "Salud", "Éxito: a"),
            CorpusRow::new("B", "Salud", "Éxito: b"),
            CorpusRow::new("C", "Salud", "Éxito: c"),
            CorpusRow::new("D", "Salud", "Fracaso: d"),
            CorpusRow::new("E", "Educación", "Éxito: e"),
        ]);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            match service.suggest_with_rng("Salud", &mut rng).unwrap() {
                SuggestionOutcome::Suggested(s) => {
                    assert!(["A", "B", "C"].contains(&s.objective.as_str()));
                    assert_eq!(s.group, "Salud");
                }
                SuggestionOutcome::Empty => panic!("expected a suggestion"),
            }
        }
    }

    #[test]
    fn test_success_row_without_delimiter_has_no_rationale() {
        let service = service(vec![CorpusRow::new("X", "Salud", "Éxito rotundo")]);
        match service.suggest("Salud").unwrap() {
            SuggestionOutcome::Suggested(s) => {
                assert_eq!(s.rationale, None);
                assert_eq!(serde_json::to_value(&s).unwrap()["Evaluacion"], Value::Null);
            }
            SuggestionOutcome::Empty => panic!("expected a suggestion"),
        }
    }

    #[test]
    fn test_raw_request_requires_group() {
        let service = service(vec![]);
        assert!(matches!(
            service.suggest_raw(&json!({})),
            Err(PolicyError::MissingFields(_))
        ));
    }
}
