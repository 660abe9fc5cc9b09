//! Model artifact adapter
//!
//! Wraps an opaque trained classifier behind a stable
//! `classify(objective, group) -> Verdict` contract. Any artifact that
//! implements [`Classifier`] can be plugged in; the adapter only relies on the
//! binary decision, the class-1 probability and the declared feature schema.

pub mod linear;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::types::{PolicyError, Result};

pub use linear::{LinearTextArtifact, LinearTextModel, TermWeight};

/// Feature name for the free-text objective
pub const OBJECTIVE_FIELD: &str = "Objetivo principal";

/// Feature name for the thematic group label
pub const GROUP_FIELD: &str = "Grupo";

/// Exact feature schema a trained artifact must declare
pub const FEATURE_SCHEMA: [&str; 2] = [OBJECTIVE_FIELD, GROUP_FIELD];

/// The single feature record handed to a classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRecord {
    #[serde(rename = "Objetivo principal")]
    pub objective: String,
    #[serde(rename = "Grupo")]
    pub group: String,
}

impl FeatureRecord {
    pub fn new(objective: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            objective: objective.into(),
            group: group.into(),
        }
    }
}

/// Binary outcome label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "Éxito")]
    Success,
    #[serde(rename = "Fracaso")]
    Failure,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Success => "Éxito",
            Label::Failure => "Fracaso",
        }
    }

    /// Parse the wire representation (`"Éxito"` / `"Fracaso"`)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Éxito" => Some(Label::Success),
            "Fracaso" => Some(Label::Failure),
            _ => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier output for one query
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Verdict {
    #[serde(rename = "prediccion")]
    pub label: Label,
    /// Success probability as a percentage in [0, 100], 2 decimals
    #[serde(rename = "probabilidad_exito")]
    pub success_probability: f64,
}

/// A trained binary classifier over [`FeatureRecord`]s
pub trait Classifier: Send + Sync {
    /// Feature names the artifact was trained on, in order
    fn feature_names(&self) -> &[String];

    /// Binary decision: 1 = success, 0 = failure
    fn predict(&self, record: &FeatureRecord) -> Result<u8>;

    /// Raw class-1 (success) probability in [0, 1]
    fn predict_proba(&self, record: &FeatureRecord) -> Result<f64>;

    /// Short human readable description for startup logs
    fn describe(&self) -> String {
        "classifier".to_string()
    }
}

/// Highest percentage a Failure verdict can carry
pub const MAX_FAILURE_PERCENTAGE: f64 = 49.99;

/// Round a raw probability to a percentage with 2 decimals
pub fn to_percentage(probability: f64) -> f64 {
    (probability * 100.0 * 100.0).round() / 100.0
}

/// Stable classification contract over a loaded artifact
#[derive(Clone)]
pub struct ModelAdapter {
    classifier: Arc<dyn Classifier>,
}

impl fmt::Debug for ModelAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelAdapter")
            .field("classifier", &self.classifier.describe())
            .finish()
    }
}

impl ModelAdapter {
    /// Wrap a classifier, rejecting artifacts whose feature schema differs
    pub fn new(classifier: Arc<dyn Classifier>) -> Result<Self> {
        let names = classifier.feature_names();
        let matches = names.len() == FEATURE_SCHEMA.len()
            && names.iter().zip(FEATURE_SCHEMA).all(|(a, b)| a == b);

        if !matches {
            return Err(PolicyError::Config(format!(
                "Model feature schema {:?} does not match expected {:?}",
                names, FEATURE_SCHEMA
            )));
        }

        Ok(Self { classifier })
    }

    /// Load the on-disk artifact and wrap it
    pub fn load(path: &Path) -> Result<Self> {
        let model = LinearTextModel::from_path(path)?;
        Self::new(Arc::new(model))
    }

    pub fn describe(&self) -> String {
        self.classifier.describe()
    }

    /// Score one `(objective, group)` pair
    pub fn classify(&self, objective: &str, group: &str) -> Result<Verdict> {
        let mut missing = Vec::new();
        if objective.trim().is_empty() {
            missing.push(OBJECTIVE_FIELD);
        }
        if group.trim().is_empty() {
            missing.push(GROUP_FIELD);
        }
        if !missing.is_empty() {
            return Err(PolicyError::missing(&missing));
        }

        let record = FeatureRecord::new(objective, group);

        let decision = self.classifier.predict(&record)?;
        let probability = self.classifier.predict_proba(&record)?;

        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(PolicyError::Inference(format!(
                "Classifier returned invalid probability {}",
                probability
            )));
        }

        let label = match decision {
            1 => Label::Success,
            0 => Label::Failure,
            other => {
                return Err(PolicyError::Inference(format!(
                    "Classifier returned unknown class {}",
                    other
                )))
            }
        };

        // A tie at exactly 0.5 may go either way
        let disagrees = (label == Label::Success && probability < 0.5)
            || (label == Label::Failure && probability > 0.5);
        if disagrees {
            return Err(PolicyError::Inference(format!(
                "Classifier decision {} disagrees with probability {}",
                decision, probability
            )));
        }

        // A Failure never reports 50% or more, even when rounding lands on it
        let mut success_probability = to_percentage(probability);
        if label == Label::Failure && success_probability >= 50.0 {
            success_probability = MAX_FAILURE_PERCENTAGE;
        }

        Ok(Verdict {
            label,
            success_probability,
        })
    }
}
