//! Linear text model artifact
//!
//! A JSON artifact holding a TF-IDF vocabulary with per-term weights, a
//! weight per known group label, and an intercept. Scoring mirrors the shape
//! of the offline pipeline: TF-IDF over the objective text, one-hot group
//! encoding that ignores unseen labels, then a logistic link.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use super::{Classifier, FeatureRecord};
use crate::types::{PolicyError, Result};

/// Per-term IDF and linear weight
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TermWeight {
    pub idf: f64,
    pub weight: f64,
}

/// Serialized form of the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearTextArtifact {
    pub format: String,
    pub version: u32,
    pub features: Vec<String>,
    #[serde(default)]
    pub vocabulary: HashMap<String, TermWeight>,
    #[serde(default)]
    pub groups: HashMap<String, f64>,
    #[serde(default)]
    pub intercept: f64,
    #[serde(default)]
    pub sublinear_tf: bool,
}

/// Loaded, immutable linear text classifier
#[derive(Debug)]
pub struct LinearTextModel {
    artifact: LinearTextArtifact,
    token_pattern: Regex,
}

impl LinearTextModel {
    pub const FORMAT: &'static str = "policy-linear";
    pub const VERSION: u32 = 1;

    /// Validate an artifact and build the model
    pub fn from_artifact(artifact: LinearTextArtifact) -> Result<Self> {
        if artifact.format != Self::FORMAT {
            return Err(PolicyError::Config(format!(
                "Unsupported model format '{}' (expected '{}')",
                artifact.format,
                Self::FORMAT
            )));
        }
        if artifact.version != Self::VERSION {
            return Err(PolicyError::Config(format!(
                "Unsupported model version {} (expected {})",
                artifact.version,
                Self::VERSION
            )));
        }
        if !artifact.intercept.is_finite() {
            return Err(PolicyError::Config("Model intercept is not finite".into()));
        }
        if let Some((term, _)) = artifact
            .vocabulary
            .iter()
            .find(|(_, w)| !w.idf.is_finite() || !w.weight.is_finite())
        {
            return Err(PolicyError::Config(format!(
                "Model term '{}' has a non-finite weight",
                term
            )));
        }
        if let Some((group, _)) = artifact.groups.iter().find(|(_, w)| !w.is_finite()) {
            return Err(PolicyError::Config(format!(
                "Model group '{}' has a non-finite weight",
                group
            )));
        }

        // Default TF-IDF token pattern: two or more word characters
        let token_pattern = Regex::new(r"\b\w\w+\b")
            .map_err(|e| PolicyError::Config(format!("Invalid token pattern: {}", e)))?;

        Ok(Self {
            artifact,
            token_pattern,
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let artifact: LinearTextArtifact = serde_json::from_str(json)
            .map_err(|e| PolicyError::Config(format!("Malformed model artifact: {}", e)))?;
        Self::from_artifact(artifact)
    }

    /// Load a model artifact from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            PolicyError::Config(format!(
                "Failed to read model artifact {}: {}",
                path.display(),
                e
            ))
        })?;
        let model = Self::from_json(&json)?;

        info!(
            path = %path.display(),
            terms = model.artifact.vocabulary.len(),
            groups = model.artifact.groups.len(),
            "Model artifact loaded"
        );

        Ok(model)
    }

    pub fn artifact(&self) -> &LinearTextArtifact {
        &self.artifact
    }

    /// Lowercased tokens of the objective text
    fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        self.token_pattern
            .find_iter(&lowered)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Dot product of the L2-normalised TF-IDF vector with the term weights
    fn text_contribution(&self, text: &str) -> f64 {
        let mut counts: HashMap<String, f64> = HashMap::new();
        for token in self.tokenize(text) {
            if self.artifact.vocabulary.contains_key(&token) {
                *counts.entry(token).or_insert(0.0) += 1.0;
            }
        }

        if counts.is_empty() {
            return 0.0;
        }

        let mut values = Vec::with_capacity(counts.len());
        for (token, count) in &counts {
            let term = &self.artifact.vocabulary[token];
            let tf = if self.artifact.sublinear_tf {
                1.0 + count.ln()
            } else {
                *count
            };
            values.push((tf * term.idf, term.weight));
        }

        let norm = values.iter().map(|(v, _)| v * v).sum::<f64>().sqrt();
        if norm == 0.0 {
            return 0.0;
        }

        values.iter().map(|(v, w)| (v / norm) * w).sum()
    }

    fn decision_score(&self, record: &FeatureRecord) -> f64 {
        let group = self
            .artifact
            .groups
            .get(&record.group)
            .copied()
            .unwrap_or(0.0);
        self.artifact.intercept + self.text_contribution(&record.objective) + group
    }
}

impl Classifier for LinearTextModel {
    fn feature_names(&self) -> &[String] {
        &self.artifact.features
    }

    fn predict(&self, record: &FeatureRecord) -> Result<u8> {
        let probability = self.predict_proba(record)?;
        Ok(if probability >= 0.5 { 1 } else { 0 })
    }

    fn predict_proba(&self, record: &FeatureRecord) -> Result<f64> {
        let score = self.decision_score(record);
        if !score.is_finite() {
            return Err(PolicyError::Inference(format!(
                "Decision score is not finite for group '{}'",
                record.group
            )));
        }
        Ok(1.0 / (1.0 + (-score).exp()))
    }

    fn describe(&self) -> String {
        format!(
            "{} v{} ({} terms, {} groups)",
            self.artifact.format,
            self.artifact.version,
            self.artifact.vocabulary.len(),
            self.artifact.groups.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Label, ModelAdapter};
    use std::io::Write;
    use std::sync::Arc;

    const ARTIFACT: &str = r#"{
        "format": "policy-linear",
        "version": 1,
        "features": ["Objetivo principal", "Grupo"],
        "vocabulary": {
            "salud": {"idf": 1.5, "weight": 2.0},
            "escuelas": {"idf": 1.2, "weight": 1.0},
            "subsidio": {"idf": 2.0, "weight": -3.0},
            "educación": {"idf": 1.0, "weight": 0.5}
        },
        "groups": {"Salud / Educación": 0.8, "Economía local / Subsidio": -0.6},
        "intercept": -0.2
    }"#;

    fn model() -> LinearTextModel {
        LinearTextModel::from_json(ARTIFACT).unwrap()
    }

    #[test]
    fn test_tokenize_lowercases_and_keeps_accents() {
        let tokens = model().tokenize("Crear centros de EDUCACIÓN y salud, a");
        assert_eq!(tokens, vec!["crear", "centros", "de", "educación", "salud"]);
    }

    #[test]
    fn test_positive_terms_raise_probability() {
        let m = model();
        let good = m
            .predict_proba(&FeatureRecord::new("salud en escuelas", "Salud / Educación"))
            .unwrap();
        let bad = m
            .predict_proba(&FeatureRecord::new("subsidio", "Economía local / Subsidio"))
            .unwrap();
        assert!(good > 0.5);
        assert!(bad < 0.5);
        assert_eq!(m.predict(&FeatureRecord::new("subsidio", "x")).unwrap(), 0);
    }

    #[test]
    fn test_unseen_group_and_words_tolerated() {
        let m = model();
        let p = m
            .predict_proba(&FeatureRecord::new("zzz qqq", "Grupo inexistente"))
            .unwrap();
        let expected = 1.0 / (1.0 + (0.2f64).exp());
        assert!((p - expected).abs() < 1e-12);
    }

    #[test]
    fn test_tfidf_is_l2_normalised() {
        let m = model();
        // A single known term normalises to 1.0 no matter how often it repeats
        let once = m.text_contribution("salud");
        let thrice = m.text_contribution("salud salud salud");
        assert!((once - 2.0).abs() < 1e-12);
        assert!((thrice - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_unknown_format_and_version() {
        let wrong_format = ARTIFACT.replace("policy-linear", "pickle");
        assert!(matches!(
            LinearTextModel::from_json(&wrong_format),
            Err(PolicyError::Config(_))
        ));

        let wrong_version = ARTIFACT.replace("\"version\": 1", "\"version\": 7");
        assert!(matches!(
            LinearTextModel::from_json(&wrong_version),
            Err(PolicyError::Config(_))
        ));

        assert!(matches!(
            LinearTextModel::from_json("not json"),
            Err(PolicyError::Config(_))
        ));
    }

    #[test]
    fn test_renamed_feature_rejected_by_adapter() {
        let renamed = ARTIFACT.replace("\"Grupo\"]", "\"grupo\"]");
        let m = LinearTextModel::from_json(&renamed).unwrap();
        assert!(matches!(
            ModelAdapter::new(Arc::new(m)),
            Err(PolicyError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_path_and_classify() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(ARTIFACT.as_bytes()).unwrap();

        let adapter = ModelAdapter::load(file.path()).unwrap();
        let verdict = adapter
            .classify("Crear centros de salud mental en escuelas", "Salud / Educación")
            .unwrap();
        assert_eq!(verdict.label, Label::Success);
        assert!(verdict.success_probability >= 50.0 && verdict.success_probability <= 100.0);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = LinearTextModel::from_path(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, PolicyError::Config(_)));
    }
}
