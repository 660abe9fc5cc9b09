//! Policy dataset index
//!
//! Loads the reference corpus of historical policies once at startup and
//! answers group-scoped lookups. The index is immutable after construction
//! and shared across requests behind an `Arc`.

use encoding_rs::Encoding;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::types::{PolicyError, Result};

/// Header of the objective column
pub const OBJECTIVE_COLUMN: &str = "Objetivo principal";

/// Header of the group column
pub const GROUP_COLUMN: &str = "Grupo";

/// Header of the evaluation narrative column
pub const EVALUATION_COLUMN: &str = "Evaluación";

/// Token marking a successful outcome in an evaluation narrative
pub const SUCCESS_MARKER: &str = "Éxito";

/// Outcome markers recognised when extracting a rationale, in priority order
const RATIONALE_MARKERS: [&str; 2] = ["Éxito:", "Fracaso:"];

/// One historical policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusRow {
    pub objective: String,
    pub group: String,
    pub evaluation: String,
}

impl CorpusRow {
    pub fn new(
        objective: impl Into<String>,
        group: impl Into<String>,
        evaluation: impl Into<String>,
    ) -> Self {
        Self {
            objective: objective.into(),
            group: group.into(),
            evaluation: evaluation.into(),
        }
    }

    /// Whether the narrative reports a successful outcome
    pub fn is_success(&self) -> bool {
        self.evaluation.contains(SUCCESS_MARKER)
    }

    /// Free-text rationale following the first outcome marker, if any
    pub fn rationale(&self) -> Option<String> {
        RATIONALE_MARKERS.iter().find_map(|marker| {
            self.evaluation
                .split_once(marker)
                .map(|(_, rest)| rest.trim().to_string())
        })
    }
}

/// How the corpus file is decoded and split
#[derive(Debug, Clone, Copy)]
pub struct CorpusOptions {
    pub encoding: &'static Encoding,
    pub delimiter: u8,
}

impl CorpusOptions {
    /// Resolve an encoding label (e.g. `latin1`, `utf-8`) and a delimiter
    pub fn new(encoding_label: &str, delimiter: char) -> Result<Self> {
        let encoding = Encoding::for_label(encoding_label.trim().as_bytes()).ok_or_else(|| {
            PolicyError::Config(format!("Unknown corpus encoding '{}'", encoding_label))
        })?;

        if !delimiter.is_ascii() {
            return Err(PolicyError::Config(format!(
                "Corpus delimiter '{}' must be a single ASCII character",
                delimiter
            )));
        }

        Ok(Self {
            encoding,
            delimiter: delimiter as u8,
        })
    }
}

impl Default for CorpusOptions {
    fn default() -> Self {
        Self {
            encoding: encoding_rs::WINDOWS_1252,
            delimiter: b';',
        }
    }
}

/// Read-only index of the reference corpus, keyed by group
#[derive(Debug, Default)]
pub struct PolicyIndex {
    rows: Vec<CorpusRow>,
    by_group: HashMap<String, Vec<usize>>,
}

impl PolicyIndex {
    pub fn from_rows(rows: Vec<CorpusRow>) -> Self {
        let mut by_group: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, row) in rows.iter().enumerate() {
            by_group.entry(row.group.clone()).or_default().push(i);
        }
        Self { rows, by_group }
    }

    /// Decode and parse a delimited table
    pub fn from_bytes(bytes: &[u8], options: &CorpusOptions) -> Result<Self> {
        let (text, used, had_errors) = options.encoding.decode(bytes);
        if had_errors {
            warn!(
                encoding = used.name(),
                "Corpus contained byte sequences invalid for its encoding"
            );
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
                .ok_or_else(|| PolicyError::Config(format!("Corpus is missing column '{}'", name)))
        };
        let objective_idx = column(OBJECTIVE_COLUMN)?;
        let group_idx = column(GROUP_COLUMN)?;
        let evaluation_idx = column(EVALUATION_COLUMN)?;

        let mut rows = Vec::new();
        let mut dropped = 0usize;
        for record in reader.records() {
            let record = record?;
            let cell = |i: usize| record.get(i).filter(|v| !v.trim().is_empty());

            match (cell(objective_idx), cell(group_idx), cell(evaluation_idx)) {
                (Some(objective), Some(group), Some(evaluation)) => {
                    rows.push(CorpusRow::new(objective, group, evaluation));
                }
                _ => dropped += 1,
            }
        }

        if dropped > 0 {
            warn!(dropped, "Dropped incomplete corpus rows");
        }

        Ok(Self::from_rows(rows))
    }

    /// Load the corpus from disk
    pub fn load(path: &Path, options: &CorpusOptions) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            PolicyError::Config(format!("Failed to read corpus {}: {}", path.display(), e))
        })?;
        let index = Self::from_bytes(&bytes, options)?;

        info!(
            path = %path.display(),
            rows = index.len(),
            groups = index.group_count(),
            "Reference corpus loaded"
        );

        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.by_group.len()
    }

    /// Rows whose group equals `group` exactly
    pub fn in_group<'a>(&'a self, group: &str) -> impl Iterator<Item = &'a CorpusRow> + 'a {
        self.by_group
            .get(group)
            .into_iter()
            .flatten()
            .map(move |&i| &self.rows[i])
    }

    /// Rows of `group` whose narrative reports success
    pub fn successful_in_group(&self, group: &str) -> Vec<&CorpusRow> {
        self.in_group(group).filter(|row| row.is_success()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rationale_extraction() {
        let row = CorpusRow::new("X", "Salud", "Éxito: mejora medible ");
        assert_eq!(row.rationale().as_deref(), Some("mejora medible"));

        let row = CorpusRow::new("X", "Salud", "Fracaso: sin fondos");
        assert_eq!(row.rationale().as_deref(), Some("sin fondos"));

        // Everything after the first marker is kept verbatim
        let row = CorpusRow::new("X", "Salud", "Éxito: parcial. Éxito: luego total");
        assert_eq!(
            row.rationale().as_deref(),
            Some("parcial. Éxito: luego total")
        );

        let row = CorpusRow::new("X", "Salud", "Éxito sin delimitador");
        assert!(row.is_success());
        assert_eq!(row.rationale(), None);
    }

    #[test]
    fn test_parse_latin1_table() {
        let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(
            "Objetivo principal;Grupo;Evaluación;Año\n\
             Crear centros de salud;Salud;Éxito: mejora medible;2020\n\
             Subsidiar tarifas;Economía local / Subsidio;Fracaso: costo fiscal;2019\n\
             ;Salud;Éxito: sin objetivo;2018\n",
        );

        let index = PolicyIndex::from_bytes(&bytes, &CorpusOptions::default()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.group_count(), 2);

        let salud: Vec<_> = index.in_group("Salud").collect();
        assert_eq!(salud.len(), 1);
        assert_eq!(salud[0].evaluation, "Éxito: mejora medible");

        let economia: Vec<_> = index.in_group("Economía local / Subsidio").collect();
        assert_eq!(economia[0].objective, "Subsidiar tarifas");
    }

    #[test]
    fn test_parse_utf8_with_comma_delimiter() {
        let options = CorpusOptions::new("utf-8", ',').unwrap();
        let text = "Grupo,Objetivo principal,Evaluación\n\
                    Salud,\"Vacunar, en escuelas\",Éxito: cobertura\n";
        let index = PolicyIndex::from_bytes(text.as_bytes(), &options).unwrap();
        let rows: Vec<_> = index.in_group("Salud").collect();
        assert_eq!(rows[0].objective, "Vacunar, en escuelas");
    }

    #[test]
    fn test_missing_column_is_config_error() {
        let text = "Objetivo principal;Grupo\nX;Salud\n";
        let err = PolicyIndex::from_bytes(text.as_bytes(), &CorpusOptions::default()).unwrap_err();
        assert!(matches!(err, PolicyError::Config(_)));
    }

    #[test]
    fn test_successful_in_group_filters_exactly() {
        let index = PolicyIndex::from_rows(vec![
            CorpusRow::new("A", "Salud", "Éxito: a"),
            CorpusRow::new("B", "Salud", "Fracaso: b"),
            CorpusRow::new("C", "salud", "Éxito: c"),
            CorpusRow::new("D", "Salud / Educación", "Éxito: d"),
        ]);

        let rows = index.successful_in_group("Salud");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].objective, "A");
        assert!(index.successful_in_group("Transporte").is_empty());
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        assert!(CorpusOptions::new("klingon", ';').is_err());
        assert!(CorpusOptions::new("latin1", '§').is_err());
        assert_eq!(
            CorpusOptions::new("ISO-8859-1", ';').unwrap().encoding,
            encoding_rs::WINDOWS_1252
        );
    }
}
