//! Owner-scoped prediction history
//!
//! Records are append-only and owned by the identity that saved them. Every
//! store operation takes the caller's [`OwnerId`] explicitly; a record that
//! does not exist and a record owned by someone else are indistinguishable
//! to the caller (both surface as the same `NotFound`).
//!
//! Backends:
//! - [`MongoHistoryStore`]: `predicciones` collection in MongoDB
//! - [`FileHistoryStore`]: a single JSON file on local disk
//! - [`MemoryHistoryStore`]: process memory, for dev mode and tests

pub mod file;
pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

use crate::model::{Label, GROUP_FIELD, OBJECTIVE_FIELD};
use crate::services::input::{check_required, require_object, text_field};
use crate::types::{PolicyError, Result};

pub use file::FileHistoryStore;
pub use memory::MemoryHistoryStore;
pub use mongo::MongoHistoryStore;

/// Request key for the predicted label
pub const PREDICTION_FIELD: &str = "Prediccion";

/// Request key for the predicted success probability
pub const PROBABILITY_FIELD: &str = "Probabilidad_exito";

/// Request key for the real-world outcome
pub const OUTCOME_FIELD: &str = "Resultado_real";

/// How timestamps are rendered in history responses
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const NOT_FOUND_MESSAGE: &str = "No se encontró el registro o no pertenece al usuario";

/// Opaque identity of the caller, supplied by the auth layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Real-world outcome attached to a saved prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "Éxito")]
    Success,
    #[serde(rename = "Fracaso")]
    Failure,
    #[serde(rename = "Desconocido", alias = "unknown")]
    Unknown,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "Éxito",
            Outcome::Failure => "Fracaso",
            Outcome::Unknown => "Desconocido",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Éxito" => Some(Outcome::Success),
            "Fracaso" => Some(Outcome::Failure),
            "Desconocido" | "unknown" => Some(Outcome::Unknown),
            _ => None,
        }
    }
}

/// Round a percentage to 2 decimals
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Validated content of a save request
#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryRecord {
    pub objective: String,
    pub group: String,
    pub predicted_label: Label,
    pub predicted_probability: f64,
    pub actual_outcome: Option<Outcome>,
}

impl NewHistoryRecord {
    /// Validate a raw save request body
    pub fn from_raw(raw: &Value) -> Result<Self> {
        let map = require_object(raw)?;
        check_required(
            map,
            &[OBJECTIVE_FIELD, GROUP_FIELD, PREDICTION_FIELD, PROBABILITY_FIELD],
        )?;

        let objective = text_field(map, OBJECTIVE_FIELD)?.to_string();
        let group = text_field(map, GROUP_FIELD)?.to_string();

        let label_text = text_field(map, PREDICTION_FIELD)?;
        let predicted_label = Label::parse(label_text).ok_or_else(|| {
            PolicyError::BadRequest(format!(
                "'{}' debe ser \"Éxito\" o \"Fracaso\"",
                PREDICTION_FIELD
            ))
        })?;

        let predicted_probability = probability_field(map)?;
        let actual_outcome = outcome_field(map)?;

        Ok(Self {
            objective,
            group,
            predicted_label,
            predicted_probability,
            actual_outcome,
        })
    }
}

fn probability_field(map: &Map<String, Value>) -> Result<f64> {
    let invalid = || {
        PolicyError::BadRequest(format!(
            "'{}' debe ser un número entre 0 y 100",
            PROBABILITY_FIELD
        ))
    };

    let value = match map.get(PROBABILITY_FIELD) {
        Some(Value::Number(n)) => n.as_f64().ok_or_else(invalid)?,
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };

    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(invalid());
    }

    Ok(value)
}

fn outcome_field(map: &Map<String, Value>) -> Result<Option<Outcome>> {
    match map.get(OUTCOME_FIELD) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Outcome::parse(s).map(Some).ok_or_else(|| {
            PolicyError::BadRequest(format!(
                "'{}' debe ser \"Éxito\", \"Fracaso\" o \"Desconocido\"",
                OUTCOME_FIELD
            ))
        }),
        Some(_) => Err(PolicyError::BadRequest(format!(
            "El campo '{}' debe ser texto",
            OUTCOME_FIELD
        ))),
    }
}

/// A persisted prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub owner_id: OwnerId,
    pub objective: String,
    pub group: String,
    pub predicted_label: Label,
    pub predicted_probability: f64,
    #[serde(default)]
    pub actual_outcome: Option<Outcome>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl HistoryRecord {
    /// Stamp a new record with a fresh id and creation time
    pub fn create(owner: &OwnerId, new: NewHistoryRecord) -> Self {
        Self {
            id: new_record_id(),
            owner_id: owner.clone(),
            objective: new.objective,
            group: new.group,
            predicted_label: new.predicted_label,
            predicted_probability: round2(new.predicted_probability),
            actual_outcome: new.actual_outcome,
            // Millisecond precision, same as BSON dates
            created_at: Some(Utc::now().trunc_subsecs(3)),
        }
    }

    pub fn rendered_timestamp(&self) -> Option<String> {
        self.created_at
            .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
    }

    /// Response shape for history listings
    pub fn to_json(&self) -> Value {
        json!({
            "_id": self.id,
            "user_id": self.owner_id,
            "objetivo": self.objective,
            "grupo": self.group,
            "prediccion": self.predicted_label,
            "probabilidad_exito": self.predicted_probability,
            "resultado_real": self.actual_outcome,
            "fecha": self.rendered_timestamp(),
        })
    }
}

/// Fresh opaque record identifier (24 hex characters)
pub fn new_record_id() -> String {
    ObjectId::new().to_hex()
}

/// The one error every failed delete produces
pub fn record_not_found() -> PolicyError {
    PolicyError::NotFound(NOT_FOUND_MESSAGE.to_string())
}

/// Storage for owner-scoped history records
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Short backend name for logs and health output
    fn backend(&self) -> &'static str;

    /// Persist a new record for `owner`; never overwrites
    async fn append(&self, owner: &OwnerId, record: NewHistoryRecord) -> Result<HistoryRecord>;

    /// All records of `owner`, in insertion order
    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<HistoryRecord>>;

    /// Delete `id` only if it belongs to `owner`
    async fn delete_by_owner_and_id(&self, owner: &OwnerId, id: &str) -> Result<()>;

    /// Check that the backing medium is reachable
    async fn ping(&self) -> Result<()>;
}
