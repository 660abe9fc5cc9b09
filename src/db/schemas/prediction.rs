//! Saved prediction document schema
//!
//! Field names match the `predicciones` collection written by earlier
//! deployments, so existing history stays readable.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;

/// Collection name for saved predictions
pub const PREDICTION_COLLECTION: &str = "predicciones";

/// Saved prediction stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PredictionDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Owning user ID (token subject)
    pub user_id: String,

    pub objetivo: String,

    pub grupo: String,

    /// "Éxito" or "Fracaso"
    pub prediccion: String,

    /// Percentage, 2 decimals
    pub probabilidad_exito: f64,

    /// Real-world outcome, when known
    #[serde(default)]
    pub resultado_real: Option<String>,

    /// Creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fecha: Option<DateTime>,
}

impl IntoIndexes for PredictionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "user_id": 1, "_id": 1 },
            Some(
                IndexOptions::builder()
                    .name("user_id_index".to_string())
                    .build(),
            ),
        )]
    }
}
