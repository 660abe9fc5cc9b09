//! MongoDB history store
//!
//! One document per saved prediction in the `predicciones` collection. The
//! owner filter is part of every query, including the delete.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use tracing::{debug, error};

use super::{record_not_found, HistoryRecord, HistoryStore, NewHistoryRecord, OwnerId, Outcome};
use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::schemas::{PredictionDoc, PREDICTION_COLLECTION};
use crate::model::Label;
use crate::types::{PolicyError, Result};

pub struct MongoHistoryStore {
    client: MongoClient,
    collection: MongoCollection<PredictionDoc>,
}

impl MongoHistoryStore {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        let collection = client
            .collection::<PredictionDoc>(PREDICTION_COLLECTION)
            .await?;
        Ok(Self {
            client: client.clone(),
            collection,
        })
    }
}

impl From<&HistoryRecord> for PredictionDoc {
    fn from(record: &HistoryRecord) -> Self {
        Self {
            _id: ObjectId::parse_str(&record.id).ok(),
            user_id: record.owner_id.as_str().to_string(),
            objetivo: record.objective.clone(),
            grupo: record.group.clone(),
            prediccion: record.predicted_label.as_str().to_string(),
            probabilidad_exito: record.predicted_probability,
            resultado_real: record.actual_outcome.map(|o| o.as_str().to_string()),
            fecha: record.created_at.map(bson::DateTime::from_chrono),
        }
    }
}

impl TryFrom<PredictionDoc> for HistoryRecord {
    type Error = PolicyError;

    fn try_from(doc: PredictionDoc) -> Result<Self> {
        let id = doc
            ._id
            .ok_or_else(|| PolicyError::Internal("Stored prediction has no _id".into()))?;
        let predicted_label = Label::parse(&doc.prediccion).ok_or_else(|| {
            PolicyError::Internal(format!("Unknown stored label '{}'", doc.prediccion))
        })?;
        // Unrecognised outcomes from older writers are kept as unknown
        let actual_outcome = doc
            .resultado_real
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| Outcome::parse(s).unwrap_or(Outcome::Unknown));

        Ok(Self {
            id: id.to_hex(),
            owner_id: OwnerId::new(doc.user_id),
            objective: doc.objetivo,
            group: doc.grupo,
            predicted_label,
            predicted_probability: doc.probabilidad_exito,
            actual_outcome,
            created_at: doc.fecha.map(|d| d.to_chrono()),
        })
    }
}

/// Every stored document must convert; a listing never drops records
fn records_from_docs(docs: Vec<PredictionDoc>) -> Result<Vec<HistoryRecord>> {
    docs.into_iter().map(HistoryRecord::try_from).collect()
}

#[async_trait]
impl HistoryStore for MongoHistoryStore {
    fn backend(&self) -> &'static str {
        "mongo"
    }

    async fn append(&self, owner: &OwnerId, record: NewHistoryRecord) -> Result<HistoryRecord> {
        let record = HistoryRecord::create(owner, record);
        let inserted = self.collection.insert_one(PredictionDoc::from(&record)).await?;
        debug!(owner = %owner, id = %inserted, "History record appended");
        Ok(record)
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<HistoryRecord>> {
        let docs = self
            .collection
            .find_many(doc! { "user_id": owner.as_str() }, doc! { "_id": 1 })
            .await?;

        records_from_docs(docs).map_err(|e| {
            error!(owner = %owner, "Unreadable history document: {}", e);
            e
        })
    }

    async fn delete_by_owner_and_id(&self, owner: &OwnerId, id: &str) -> Result<()> {
        let oid = ObjectId::parse_str(id).map_err(|_| record_not_found())?;
        let result = self
            .collection
            .delete_one(doc! { "_id": oid, "user_id": owner.as_str() })
            .await?;

        if result.deleted_count == 0 {
            return Err(record_not_found());
        }

        debug!(owner = %owner, id, "History record deleted");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.client.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn stored(resultado_real: Option<&str>) -> PredictionDoc {
        PredictionDoc {
            _id: Some(ObjectId::new()),
            user_id: "64b000000000000000000001".to_string(),
            objetivo: "Reducir la deserción escolar".to_string(),
            grupo: "Educación".to_string(),
            prediccion: "Éxito".to_string(),
            probabilidad_exito: 87.7,
            resultado_real: resultado_real.map(str::to_string),
            fecha: Some(bson::DateTime::from_millis(1_700_000_000_123)),
        }
    }

    #[test]
    fn test_document_to_record() {
        let doc = stored(Some("Fracaso"));
        let id = doc._id.unwrap().to_hex();
        let record = HistoryRecord::try_from(doc).unwrap();

        assert_eq!(record.id, id);
        assert_eq!(record.owner_id.as_str(), "64b000000000000000000001");
        assert_eq!(record.predicted_label, Label::Success);
        assert_eq!(record.actual_outcome, Some(Outcome::Failure));
        assert_eq!(
            record.created_at,
            Some(Utc.timestamp_millis_opt(1_700_000_000_123).unwrap())
        );
    }

    #[test]
    fn test_legacy_outcome_kept_as_unknown() {
        let record = HistoryRecord::try_from(stored(Some("quizás"))).unwrap();
        assert_eq!(record.actual_outcome, Some(Outcome::Unknown));

        let record = HistoryRecord::try_from(stored(Some(""))).unwrap();
        assert_eq!(record.actual_outcome, None);
    }

    #[test]
    fn test_document_with_bad_label_is_rejected() {
        let mut doc = stored(None);
        doc.prediccion = "Tal vez".to_string();
        assert!(HistoryRecord::try_from(doc).is_err());
    }

    #[test]
    fn test_listing_fails_on_unreadable_document() {
        let mut bad = stored(None);
        bad.prediccion = "Tal vez".to_string();

        let err = records_from_docs(vec![stored(None), bad, stored(None)]).unwrap_err();
        assert!(matches!(err, PolicyError::Internal(_)));

        let records = records_from_docs(vec![stored(None), stored(Some("Éxito"))]).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_record_to_document_keeps_id() {
        let record = HistoryRecord::try_from(stored(Some("Éxito"))).unwrap();
        let doc = PredictionDoc::from(&record);

        assert_eq!(doc._id.map(|o| o.to_hex()), Some(record.id.clone()));
        assert_eq!(doc.prediccion, "Éxito");
        assert_eq!(doc.resultado_real.as_deref(), Some("Éxito"));
        assert_eq!(doc.fecha.map(|d| d.timestamp_millis()), Some(1_700_000_000_123));
    }
}
