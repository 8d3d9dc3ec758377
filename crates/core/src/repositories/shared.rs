//! Shared repository utilities.
//!
//! [`RecordRepository`] implements the generic entity contract (list, create, retrieve,
//! update) for any [`Record`]. Entity services wrap one or more repositories and add the
//! cross-collection rules on top.
//!
//! ## Update semantics
//!
//! An update is a shallow overwrite of top-level fields. Before anything is written the
//! stored document is merged with the partial and the result must still deserialize as the
//! typed record. The business key, the store identity, the timestamps and any
//! [`Record::PROTECTED_FIELDS`] cannot be changed this way; `updated_at` is stamped.

use crate::error::{LogisticsError, LogisticsResult};
use crate::records::{Record, META_FIELDS};
use crate::store::{Document, DocumentStore, Filter, Update, UpdateOutcome};
use chrono::Utc;
use odyssey_types::BusinessKey;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::sync::Arc;

/// Serialises `value` into a stored document.
///
/// # Errors
///
/// Returns `LogisticsError::Validation` if `value` does not serialise to a JSON object.
pub(crate) fn to_document<T: Serialize>(value: &T) -> LogisticsResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(LogisticsError::validation(format!(
            "expected an object, got {other}"
        ))),
    }
}

pub(crate) fn from_document<T: DeserializeOwned>(doc: Document) -> LogisticsResult<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

/// The current time as stored in documents (RFC 3339 text).
pub(crate) fn now_value() -> LogisticsResult<Value> {
    Ok(serde_json::to_value(Utc::now())?)
}

/// Generic persistence for one record type.
pub struct RecordRepository<R> {
    store: Arc<dyn DocumentStore>,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for RecordRepository<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _record: PhantomData,
        }
    }
}

impl<R: Record> RecordRepository<R> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    fn key_filter(key: &str) -> Filter {
        Filter::eq(R::KEY_FIELD, key)
    }

    /// Lists records matching `filter`.
    ///
    /// Stored documents that no longer deserialize as `R` are skipped with a warning so that
    /// one malformed document cannot take a whole listing down.
    pub async fn list(&self, filter: &Filter) -> LogisticsResult<Vec<R>> {
        let docs = self.store.find(R::COLLECTION, filter).await?;
        let mut records = Vec::with_capacity(docs.len());
        for doc in docs {
            let id = doc.get("_id").cloned();
            match from_document::<R>(doc) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(
                        collection = R::COLLECTION,
                        id = ?id,
                        error = %e,
                        "skipping malformed document"
                    );
                }
            }
        }
        Ok(records)
    }

    pub async fn find_one(&self, filter: &Filter) -> LogisticsResult<Option<R>> {
        self.store
            .find_one(R::COLLECTION, filter)
            .await?
            .map(from_document)
            .transpose()
    }

    /// Fetches the record whose key field equals `key`.
    ///
    /// # Errors
    ///
    /// Returns `LogisticsError::NotFound` if no such record exists.
    pub async fn retrieve(&self, key: &str) -> LogisticsResult<R> {
        self.find_one(&Self::key_filter(key))
            .await?
            .ok_or_else(|| LogisticsError::not_found(R::ENTITY, key))
    }

    pub async fn exists(&self, key: &str) -> LogisticsResult<bool> {
        Ok(self.store.count(R::COLLECTION, &Self::key_filter(key)).await? > 0)
    }

    /// True when every distinct value in `values` names a record by `field`.
    pub async fn all_exist(&self, field: &str, values: &[String]) -> LogisticsResult<bool> {
        let distinct: BTreeSet<&str> = values.iter().map(String::as_str).collect();
        if distinct.is_empty() {
            return Ok(true);
        }
        let found = self
            .store
            .count(R::COLLECTION, &Filter::is_in(field, distinct.iter().copied()))
            .await?;
        Ok(found >= distinct.len() as u64)
    }

    /// Checks the business key and the record's own format rules.
    ///
    /// # Errors
    ///
    /// Returns `LogisticsError::Validation` describing the first failed check.
    pub fn check_new(record: &R) -> LogisticsResult<()> {
        if R::KEY_FIELD != "_id" {
            let key = record.key().unwrap_or_default();
            BusinessKey::parse(key)
                .map_err(|e| LogisticsError::validation(format!("{}: {e}", R::KEY_FIELD)))?;
        }
        record.check_format()
    }

    fn prepare_insert(record: &R, created_at: &Value) -> LogisticsResult<Document> {
        let mut doc = to_document(record)?;
        for field in META_FIELDS {
            doc.remove(*field);
        }
        doc.insert("created_at".into(), created_at.clone());
        Ok(doc)
    }

    /// Creates a record and returns it as stored.
    ///
    /// # Errors
    ///
    /// Returns `LogisticsError::Validation` if [`check_new`](Self::check_new) fails and
    /// `LogisticsError::Store` with `StoreError::DuplicateKey` if the key is taken.
    pub async fn insert(&self, record: &R) -> LogisticsResult<R> {
        Self::check_new(record)?;
        let doc = Self::prepare_insert(record, &now_value()?)?;
        let stored = self.store.insert_one(R::COLLECTION, doc).await?;
        tracing::info!(
            collection = R::COLLECTION,
            key = record.key().unwrap_or_default(),
            "record created"
        );
        from_document(stored)
    }

    /// Creates several records. Every record is checked before anything is written, so a
    /// single invalid record rejects the whole batch.
    pub async fn insert_many(&self, records: &[R]) -> LogisticsResult<Vec<R>> {
        for record in records {
            Self::check_new(record)?;
        }
        let created_at = now_value()?;
        let docs = records
            .iter()
            .map(|r| Self::prepare_insert(r, &created_at))
            .collect::<LogisticsResult<Vec<_>>>()?;
        let stored = self.store.insert_many(R::COLLECTION, docs).await?;
        tracing::info!(
            collection = R::COLLECTION,
            count = stored.len(),
            "records created"
        );
        stored.into_iter().map(from_document).collect()
    }

    /// Applies a partial update to the record keyed by `key` and returns the updated record.
    ///
    /// # Errors
    ///
    /// - `LogisticsError::NotFound` if the record does not exist.
    /// - `LogisticsError::Validation` if the partial changes the key or a protected field, or
    ///   if the merged document is no longer a valid record.
    pub async fn update(&self, key: &str, mut partial: Document) -> LogisticsResult<R> {
        let filter = Self::key_filter(key);
        let current = self
            .store
            .find_one(R::COLLECTION, &filter)
            .await?
            .ok_or_else(|| LogisticsError::not_found(R::ENTITY, key))?;

        for field in META_FIELDS {
            partial.remove(*field);
        }
        if let Some(new_key) = partial.remove(R::KEY_FIELD) {
            if current.get(R::KEY_FIELD) != Some(&new_key) {
                return Err(LogisticsError::validation(format!(
                    "{} cannot be changed",
                    R::KEY_FIELD
                )));
            }
        }
        if let Some(field) = R::PROTECTED_FIELDS.iter().find(|f| partial.contains_key(**f)) {
            return Err(LogisticsError::validation(format!(
                "{field} cannot be changed through a general update"
            )));
        }
        if partial.is_empty() {
            return from_document(current);
        }

        let mut merged = current;
        for (field, value) in &partial {
            merged.insert(field.clone(), value.clone());
        }
        from_document::<R>(merged)
            .map_err(|e| LogisticsError::validation(format!("invalid {}: {e}", R::ENTITY)))?
            .check_format()?;

        let update = partial
            .into_iter()
            .fold(Update::new(), |u, (field, value)| u.set(field, value));
        self.apply(key, update).await?;
        self.retrieve(key).await
    }

    /// Applies `update` only while the record still matches `guard`.
    ///
    /// Returns `Ok(None)` when the record exists but `guard` no longer holds, leaving the
    /// record untouched.
    ///
    /// # Errors
    ///
    /// Returns `LogisticsError::NotFound` if the record does not exist.
    pub async fn apply_guarded(
        &self,
        key: &str,
        guard: Filter,
        update: Update,
    ) -> LogisticsResult<Option<UpdateOutcome>> {
        let update = update.set("updated_at", now_value()?);
        let filter = Self::key_filter(key).and(guard);
        let outcome = self.store.update_one(R::COLLECTION, &filter, &update).await?;
        if outcome.matched == 0 {
            return if self.exists(key).await? {
                Ok(None)
            } else {
                Err(LogisticsError::not_found(R::ENTITY, key))
            };
        }
        Ok(Some(outcome))
    }

    /// Applies store update operators to the record keyed by `key`, stamping `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `LogisticsError::NotFound` if no record matched.
    pub async fn apply(&self, key: &str, update: Update) -> LogisticsResult<UpdateOutcome> {
        let update = update.set("updated_at", now_value()?);
        let outcome = self
            .store
            .update_one(R::COLLECTION, &Self::key_filter(key), &update)
            .await?;
        if outcome.matched == 0 {
            return Err(LogisticsError::not_found(R::ENTITY, key));
        }
        tracing::debug!(
            collection = R::COLLECTION,
            key,
            modified = outcome.modified,
            "record updated"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Kit, Shipment, Trial};
    use crate::store::{StoreError, MemoryStore, INDEX_PLAN};
    use serde_json::json;

    async fn store() -> Arc<dyn DocumentStore> {
        let store = MemoryStore::new();
        store.ensure_indexes(INDEX_PLAN).await.unwrap();
        Arc::new(store)
    }

    fn trial(id: &str) -> Trial {
        serde_json::from_value(json!({"trial_id": id})).unwrap()
    }

    fn partial(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[tokio::test]
    async fn insert_stamps_identity_and_created_at() {
        let repo = RecordRepository::<Trial>::new(store().await);
        let stored = repo.insert(&trial("TRIAL001")).await.unwrap();
        assert!(stored.meta.id.is_some());
        assert!(stored.meta.created_at.is_some());
        assert!(stored.meta.updated_at.is_none());
    }

    #[tokio::test]
    async fn second_create_with_same_key_is_rejected() {
        let repo = RecordRepository::<Trial>::new(store().await);
        repo.insert(&trial("TRIAL001")).await.unwrap();
        let err = repo.insert(&trial("TRIAL001")).await.unwrap_err();
        assert!(matches!(
            err,
            LogisticsError::Store(StoreError::DuplicateKey { .. })
        ));
    }

    #[tokio::test]
    async fn blank_business_key_is_rejected() {
        let repo = RecordRepository::<Trial>::new(store().await);
        let err = repo.insert(&trial("   ")).await.unwrap_err();
        assert!(matches!(err, LogisticsError::Validation(_)));
    }

    #[tokio::test]
    async fn padded_business_key_is_rejected() {
        let repo = RecordRepository::<Trial>::new(store().await);
        repo.insert(&trial("TRIAL001")).await.unwrap();
        let err = repo.insert(&trial(" TRIAL001 ")).await.unwrap_err();
        assert!(matches!(err, LogisticsError::Validation(_)));
        assert_eq!(repo.list(&Filter::All).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn guarded_apply_skips_records_that_moved_on() {
        let repo = RecordRepository::<Trial>::new(store().await);
        repo.insert(&trial("TRIAL001")).await.unwrap();
        let set_kits = || Update::new().set("diagnostic_kits_template", json!(["KIT001"]));

        let stale = Filter::eq("diagnostic_kits_template", "KIT999");
        assert!(repo.apply_guarded("TRIAL001", stale, set_kits()).await.unwrap().is_none());
        assert!(repo.retrieve("TRIAL001").await.unwrap().diagnostic_kits_template.is_empty());

        let outcome = repo
            .apply_guarded("TRIAL001", Filter::All, set_kits())
            .await
            .unwrap();
        assert_eq!(outcome.map(|o| o.matched), Some(1));

        let err = repo
            .apply_guarded("TRIAL404", Filter::All, set_kits())
            .await
            .unwrap_err();
        assert!(matches!(err, LogisticsError::NotFound { .. }));
    }

    #[tokio::test]
    async fn retrieve_unknown_key_is_not_found() {
        let repo = RecordRepository::<Trial>::new(store().await);
        let err = repo.retrieve("nope").await.unwrap_err();
        assert!(matches!(err, LogisticsError::NotFound { entity: "Trial", .. }));
    }

    #[tokio::test]
    async fn update_overwrites_fields_and_stamps_updated_at() {
        let repo = RecordRepository::<Trial>::new(store().await);
        repo.insert(&trial("TRIAL001")).await.unwrap();
        let updated = repo
            .update(
                "TRIAL001",
                partial(json!({"diagnostic_kits_template": ["KIT001"], "_id": "ignored"})),
            )
            .await
            .unwrap();
        assert_eq!(updated.diagnostic_kits_template, ["KIT001"]);
        assert!(updated.meta.updated_at.is_some());
        assert_ne!(updated.meta.id.as_deref(), Some("ignored"));
    }

    #[tokio::test]
    async fn update_cannot_change_business_key() {
        let repo = RecordRepository::<Trial>::new(store().await);
        repo.insert(&trial("TRIAL001")).await.unwrap();
        let err = repo
            .update("TRIAL001", partial(json!({"trial_id": "TRIAL002"})))
            .await
            .unwrap_err();
        assert!(matches!(err, LogisticsError::Validation(_)));
        assert!(repo.exists("TRIAL001").await.unwrap());

        // Echoing the unchanged key back is fine.
        repo.update("TRIAL001", partial(json!({"trial_id": "TRIAL001"})))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_rejects_invalid_merge() {
        let repo = RecordRepository::<Trial>::new(store().await);
        repo.insert(&trial("TRIAL001")).await.unwrap();
        let err = repo
            .update("TRIAL001", partial(json!({"associated_sites": "SITE001"})))
            .await
            .unwrap_err();
        assert!(matches!(err, LogisticsError::Validation(_)));
        let unchanged = repo.retrieve("TRIAL001").await.unwrap();
        assert!(unchanged.associated_sites.is_empty());
    }

    #[tokio::test]
    async fn update_cannot_touch_protected_fields() {
        let repo = RecordRepository::<Shipment>::new(store().await);
        let shipment: Shipment = serde_json::from_value(json!({
            "tracking_number": "SHIP001",
            "trial_id": "TRIAL001",
            "origin": "SITE001",
            "destination": "SITE002",
        }))
        .unwrap();
        repo.insert(&shipment).await.unwrap();
        let err = repo
            .update("SHIP001", partial(json!({"failures": []})))
            .await
            .unwrap_err();
        assert!(matches!(err, LogisticsError::Validation(_)));
    }

    #[tokio::test]
    async fn update_unknown_key_is_not_found() {
        let repo = RecordRepository::<Trial>::new(store().await);
        let err = repo
            .update("nope", partial(json!({"associated_sites": []})))
            .await
            .unwrap_err();
        assert!(matches!(err, LogisticsError::NotFound { .. }));
    }

    #[tokio::test]
    async fn list_skips_malformed_documents() {
        let store = store().await;
        store
            .insert_one("kits", partial(json!({"kit_id": "BROKEN"})))
            .await
            .unwrap();
        let repo = RecordRepository::<Kit>::new(Arc::clone(&store));
        let kit: Kit = serde_json::from_value(json!({
            "kit_id": "KIT001",
            "device_id": "DEV001",
            "return_box_dimensions": "12x8x6in",
        }))
        .unwrap();
        repo.insert(&kit).await.unwrap();
        let kits = repo.list(&Filter::All).await.unwrap();
        assert_eq!(kits.len(), 1);
        assert_eq!(kits[0].kit_id, "KIT001");
    }

    #[tokio::test]
    async fn all_exist_counts_distinct_values() {
        let repo = RecordRepository::<Trial>::new(store().await);
        repo.insert(&trial("T1")).await.unwrap();
        repo.insert(&trial("T2")).await.unwrap();
        let ids = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert!(repo.all_exist("trial_id", &ids(&["T1", "T2", "T1"])).await.unwrap());
        assert!(!repo.all_exist("trial_id", &ids(&["T1", "T3"])).await.unwrap());
        assert!(repo.all_exist("trial_id", &[]).await.unwrap());
    }
}
