//! In-process document store.

use super::eval::{apply_update, evaluate, matches, resolve_path, values_equal};
use super::{
    Document, DocumentStore, Filter, IndexSpec, Pipeline, StoreError, StoreResult, Update,
    UpdateOutcome,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct State {
    collections: HashMap<String, Vec<Document>>,
    unique_fields: HashMap<String, BTreeSet<String>>,
}

impl State {
    fn check_unique(&self, collection: &str, doc: &Document, skip: Option<usize>) -> StoreResult<()> {
        let Some(fields) = self.unique_fields.get(collection) else {
            return Ok(());
        };
        let existing = self.collections.get(collection);
        for field in fields {
            let Some(value) = resolve_path(doc, field).filter(|v| !v.is_null()) else {
                continue;
            };
            let clash = existing.into_iter().flatten().enumerate().any(|(i, other)| {
                Some(i) != skip
                    && resolve_path(other, field).is_some_and(|v| values_equal(&v, &value))
            });
            if clash {
                return Err(duplicate(collection, field, &value));
            }
        }
        Ok(())
    }
}

fn duplicate(collection: &str, field: &str, value: &Value) -> StoreError {
    let key = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    StoreError::DuplicateKey {
        collection: collection.to_owned(),
        key: format!("{field}={key}"),
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("memory store lock poisoned".into())
}

/// A [`DocumentStore`] holding every collection in memory.
///
/// Unique indexes declared through [`DocumentStore::ensure_indexes`] are enforced on insert and
/// update. Documents without a value for a unique field are not constrained, matching a sparse
/// index.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| poisoned())
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| poisoned())
    }
}

fn with_id(mut doc: Document) -> Document {
    if !doc.get("_id").is_some_and(|v| !v.is_null()) {
        doc.insert(
            "_id".into(),
            Value::String(uuid::Uuid::new_v4().simple().to_string()),
        );
    }
    doc
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(&self, collection: &str, doc: Document) -> StoreResult<Document> {
        let doc = with_id(doc);
        let mut state = self.write()?;
        state.check_unique(collection, &doc, None)?;
        state
            .collections
            .entry(collection.to_owned())
            .or_default()
            .push(doc.clone());
        Ok(doc)
    }

    async fn insert_many(
        &self,
        collection: &str,
        docs: Vec<Document>,
    ) -> StoreResult<Vec<Document>> {
        let docs: Vec<Document> = docs.into_iter().map(with_id).collect();
        let mut state = self.write()?;

        // All-or-nothing: validate against stored documents and the rest of the batch first.
        for (i, doc) in docs.iter().enumerate() {
            state.check_unique(collection, doc, None)?;
            if let Some(fields) = state.unique_fields.get(collection) {
                for field in fields {
                    let Some(value) = resolve_path(doc, field).filter(|v| !v.is_null()) else {
                        continue;
                    };
                    let repeated = docs[..i].iter().any(|earlier| {
                        resolve_path(earlier, field).is_some_and(|v| values_equal(&v, &value))
                    });
                    if repeated {
                        return Err(duplicate(collection, field, &value));
                    }
                }
            }
        }

        state
            .collections
            .entry(collection.to_owned())
            .or_default()
            .extend(docs.iter().cloned());
        Ok(docs)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>> {
        let state = self.read()?;
        Ok(state
            .collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matches(d, filter)).cloned().collect())
            .unwrap_or_default())
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        let state = self.read()?;
        Ok(state
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| matches(d, filter)).cloned()))
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> StoreResult<UpdateOutcome> {
        let mut state = self.write()?;
        let Some(index) = state
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().position(|d| matches(d, filter)))
        else {
            return Ok(UpdateOutcome::default());
        };

        let mut candidate = state.collections[collection][index].clone();
        let modified = apply_update(&mut candidate, update)?;
        if modified {
            state.check_unique(collection, &candidate, Some(index))?;
            if let Some(docs) = state.collections.get_mut(collection) {
                docs[index] = candidate;
            }
        }
        Ok(UpdateOutcome {
            matched: 1,
            modified: u64::from(modified),
        })
    }

    async fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let state = self.read()?;
        Ok(state
            .collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matches(d, filter)).count() as u64)
            .unwrap_or(0))
    }

    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Document>> {
        let state = self.read()?;
        let input = state.collections.get(collection).cloned().unwrap_or_default();
        Ok(evaluate(pipeline, input, &state.collections))
    }

    async fn ensure_indexes(&self, indexes: &[IndexSpec]) -> StoreResult<()> {
        let mut state = self.write()?;
        for index in indexes.iter().filter(|i| i.unique) {
            state
                .unique_fields
                .entry(index.collection.to_owned())
                .or_default()
                .insert(index.field.to_owned());
        }
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        self.read().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    async fn store_with_kits_index() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .ensure_indexes(&[IndexSpec::unique("kits", "kit_id")])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn insert_assigns_string_id() {
        let store = MemoryStore::new();
        let stored = store
            .insert_one("kits", doc(json!({"kit_id": "KIT001"})))
            .await
            .unwrap();
        assert!(stored["_id"].as_str().is_some_and(|s| s.len() == 32));
    }

    #[tokio::test]
    async fn unique_index_rejects_duplicates() {
        let store = store_with_kits_index().await;
        store.insert_one("kits", doc(json!({"kit_id": "KIT001"}))).await.unwrap();
        let err = store
            .insert_one("kits", doc(json!({"kit_id": "KIT001"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
        assert_eq!(store.count("kits", &Filter::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn insert_many_is_all_or_nothing() {
        let store = store_with_kits_index().await;
        let err = store
            .insert_many(
                "kits",
                vec![
                    doc(json!({"kit_id": "A"})),
                    doc(json!({"kit_id": "B"})),
                    doc(json!({"kit_id": "A"})),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
        assert_eq!(store.count("kits", &Filter::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_reports_matched_and_modified() {
        let store = MemoryStore::new();
        store
            .insert_one("shipments", doc(json!({"tracking_number": "T1", "status": "PENDING"})))
            .await
            .unwrap();

        let f = Filter::eq("tracking_number", "T1");
        let same = store
            .update_one("shipments", &f, &Update::new().set("status", "PENDING"))
            .await
            .unwrap();
        assert_eq!(same, UpdateOutcome { matched: 1, modified: 0 });

        let missing = store
            .update_one(
                "shipments",
                &Filter::eq("tracking_number", "nope"),
                &Update::new().set("status", "DELIVERED"),
            )
            .await
            .unwrap();
        assert_eq!(missing.matched, 0);
    }

    #[tokio::test]
    async fn update_cannot_create_duplicate_key() {
        let store = store_with_kits_index().await;
        store.insert_one("kits", doc(json!({"kit_id": "A"}))).await.unwrap();
        store.insert_one("kits", doc(json!({"kit_id": "B"}))).await.unwrap();
        let err = store
            .update_one("kits", &Filter::eq("kit_id", "B"), &Update::new().set("kit_id", "A"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
    }

    #[tokio::test]
    async fn aggregate_can_join_other_collections() {
        let store = MemoryStore::new();
        store
            .insert_one("devices", doc(json!({"device_id": "DEV001", "name": "Swab"})))
            .await
            .unwrap();
        store
            .insert_one("kits", doc(json!({"kit_id": "KIT001", "device_id": "DEV001"})))
            .await
            .unwrap();
        let out = store
            .aggregate(
                "kits",
                &Pipeline::new().lookup("devices", "device_id", "device_id", "device_details"),
            )
            .await
            .unwrap();
        assert_eq!(out[0]["device_details"][0]["name"], json!("Swab"));
    }
}
