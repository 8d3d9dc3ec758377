//! MongoDB adapter.
//!
//! Filters, updates and pipelines are rendered to BSON here. Results are converted back to
//! relaxed extended JSON and normalised so that object ids and dates surface as plain strings.

use super::pipeline::{Accumulator, Group, GroupKey, Pipeline, SortOrder, Stage};
use super::{
    Document, DocumentStore, Filter, IndexSpec, StoreError, StoreResult, Update, UpdateOp,
    UpdateOutcome,
};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document as BsonDocument};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use serde_json::Value;

/// Server error code for a unique index violation.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// A [`DocumentStore`] backed by a MongoDB database.
#[derive(Clone, Debug)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Connects to `uri` and verifies the server answers a ping.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the URI is invalid or the server is unreachable.
    pub async fn connect(uri: &str, database: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| backend_error("", e))?;
        let store = Self {
            db: client.database(database),
        };
        store.ping().await?;
        tracing::info!(database, "connected to MongoDB");
        Ok(store)
    }

    fn collection(&self, name: &str) -> Collection<BsonDocument> {
        self.db.collection::<BsonDocument>(name)
    }
}

fn backend_error(collection: &str, err: mongodb::error::Error) -> StoreError {
    let duplicate = match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY_CODE => {
            Some(e.message.clone())
        }
        ErrorKind::BulkWrite(failure) => failure
            .write_errors
            .iter()
            .flatten()
            .find(|e| e.code == DUPLICATE_KEY_CODE)
            .map(|e| e.message.clone()),
        _ => None,
    };
    match duplicate {
        Some(key) => StoreError::DuplicateKey {
            collection: collection.to_owned(),
            key,
        },
        None => StoreError::Backend(Box::new(err)),
    }
}

fn to_bson(value: &Value) -> StoreResult<Bson> {
    mongodb::bson::to_bson(value).map_err(|e| StoreError::Backend(Box::new(e)))
}

fn to_bson_document(doc: &Document) -> StoreResult<BsonDocument> {
    mongodb::bson::to_document(doc).map_err(|e| StoreError::Backend(Box::new(e)))
}

/// `_id` values that look like object ids are matched as such.
fn id_aware_bson(field: &str, value: &Value) -> StoreResult<Bson> {
    if field == "_id" {
        if let Some(oid) = value.as_str().and_then(|s| ObjectId::parse_str(s).ok()) {
            return Ok(Bson::ObjectId(oid));
        }
    }
    to_bson(value)
}

pub(crate) fn render_filter(filter: &Filter) -> StoreResult<BsonDocument> {
    let mut out = BsonDocument::new();
    match filter {
        Filter::All => {}
        Filter::Eq(field, value) => {
            out.insert(field.clone(), id_aware_bson(field, value)?);
        }
        Filter::In(field, values) => {
            let values = values
                .iter()
                .map(|v| id_aware_bson(field, v))
                .collect::<StoreResult<Vec<Bson>>>()?;
            out.insert(field.clone(), doc! { "$in": values });
        }
        Filter::And(parts) | Filter::Or(parts) => {
            let op = if matches!(filter, Filter::And(_)) { "$and" } else { "$or" };
            let parts = parts
                .iter()
                .map(|p| render_filter(p).map(Bson::Document))
                .collect::<StoreResult<Vec<Bson>>>()?;
            out.insert(op, parts);
        }
    }
    Ok(out)
}

pub(crate) fn render_update(update: &Update) -> StoreResult<BsonDocument> {
    let mut out = BsonDocument::new();
    let mut section = |op: &str, field: &str, value: Bson| {
        if !out.contains_key(op) {
            out.insert(op, BsonDocument::new());
        }
        if let Ok(target) = out.get_document_mut(op) {
            target.insert(field, value);
        }
    };
    for op in update.ops() {
        match op {
            UpdateOp::Set(field, value) => section("$set", field, to_bson(value)?),
            UpdateOp::Push(field, value) => section("$push", field, to_bson(value)?),
            UpdateOp::AddToSet(field, values) => {
                let each = values.iter().map(to_bson).collect::<StoreResult<Vec<_>>>()?;
                section("$addToSet", field, Bson::Document(doc! { "$each": each }));
            }
            UpdateOp::PullAll(field, values) => {
                let values = values.iter().map(to_bson).collect::<StoreResult<Vec<_>>>()?;
                section("$pullAll", field, Bson::Array(values));
            }
            UpdateOp::Inc(field, by) => section("$inc", field, to_bson(by)?),
        }
    }
    Ok(out)
}

fn field_ref(path: &str) -> String {
    format!("${path}")
}

fn render_group(group: &Group) -> BsonDocument {
    let mut out = BsonDocument::new();
    let key = match &group.key {
        GroupKey::Field(path) => Bson::String(field_ref(path)),
        GroupKey::Month(path) => Bson::Document(doc! {
            "$substrBytes": [field_ref(path), 0, 7]
        }),
    };
    out.insert("_id", key);
    for (name, acc) in &group.fields {
        let rendered = match acc {
            Accumulator::Count => doc! { "$sum": 1 },
            Accumulator::Sum(path) => doc! { "$sum": field_ref(path) },
            Accumulator::Avg(path) => doc! { "$avg": field_ref(path) },
            Accumulator::Push(path) => doc! { "$push": field_ref(path) },
        };
        out.insert(name.clone(), rendered);
    }
    out
}

pub(crate) fn render_pipeline(pipeline: &Pipeline) -> StoreResult<Vec<BsonDocument>> {
    pipeline.stages().iter().map(render_stage).collect()
}

fn render_stage(stage: &Stage) -> StoreResult<BsonDocument> {
    Ok(match stage {
        Stage::Match(filter) => doc! { "$match": render_filter(filter)? },
        Stage::Lookup(lookup) => doc! {
            "$lookup": {
                "from": lookup.from.as_str(),
                "localField": lookup.local_field.as_str(),
                "foreignField": lookup.foreign_field.as_str(),
                "as": lookup.as_field.as_str(),
            }
        },
        Stage::Unwind(field) => doc! { "$unwind": field_ref(field) },
        Stage::Group(group) => doc! { "$group": render_group(group) },
        Stage::Sort(keys) => {
            let mut spec = BsonDocument::new();
            for (key, order) in keys {
                let dir = match order {
                    SortOrder::Ascending => 1,
                    SortOrder::Descending => -1,
                };
                spec.insert(key.clone(), dir);
            }
            doc! { "$sort": spec }
        }
        Stage::Facet(facets) => {
            let mut spec = BsonDocument::new();
            for (name, sub) in facets {
                let stages: Vec<Bson> = render_pipeline(sub)?
                    .into_iter()
                    .map(Bson::Document)
                    .collect();
                spec.insert(name.clone(), stages);
            }
            doc! { "$facet": spec }
        }
    })
}

/// Rewrites extended-JSON wrappers (`{"$oid": ..}`, `{"$date": ..}`) into plain strings.
fn normalise(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(oid)) = map.get("$oid") {
                    return Value::String(oid.clone());
                }
                if let Some(date) = map.get("$date") {
                    return normalise_date(date);
                }
            }
            Value::Object(map.into_iter().map(|(k, v)| (k, normalise(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalise).collect()),
        other => other,
    }
}

fn normalise_date(date: &Value) -> Value {
    match date {
        Value::String(s) => Value::String(s.clone()),
        Value::Object(inner) => inner
            .get("$numberLong")
            .and_then(Value::as_str)
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(chrono::DateTime::from_timestamp_millis)
            .map(|dt| Value::String(dt.to_rfc3339()))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn from_bson_document(doc: BsonDocument) -> Document {
    match normalise(Bson::Document(doc).into_relaxed_extjson()) {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn insert_one(&self, collection: &str, doc: Document) -> StoreResult<Document> {
        let mut bson = to_bson_document(&doc)?;
        let result = self
            .collection(collection)
            .insert_one(&bson, None)
            .await
            .map_err(|e| backend_error(collection, e))?;
        bson.insert("_id", result.inserted_id);
        Ok(from_bson_document(bson))
    }

    async fn insert_many(
        &self,
        collection: &str,
        docs: Vec<Document>,
    ) -> StoreResult<Vec<Document>> {
        if docs.is_empty() {
            return Ok(Vec::new());
        }
        let mut bson = docs
            .iter()
            .map(to_bson_document)
            .collect::<StoreResult<Vec<_>>>()?;
        let result = self
            .collection(collection)
            .insert_many(&bson, None)
            .await
            .map_err(|e| backend_error(collection, e))?;
        for (index, id) in result.inserted_ids {
            if let Some(doc) = bson.get_mut(index) {
                doc.insert("_id", id);
            }
        }
        Ok(bson.into_iter().map(from_bson_document).collect())
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>> {
        let cursor = self
            .collection(collection)
            .find(render_filter(filter)?, None)
            .await
            .map_err(|e| backend_error(collection, e))?;
        let docs: Vec<BsonDocument> = cursor
            .try_collect()
            .await
            .map_err(|e| backend_error(collection, e))?;
        Ok(docs.into_iter().map(from_bson_document).collect())
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        let found = self
            .collection(collection)
            .find_one(render_filter(filter)?, None)
            .await
            .map_err(|e| backend_error(collection, e))?;
        Ok(found.map(from_bson_document))
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> StoreResult<UpdateOutcome> {
        let result = self
            .collection(collection)
            .update_one(render_filter(filter)?, render_update(update)?, None)
            .await
            .map_err(|e| backend_error(collection, e))?;
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        self.collection(collection)
            .count_documents(render_filter(filter)?, None)
            .await
            .map_err(|e| backend_error(collection, e))
    }

    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Document>> {
        let cursor = self
            .collection(collection)
            .aggregate(render_pipeline(pipeline)?, None)
            .await
            .map_err(|e| backend_error(collection, e))?;
        let docs: Vec<BsonDocument> = cursor
            .try_collect()
            .await
            .map_err(|e| backend_error(collection, e))?;
        Ok(docs.into_iter().map(from_bson_document).collect())
    }

    async fn ensure_indexes(&self, indexes: &[IndexSpec]) -> StoreResult<()> {
        for index in indexes {
            let mut keys = BsonDocument::new();
            keys.insert(index.field, 1);
            let options = IndexOptions::builder()
                .unique(index.unique)
                .sparse(index.unique)
                .build();
            let model = IndexModel::builder().keys(keys).options(options).build();
            self.collection(index.collection)
                .create_index(model, None)
                .await
                .map_err(|e| backend_error(index.collection, e))?;
            tracing::debug!(
                collection = index.collection,
                field = index.field,
                unique = index.unique,
                "index ensured"
            );
        }
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        self.db
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map(|_| ())
            .map_err(|e| backend_error("", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_or_of_equalities() {
        let f = Filter::eq("trial_id", "T1").and(Filter::Or(vec![
            Filter::eq("origin", "S1"),
            Filter::eq("destination", "S1"),
        ]));
        let rendered = render_filter(&f).unwrap();
        assert_eq!(
            rendered,
            doc! { "$and": [
                { "trial_id": "T1" },
                { "$or": [ { "origin": "S1" }, { "destination": "S1" } ] },
            ] }
        );
    }

    #[test]
    fn object_id_strings_match_as_object_ids() {
        let hex = "65a1b2c3d4e5f6a7b8c9d0e1";
        let rendered = render_filter(&Filter::eq("_id", hex)).unwrap();
        assert_eq!(rendered.get_object_id("_id").unwrap().to_hex(), hex);
    }

    #[test]
    fn renders_update_operators_grouped() {
        let update = Update::new()
            .set("status", "IN_TRANSIT")
            .set("updated_at", "2024-01-01T00:00:00Z")
            .add_to_set("associated_sites", ["S1"])
            .pull_all("associated_patients", ["P1"]);
        let rendered = render_update(&update).unwrap();
        assert_eq!(
            rendered,
            doc! {
                "$set": { "status": "IN_TRANSIT", "updated_at": "2024-01-01T00:00:00Z" },
                "$addToSet": { "associated_sites": { "$each": ["S1"] } },
                "$pullAll": { "associated_patients": ["P1"] },
            }
        );
    }

    #[test]
    fn renders_failure_pipeline() {
        let pipeline = Pipeline::new()
            .unwind("failures")
            .group(
                Group::by(GroupKey::Field("failures".into()))
                    .count("count")
                    .push("shipments", "tracking_number"),
            )
            .sort(&[("count", SortOrder::Descending), ("_id", SortOrder::Ascending)]);
        let rendered = render_pipeline(&pipeline).unwrap();
        assert_eq!(
            rendered,
            vec![
                doc! { "$unwind": "$failures" },
                doc! { "$group": {
                    "_id": "$failures",
                    "count": { "$sum": 1 },
                    "shipments": { "$push": "$tracking_number" },
                } },
                doc! { "$sort": { "count": -1, "_id": 1 } },
            ]
        );
    }

    #[test]
    fn renders_month_key_and_facets() {
        let trend = Pipeline::new().group(
            Group::by(GroupKey::Month("created_at".into())).sum("total_cost", "cost"),
        );
        let rendered = render_pipeline(&Pipeline::new().facet(vec![("monthly_trends", trend)]))
            .unwrap();
        assert_eq!(
            rendered,
            vec![doc! { "$facet": { "monthly_trends": [
                { "$group": {
                    "_id": { "$substrBytes": ["$created_at", 0, 7] },
                    "total_cost": { "$sum": "$cost" },
                } },
            ] } }]
        );
    }

    #[test]
    fn normalises_extended_json() {
        let oid = ObjectId::parse_str("65a1b2c3d4e5f6a7b8c9d0e1").unwrap();
        let doc = from_bson_document(doc! {
            "_id": oid,
            "kit_id": "KIT001",
            "weight": 2.5,
            "count": 3_i32,
        });
        assert_eq!(
            Value::Object(doc),
            json!({
                "_id": "65a1b2c3d4e5f6a7b8c9d0e1",
                "kit_id": "KIT001",
                "weight": 2.5,
                "count": 3,
            })
        );
    }
}
