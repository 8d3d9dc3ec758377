//! Document-store abstraction.
//!
//! Services talk to storage exclusively through [`DocumentStore`]. Two backends exist:
//!
//! - [`MemoryStore`]: in-process collections with unique-index enforcement. Used by tests and
//!   by the `memory` backend for local development.
//! - [`MongoStore`]: the MongoDB driver adapter used in production.
//!
//! Documents are JSON objects ([`Document`]). Store identities (`_id`) are always rendered as
//! strings and timestamps as RFC 3339 text, whichever backend produced them.
//!
//! The store handle is created once at startup ([`open_store`]) and shared as an
//! `Arc<dyn DocumentStore>`.

mod eval;
pub mod memory;
pub mod mongo;
pub mod pipeline;

use crate::config::{CoreConfig, StoreBackend};
use crate::constants::{
    ADDRESSES, CONTACT_PERSONS, DEVICES, FAILURES, IOT_DEVICES, KITS, PARCELS, PATIENTS,
    SHIPMENTS, SITES, TRIALS,
};
use crate::error::{LogisticsError, LogisticsResult};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use pipeline::{Accumulator, Group, GroupKey, Lookup, Pipeline, SortOrder, Stage};

/// A schema-flexible stored document.
pub type Document = serde_json::Map<String, Value>;

/// Errors raised by a document store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate key in {collection}: {key}")]
    DuplicateKey { collection: String, key: String },
    #[error("failed to convert document: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("document store failure: {0}")]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Equality and set-membership predicates.
///
/// Field paths may be dotted (`iot_device.device_id`). When the stored value is an array,
/// `Eq` matches if any element equals the expected value, mirroring MongoDB query semantics.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Value),
    In(String, Vec<Value>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn is_in<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    /// Conjunction that collapses `All` and flattens nested `And`s.
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, f) | (f, Filter::All) => f,
            (Filter::And(mut left), Filter::And(right)) => {
                left.extend(right);
                Filter::And(left)
            }
            (Filter::And(mut left), f) => {
                left.push(f);
                Filter::And(left)
            }
            (f, Filter::And(mut right)) => {
                right.insert(0, f);
                Filter::And(right)
            }
            (left, right) => Filter::And(vec![left, right]),
        }
    }

    /// Adds `field == value` when `value` is present.
    pub fn and_eq_opt(self, field: &str, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(v) => self.and(Filter::eq(field, v)),
            None => self,
        }
    }
}

/// A single update operator.
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateOp {
    Set(String, Value),
    Push(String, Value),
    AddToSet(String, Vec<Value>),
    PullAll(String, Vec<Value>),
    Inc(String, Value),
}

/// An ordered list of update operators applied to one document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Set(field.into(), value.into()));
        self
    }

    pub fn push(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Push(field.into(), value.into()));
        self
    }

    pub fn add_to_set<V: Into<Value>>(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.ops.push(UpdateOp::AddToSet(
            field.into(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn pull_all<V: Into<Value>>(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.ops.push(UpdateOp::PullAll(
            field.into(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn inc(mut self, field: impl Into<String>, by: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Inc(field.into(), by.into()));
        self
    }

    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Result of an `update_one` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

/// A single-field index declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexSpec {
    pub collection: &'static str,
    pub field: &'static str,
    pub unique: bool,
}

impl IndexSpec {
    pub const fn unique(collection: &'static str, field: &'static str) -> Self {
        Self {
            collection,
            field,
            unique: true,
        }
    }

    pub const fn secondary(collection: &'static str, field: &'static str) -> Self {
        Self {
            collection,
            field,
            unique: false,
        }
    }
}

/// Indexes every deployment needs. Unique indexes back the business-key invariant.
pub const INDEX_PLAN: &[IndexSpec] = &[
    IndexSpec::unique(TRIALS, "trial_id"),
    IndexSpec::secondary(TRIALS, "associated_sites"),
    IndexSpec::secondary(TRIALS, "associated_patients"),
    IndexSpec::unique(SITES, "site_id"),
    IndexSpec::secondary(SITES, "associated_trials"),
    IndexSpec::unique(PATIENTS, "patient_id"),
    IndexSpec::secondary(PATIENTS, "associated_trials"),
    IndexSpec::secondary(PATIENTS, "associated_sites"),
    IndexSpec::unique(DEVICES, "device_id"),
    IndexSpec::secondary(DEVICES, "manufacturer"),
    IndexSpec::secondary(DEVICES, "expiration_date"),
    IndexSpec::unique(IOT_DEVICES, "device_id"),
    IndexSpec::secondary(IOT_DEVICES, "manufacturer"),
    IndexSpec::unique(KITS, "kit_id"),
    IndexSpec::secondary(KITS, "is_template"),
    IndexSpec::secondary(KITS, "device_id"),
    IndexSpec::secondary(PARCELS, "shipment_id"),
    IndexSpec::secondary(PARCELS, "is_template"),
    IndexSpec::secondary(CONTACT_PERSONS, "email"),
    IndexSpec::secondary(CONTACT_PERSONS, "role"),
    IndexSpec::secondary(ADDRESSES, "postal_code"),
    IndexSpec::unique(SHIPMENTS, "tracking_number"),
    IndexSpec::secondary(SHIPMENTS, "trial_id"),
    IndexSpec::secondary(SHIPMENTS, "origin"),
    IndexSpec::secondary(SHIPMENTS, "destination"),
    IndexSpec::secondary(SHIPMENTS, "status"),
    IndexSpec::secondary(SHIPMENTS, "created_at"),
    IndexSpec::unique(FAILURES, "failure_id"),
];

/// The storage capability injected into every service.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a document and returns it as stored (including the assigned `_id`).
    async fn insert_one(&self, collection: &str, doc: Document) -> StoreResult<Document>;

    /// Inserts several documents in order and returns them as stored.
    async fn insert_many(&self, collection: &str, docs: Vec<Document>)
        -> StoreResult<Vec<Document>>;

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>>;

    async fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>>;

    /// Applies `update` to the first document matching `filter`.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> StoreResult<UpdateOutcome>;

    async fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;

    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Document>>;

    async fn ensure_indexes(&self, indexes: &[IndexSpec]) -> StoreResult<()>;

    /// Round-trips to the backend; used by the health endpoint.
    async fn ping(&self) -> StoreResult<()>;
}

/// Opens the configured backend and applies [`INDEX_PLAN`].
///
/// # Errors
///
/// Returns `LogisticsError::Store` if the backend cannot be reached or indexes cannot be
/// created, and `LogisticsError::InvalidConfig` if the MongoDB URI is missing.
pub async fn open_store(cfg: &CoreConfig) -> LogisticsResult<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match cfg.store_backend() {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::MongoDb => {
            let uri = cfg.mongodb_uri().ok_or_else(|| {
                LogisticsError::InvalidConfig("MONGODB_URI is required for the mongodb store".into())
            })?;
            Arc::new(MongoStore::connect(uri, cfg.database_name()).await?)
        }
    };

    store.ensure_indexes(INDEX_PLAN).await?;
    tracing::info!(
        backend = ?cfg.store_backend(),
        indexes = INDEX_PLAN.len(),
        "document store ready"
    );
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn and_collapses_all() {
        let f = Filter::All.and(Filter::eq("status", "PENDING"));
        assert_eq!(f, Filter::eq("status", "PENDING"));
    }

    #[test]
    fn and_flattens_nested_conjunctions() {
        let f = Filter::eq("a", 1)
            .and(Filter::eq("b", 2))
            .and(Filter::eq("c", 3));
        match f {
            Filter::And(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn and_eq_opt_skips_missing_values() {
        let f = Filter::All
            .and_eq_opt("trial_id", Some("TRIAL001"))
            .and_eq_opt("status", None::<String>);
        assert_eq!(f, Filter::eq("trial_id", json!("TRIAL001")));
    }

    #[test]
    fn index_plan_declares_unique_business_keys() {
        for (collection, field) in [
            (TRIALS, "trial_id"),
            (SITES, "site_id"),
            (PATIENTS, "patient_id"),
            (DEVICES, "device_id"),
            (IOT_DEVICES, "device_id"),
            (KITS, "kit_id"),
            (SHIPMENTS, "tracking_number"),
        ] {
            assert!(
                INDEX_PLAN.contains(&IndexSpec::unique(collection, field)),
                "missing unique index on {collection}.{field}"
            );
        }
    }
}
