use super::{Record, RecordMeta};
use crate::constants::FAILURES;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A standalone failure log entry, independent of any shipment's own `failures` list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FailureReport {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub failure_id: String,
    /// Locator of the shipment or shipment group the failure concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregated_shipment_locator: Option<String>,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment: Option<String>,
}

impl Record for FailureReport {
    const COLLECTION: &'static str = FAILURES;
    const ENTITY: &'static str = "FailureReport";
    const KEY_FIELD: &'static str = "failure_id";

    fn key(&self) -> Option<&str> {
        Some(&self.failure_id)
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}
