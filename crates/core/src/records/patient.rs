use super::{ContactRef, Record, RecordMeta};
use crate::constants::PATIENTS;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Patient {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub patient_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub associated_trials: Vec<String>,
    #[serde(default)]
    pub associated_sites: Vec<String>,
    #[serde(default)]
    pub scheduled_collection_dates: Vec<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub contact_person: Option<ContactRef>,
}

impl Record for Patient {
    const COLLECTION: &'static str = PATIENTS;
    const ENTITY: &'static str = "Patient";
    const KEY_FIELD: &'static str = "patient_id";

    fn key(&self) -> Option<&str> {
        Some(&self.patient_id)
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}
