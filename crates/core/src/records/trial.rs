use super::{AddressRef, Record, RecordMeta};
use crate::constants::TRIALS;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Trial {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub trial_id: String,
    #[serde(default)]
    pub associated_sites: Vec<String>,
    #[serde(default)]
    pub associated_patients: Vec<String>,
    /// Kit ids making up the trial's standard kit.
    #[serde(default)]
    pub diagnostic_kits_template: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub default_send_address: Option<AddressRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub default_receive_address: Option<AddressRef>,
}

impl Record for Trial {
    const COLLECTION: &'static str = TRIALS;
    const ENTITY: &'static str = "Trial";
    const KEY_FIELD: &'static str = "trial_id";

    fn key(&self) -> Option<&str> {
        Some(&self.trial_id)
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}
