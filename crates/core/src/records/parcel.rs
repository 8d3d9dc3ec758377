use super::{Record, RecordMeta};
use crate::constants::PARCELS;
use crate::validation::{require, validate_dimensions, INVALID_DIMENSIONS};
use crate::LogisticsResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ParcelContent {
    pub kit_id: String,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

/// A physical package definition. Parcels have no business key; they are addressed by their
/// store identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Parcel {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parcel_id: Option<String>,
    /// `LxWxHin`.
    pub dimensions: String,
    /// Pounds.
    pub weight: f64,
    pub total_pieces: i64,
    #[serde(default)]
    pub contents: Vec<ParcelContent>,
    #[serde(default)]
    pub additional_items: Vec<String>,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipment_id: Option<String>,
}

impl Record for Parcel {
    const COLLECTION: &'static str = PARCELS;
    const ENTITY: &'static str = "Parcel";
    const KEY_FIELD: &'static str = "_id";

    fn key(&self) -> Option<&str> {
        self.meta.id.as_deref()
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn check_format(&self) -> LogisticsResult<()> {
        require(validate_dimensions(&self.dimensions), INVALID_DIMENSIONS)?;
        require(self.weight > 0.0, "Weight must be greater than zero")?;
        require(self.total_pieces >= 1, "Total pieces must be at least 1")
    }
}
