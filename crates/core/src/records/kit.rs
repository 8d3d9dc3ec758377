use super::{Record, RecordMeta};
use crate::constants::KITS;
use crate::validation::{require, validate_dimensions, INVALID_DIMENSIONS};
use crate::LogisticsResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The IoT tracker snapshot embedded in a kit. Only `device_id` is required; it must name an
/// existing IoT device when the kit is created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IotDeviceDescriptor {
    pub device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_life: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
}

/// A named configuration of one device and optionally one IoT tracker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Kit {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub kit_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kit_name: Option<String>,
    pub device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iot_device: Option<IotDeviceDescriptor>,
    /// `LxWxHin`.
    pub return_box_dimensions: String,
    /// Pounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_box_weight: Option<f64>,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
}

impl Record for Kit {
    const COLLECTION: &'static str = KITS;
    const ENTITY: &'static str = "Kit";
    const KEY_FIELD: &'static str = "kit_id";

    fn key(&self) -> Option<&str> {
        Some(&self.kit_id)
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn check_format(&self) -> LogisticsResult<()> {
        require(
            validate_dimensions(&self.return_box_dimensions),
            INVALID_DIMENSIONS,
        )
    }
}
