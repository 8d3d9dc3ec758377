use super::{Record, RecordMeta};
use crate::constants::{DEVICES, IOT_DEVICES};
use crate::validation::{require, validate_temp_range, INVALID_TEMP_RANGE};
use crate::LogisticsResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum SampleType {
    Blood,
    Saliva,
    Urine,
    Other,
}

impl SampleType {
    pub fn as_str(self) -> &'static str {
        match self {
            SampleType::Blood => "Blood",
            SampleType::Saliva => "Saliva",
            SampleType::Urine => "Urine",
            SampleType::Other => "Other",
        }
    }
}

/// A diagnostic collection device packed into kits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Device {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_type: Option<SampleType>,
    /// Storage temperature, e.g. `2-8°C`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_range: Option<String>,
    #[serde(default)]
    pub is_hazardous: bool,
}

impl Record for Device {
    const COLLECTION: &'static str = DEVICES;
    const ENTITY: &'static str = "Device";
    const KEY_FIELD: &'static str = "device_id";

    fn key(&self) -> Option<&str> {
        Some(&self.device_id)
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn check_format(&self) -> LogisticsResult<()> {
        match &self.temp_range {
            Some(range) => require(validate_temp_range(range), INVALID_TEMP_RANGE),
            None => Ok(()),
        }
    }
}

/// A reusable IoT tracker that can travel with a kit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IotDevice {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_life: Option<String>,
    #[serde(default)]
    pub cycle_count: i64,
    #[serde(default)]
    pub exists: bool,
}

impl Record for IotDevice {
    const COLLECTION: &'static str = IOT_DEVICES;
    const ENTITY: &'static str = "IoTDevice";
    const KEY_FIELD: &'static str = "device_id";

    fn key(&self) -> Option<&str> {
        Some(&self.device_id)
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn iot_device_defaults() {
        let device: IotDevice = serde_json::from_value(json!({"device_id": "IOT001"})).unwrap();
        assert_eq!(device.cycle_count, 0);
        assert!(!device.exists);
    }

    #[test]
    fn device_rejects_malformed_temperature_range() {
        let mut device: Device = serde_json::from_value(json!({
            "device_id": "DEV001",
            "sample_type": "Blood",
            "temp_range": "2-8°C",
        }))
        .unwrap();
        assert!(device.check_format().is_ok());

        device.temp_range = Some("cold".into());
        assert!(device.check_format().is_err());
    }

    #[test]
    fn unknown_sample_type_is_rejected() {
        let parsed = serde_json::from_value::<Device>(json!({
            "device_id": "DEV001",
            "sample_type": "Plasma",
        }));
        assert!(parsed.is_err());
    }
}
