use super::{Record, RecordMeta};
use crate::constants::SHIPMENTS;
use crate::validation::require;
use crate::LogisticsResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

/// Shipment lifecycle state. Any state may follow any other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    #[default]
    Pending,
    InTransit,
    Delivered,
    Cancelled,
}

impl ShipmentStatus {
    pub const ALL: [ShipmentStatus; 4] = [
        ShipmentStatus::Pending,
        ShipmentStatus::InTransit,
        ShipmentStatus::Delivered,
        ShipmentStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "PENDING",
            ShipmentStatus::InTransit => "IN_TRANSIT",
            ShipmentStatus::Delivered => "DELIVERED",
            ShipmentStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid status '{0}'. Must be one of: PENDING, IN_TRANSIT, DELIVERED, CANCELLED")]
pub struct UnknownStatus(pub String);

impl FromStr for ShipmentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShipmentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_owned()))
    }
}

/// A tracked transfer of parcels between two sites under a trial.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Shipment {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub tracking_number: String,
    pub trial_id: String,
    /// Origin site id.
    pub origin: String,
    /// Destination site id.
    pub destination: String,
    #[serde(default)]
    pub status: ShipmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_delivery: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_delivery: Option<DateTime<Utc>>,
    #[serde(default)]
    pub requires_signature: bool,
    #[serde(default)]
    pub hold_at_location: bool,
    #[serde(default)]
    pub sample_ids: Vec<String>,
    #[serde(default)]
    pub notification_emails: Vec<String>,
    /// Parcel references (store identities or parcel ids).
    #[serde(default)]
    pub parcels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kit_id: Option<String>,
    /// Append-only failure log, oldest first.
    #[serde(default)]
    pub failures: Vec<String>,
}

impl Record for Shipment {
    const COLLECTION: &'static str = SHIPMENTS;
    const ENTITY: &'static str = "Shipment";
    const KEY_FIELD: &'static str = "tracking_number";
    const PROTECTED_FIELDS: &'static [&'static str] = &["failures"];

    fn key(&self) -> Option<&str> {
        Some(&self.tracking_number)
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn check_format(&self) -> LogisticsResult<()> {
        match (self.pickup_date, self.expected_delivery) {
            (Some(pickup), Some(expected)) => require(
                pickup < expected,
                "Pickup date must be before expected delivery date",
            ),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn status_round_trips_wire_names() {
        for status in ShipmentStatus::ALL {
            assert_eq!(status.as_str().parse::<ShipmentStatus>().unwrap(), status);
            assert_eq!(serde_json::to_value(status).unwrap(), json!(status.as_str()));
        }
    }

    #[test]
    fn status_parse_is_case_sensitive() {
        assert_eq!(
            "in_transit".parse::<ShipmentStatus>().unwrap_err(),
            UnknownStatus("in_transit".into())
        );
    }

    #[test]
    fn pickup_must_precede_expected_delivery() {
        let mut shipment: Shipment = serde_json::from_value(json!({
            "tracking_number": "SHIP001",
            "trial_id": "TRIAL001",
            "origin": "SITE001",
            "destination": "SITE002",
        }))
        .unwrap();
        assert_eq!(shipment.status, ShipmentStatus::Pending);
        assert!(shipment.check_format().is_ok());

        shipment.pickup_date = Some(Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap());
        shipment.expected_delivery = Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        assert!(shipment.check_format().is_err());
    }
}
