//! Demo data for a fresh database.
//!
//! Everything goes through the core services, so the seed set obeys the same validation and
//! reference checks as API traffic. Records are inserted in dependency order: devices before
//! kits, sites before the shipment that joins them.

use chrono::{Duration, Utc};
use odyssey_core::store::DocumentStore;
use odyssey_core::{
    AddressService, DeviceService, IotDeviceService, KitService, LogisticsResult,
    ParcelService, PatientService, ShipmentService, SiteService, TrialService,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

fn record<T: DeserializeOwned>(value: Value) -> LogisticsResult<T> {
    Ok(serde_json::from_value(value)?)
}

/// Number of records written per collection, in insertion order.
pub type SeedSummary = Vec<(&'static str, usize)>;

/// Inserts the demo data set. Fails on the first rejected record, for example when the
/// database was already seeded.
pub async fn seed(store: Arc<dyn DocumentStore>) -> LogisticsResult<SeedSummary> {
    let mut summary = SeedSummary::new();

    let addresses = AddressService::new(Arc::clone(&store));
    addresses
        .create(record(json!({
            "address_id": "ADDR001",
            "street": "123 Test St",
            "city": "Test City",
            "state": "TS",
            "postal_code": "12345",
            "country": "US",
        }))?)
        .await?;
    addresses
        .create(record(json!({
            "address_id": "ADDR002",
            "street": "456 Lab Ave",
            "city": "Test City",
            "state": "TS",
            "postal_code": "12345-6789",
            "country": "US",
        }))?)
        .await?;
    summary.push(("addresses", 2));

    let devices = DeviceService::new(Arc::clone(&store));
    let now = Utc::now();
    devices
        .create(record(json!({
            "device_id": "DEV001",
            "manufacturer": "TestMfg",
            "device_name": "Blood Test Kit",
            "expiration_date": now + Duration::days(180),
            "batch_no": "BATCH001",
            "sample_type": "Blood",
            "temp_range": "2-8°C",
            "is_hazardous": true,
        }))?)
        .await?;
    devices
        .create(record(json!({
            "device_id": "DEV002",
            "manufacturer": "TestMfg",
            "device_name": "Saliva Test Kit",
            "expiration_date": now + Duration::days(365),
            "batch_no": "BATCH002",
            "sample_type": "Saliva",
            "temp_range": "15-25°C",
            "is_hazardous": false,
        }))?)
        .await?;
    summary.push(("devices", 2));

    IotDeviceService::new(Arc::clone(&store))
        .create(record(json!({
            "device_id": "IOT001",
            "manufacturer": "IoTMfg",
            "battery_life": "6 months",
            "cycle_count": 0,
            "exists": true,
        }))?)
        .await?;
    summary.push(("iot_devices", 1));

    KitService::new(Arc::clone(&store))
        .create(record(json!({
            "kit_id": "KIT001",
            "kit_name": "Complete Blood Test Kit",
            "device_id": "DEV001",
            "iot_device": {"device_id": "IOT001", "manufacturer": "IoTMfg"},
            "return_box_dimensions": "12x8x6in",
            "return_box_weight": 2.5,
            "is_template": true,
        }))?)
        .await?;
    summary.push(("kits", 1));

    ParcelService::new(Arc::clone(&store))
        .create(record(json!({
            "dimensions": "24x18x12in",
            "weight": 5.5,
            "total_pieces": 3,
            "contents": [{"kit_id": "KIT001", "quantity": 2}],
            "additional_items": ["Ice pack", "Instructions"],
            "is_template": true,
        }))?)
        .await?;
    summary.push(("parcels", 1));

    let sites = SiteService::new(Arc::clone(&store));
    sites
        .create(record(json!({
            "site_id": "SITE001",
            "name": "Test Site 1",
            "address": "ADDR001",
            "associated_trials": ["TRIAL001"],
        }))?)
        .await?;
    sites
        .create(record(json!({
            "site_id": "SITE002",
            "name": "Central Lab",
            "address": "ADDR002",
        }))?)
        .await?;
    summary.push(("sites", 2));

    PatientService::new(Arc::clone(&store))
        .create(record(json!({
            "patient_id": "PAT001",
            "email": "patient@example.com",
            "associated_trials": ["TRIAL001"],
            "associated_sites": ["SITE001"],
        }))?)
        .await?;
    summary.push(("patients", 1));

    TrialService::new(Arc::clone(&store))
        .create(record(json!({
            "trial_id": "TRIAL001",
            "associated_sites": ["SITE001"],
            "associated_patients": ["PAT001"],
            "diagnostic_kits_template": ["KIT001"],
            "default_send_address": "ADDR001",
            "default_receive_address": "ADDR002",
        }))?)
        .await?;
    summary.push(("trials", 1));

    ShipmentService::new(store)
        .create(record(json!({
            "tracking_number": "SHIP001",
            "trial_id": "TRIAL001",
            "origin": "SITE001",
            "destination": "SITE002",
            "carrier": "FedEx",
            "service_type": "Express",
            "cost": 45.5,
            "kit_id": "KIT001",
            "sample_ids": ["SAMPLE001"],
            "notification_emails": ["test@example.com"],
        }))?)
        .await?;
    summary.push(("shipments", 1));

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use odyssey_core::queries::TrialRollupView;
    use odyssey_core::store::{MemoryStore, INDEX_PLAN};
    use odyssey_core::LogisticsError;

    async fn store() -> Arc<dyn DocumentStore> {
        let store = MemoryStore::new();
        store.ensure_indexes(INDEX_PLAN).await.unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn seed_set_is_consistent() {
        let store = store().await;
        let summary = seed(Arc::clone(&store)).await.unwrap();
        assert_eq!(summary.iter().map(|(_, n)| n).sum::<usize>(), 12);

        let rollup: TrialRollupView = TrialService::new(Arc::clone(&store))
            .rollup("TRIAL001")
            .await
            .unwrap();
        assert_eq!(rollup.site_details.len(), 1);
        assert_eq!(rollup.patient_details.len(), 1);
        assert_eq!(rollup.kit_templates.len(), 1);

        let details = ShipmentService::new(store).details("SHIP001").await.unwrap();
        assert_eq!(details.kit_info[0].kit_id, "KIT001");
    }

    #[tokio::test]
    async fn seeding_twice_is_rejected() {
        let store = store().await;
        seed(Arc::clone(&store)).await.unwrap();
        let err = seed(store).await.unwrap_err();
        assert!(matches!(err, LogisticsError::Store(_)));
    }
}
