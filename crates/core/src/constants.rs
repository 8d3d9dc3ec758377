//! Constants used throughout the Odyssey core crate.
//!
//! Collection names are part of the storage wire contract and must not change without a
//! data migration.

pub const TRIALS: &str = "trials";
pub const SITES: &str = "sites";
pub const PATIENTS: &str = "patients";
pub const DEVICES: &str = "devices";
pub const IOT_DEVICES: &str = "iot_devices";
pub const KITS: &str = "kits";
pub const PARCELS: &str = "parcels";
pub const SHIPMENTS: &str = "shipments";
pub const ADDRESSES: &str = "addresses";
pub const CONTACT_PERSONS: &str = "contact_persons";
pub const FAILURES: &str = "failures";

/// Database used when `ODYSSEY_DB_NAME` is not set.
pub const DEFAULT_DATABASE_NAME: &str = "odyssey_db";

/// Country assumed for postal code validation when an address omits one.
pub const DEFAULT_COUNTRY: &str = "US";

/// Default `kit_inventory.inventory_threshold` for new sites.
pub const DEFAULT_INVENTORY_THRESHOLD: i64 = 10;
