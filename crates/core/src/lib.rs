//! # Odyssey Core
//!
//! Core business logic for clinical-trial logistics.
//!
//! This crate contains the records, their validation and the services that store them:
//! - Trials, sites and patients, and the links between them
//! - Devices, IoT devices and the kits assembled from them
//! - Parcels and shipments, including the shipment status lifecycle and failure log
//! - Read-only joined views and shipment analytics
//!
//! Persistence goes through the [`store::DocumentStore`] trait, backed by MongoDB in
//! deployment and by an in-memory store in tests and local runs.
//!
//! **No API concerns**: authentication and HTTP routing belong in `api-rest` and `api-shared`.

pub mod config;
pub mod constants;
pub mod error;
pub mod queries;
pub mod records;
pub mod repositories;
pub mod store;
pub mod validation;

pub use config::{CoreConfig, StoreBackend};
pub use error::{LogisticsError, LogisticsResult};
pub use repositories::catalog::{DeviceService, IotDeviceService, KitService};
pub use repositories::contacts::{AddressService, ContactPersonService};
pub use repositories::failures::FailureReportService;
pub use repositories::parcels::ParcelService;
pub use repositories::patients::PatientService;
pub use repositories::shipments::ShipmentService;
pub use repositories::sites::SiteService;
pub use repositories::trials::TrialService;
pub use store::{open_store, DocumentStore};
