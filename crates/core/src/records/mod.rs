//! Typed records for every collection.
//!
//! Records are what services accept and return. They deserialize from stored documents and
//! ignore fields they do not know about, so documents written by older versions still load.
//!
//! Every record carries a [`RecordMeta`]: the store identity (`_id`, always rendered as a
//! string) and the server-assigned timestamps. Clients may send these fields but the
//! repository overwrites them on create and refuses to change them on update.

mod address;
mod device;
mod failure;
mod kit;
mod parcel;
mod patient;
mod shipment;
mod site;
mod trial;

pub use address::{Address, ContactPerson};
pub use device::{Device, IotDevice, SampleType};
pub use failure::FailureReport;
pub use kit::{IotDeviceDescriptor, Kit};
pub use parcel::{Parcel, ParcelContent};
pub use patient::Patient;
pub use shipment::{Shipment, ShipmentStatus, UnknownStatus};
pub use site::{KitInventory, Site};
pub use trial::Trial;

use crate::LogisticsResult;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Store identity and timestamps shared by every record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecordMeta {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields no client may write through a generic update.
pub const META_FIELDS: &[&str] = &["_id", "created_at", "updated_at"];

/// A reference to an [`Address`]: either its id or the embedded document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddressRef {
    Id(String),
    Embedded(Box<Address>),
}

/// A reference to a [`ContactPerson`]: either its id or the embedded document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContactRef {
    Id(String),
    Embedded(Box<ContactPerson>),
}

/// A typed document stored in one collection.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection the record lives in.
    const COLLECTION: &'static str;
    /// Human-readable entity name used in error messages.
    const ENTITY: &'static str;
    /// Field holding the business key, or `_id` for records without one.
    const KEY_FIELD: &'static str;
    /// Fields a generic update may not change, beyond the key and [`META_FIELDS`].
    const PROTECTED_FIELDS: &'static [&'static str] = &[];

    /// The business key, or the store identity for records without one.
    fn key(&self) -> Option<&str>;

    fn meta(&self) -> &RecordMeta;

    /// Format checks that need nothing but the record itself. Run on create and on the
    /// merged result of an update.
    fn check_format(&self) -> LogisticsResult<()> {
        Ok(())
    }
}
