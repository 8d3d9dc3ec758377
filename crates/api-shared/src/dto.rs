//! Request and response bodies that are not records themselves.

use odyssey_core::records::Shipment;
use odyssey_core::repositories::trials::RelationshipChanges;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Body of every non-2xx response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

impl ErrorRes {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BulkAddSitesReq {
    #[serde(default)]
    pub site_ids: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ManageRelationshipsReq {
    #[serde(default)]
    pub add_sites: Vec<String>,
    #[serde(default)]
    pub remove_sites: Vec<String>,
    #[serde(default)]
    pub add_patients: Vec<String>,
    #[serde(default)]
    pub remove_patients: Vec<String>,
}

impl From<ManageRelationshipsReq> for RelationshipChanges {
    fn from(req: ManageRelationshipsReq) -> Self {
        Self {
            add_sites: req.add_sites,
            remove_sites: req.remove_sites,
            add_patients: req.add_patients,
            remove_patients: req.remove_patients,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateStatusReq {
    /// One of `PENDING`, `IN_TRANSIT`, `DELIVERED`, `CANCELLED`.
    #[serde(default)]
    pub status: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AddFailureReq {
    #[serde(default)]
    pub failure: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BulkCreateShipmentsReq {
    pub shipments: Vec<Shipment>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AdjustInventoryReq {
    /// Signed change to the kit count.
    pub delta: i64,
}

#[derive(Clone, Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SavedShipmentsParams {
    /// Email address listed in the shipments' notification emails.
    pub username: String,
}
