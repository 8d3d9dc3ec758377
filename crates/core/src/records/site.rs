use super::{AddressRef, ContactRef, Record, RecordMeta};
use crate::constants::{DEFAULT_INVENTORY_THRESHOLD, SITES};
use crate::validation::{require, NEGATIVE_INVENTORY};
use crate::LogisticsResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Kit stock held at a site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct KitInventory {
    #[serde(default)]
    pub inventory_count: i64,
    #[serde(default = "default_threshold")]
    pub inventory_threshold: i64,
}

fn default_threshold() -> i64 {
    DEFAULT_INVENTORY_THRESHOLD
}

impl Default for KitInventory {
    fn default() -> Self {
        Self {
            inventory_count: 0,
            inventory_threshold: DEFAULT_INVENTORY_THRESHOLD,
        }
    }
}

impl KitInventory {
    /// True when stock has dropped below the reorder threshold.
    pub fn below_threshold(&self) -> bool {
        self.inventory_count < self.inventory_threshold
    }
}

fn active() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Site {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub site_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub address: Option<AddressRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub contact_person: Option<ContactRef>,
    #[serde(default)]
    pub associated_trials: Vec<String>,
    #[serde(default)]
    pub associated_patients: Vec<String>,
    #[serde(default)]
    pub kit_inventory: KitInventory,
    #[serde(default = "active")]
    pub is_active: bool,
}

impl Record for Site {
    const COLLECTION: &'static str = SITES;
    const ENTITY: &'static str = "Site";
    const KEY_FIELD: &'static str = "site_id";

    fn key(&self) -> Option<&str> {
        Some(&self.site_id)
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn check_format(&self) -> LogisticsResult<()> {
        require(self.kit_inventory.inventory_count >= 0, NEGATIVE_INVENTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn site_defaults() {
        let site: Site = serde_json::from_value(json!({
            "site_id": "SITE001",
            "name": "Test Site 1",
            "address": "ADDR001",
        }))
        .unwrap();
        assert!(site.is_active);
        assert_eq!(site.kit_inventory, KitInventory::default());
        assert_eq!(site.address, Some(AddressRef::Id("ADDR001".into())));
    }

    #[test]
    fn negative_stock_fails_format_check() {
        let site: Site = serde_json::from_value(json!({
            "site_id": "SITE001",
            "kit_inventory": {"inventory_count": -1},
        }))
        .unwrap();
        assert!(site.check_format().is_err());
    }

    #[test]
    fn below_threshold_is_strict() {
        let inv = KitInventory {
            inventory_count: 10,
            inventory_threshold: 10,
        };
        assert!(!inv.below_threshold());
        assert!(KitInventory::default().below_threshold());
    }
}
