use super::shared::RecordRepository;
use crate::error::{LogisticsError, LogisticsResult};
use crate::queries::{self, SiteRollup, SiteRollupView};
use crate::records::{KitInventory, Site};
use crate::store::{Document, DocumentStore, Filter, Update};
use crate::validation::NEGATIVE_INVENTORY;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

const INVENTORY_COUNT: &str = "kit_inventory.inventory_count";
const MAX_ADJUST_ATTEMPTS: usize = 5;

/// Matches a site whose stored count still equals `count`. A site stored without a count
/// reads as zero.
fn inventory_guard(count: i64) -> Filter {
    let guard = Filter::eq(INVENTORY_COUNT, count);
    if count == 0 {
        Filter::Or(vec![guard, Filter::eq(INVENTORY_COUNT, Value::Null)])
    } else {
        guard
    }
}

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SiteQuery {
    /// Only sites participating in this trial.
    pub trial_id: Option<String>,
}

/// A site's kit stock with its reorder flag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct KitInventoryStatus {
    pub site_id: String,
    pub inventory_count: i64,
    pub inventory_threshold: i64,
    pub below_threshold: bool,
}

impl KitInventoryStatus {
    fn new(site_id: String, inventory: KitInventory) -> Self {
        Self {
            site_id,
            inventory_count: inventory.inventory_count,
            inventory_threshold: inventory.inventory_threshold,
            below_threshold: inventory.below_threshold(),
        }
    }
}

#[derive(Clone)]
pub struct SiteService {
    sites: RecordRepository<Site>,
}

impl SiteService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            sites: RecordRepository::new(store),
        }
    }

    pub async fn list(&self, query: &SiteQuery) -> LogisticsResult<Vec<Site>> {
        let filter = Filter::All.and_eq_opt("associated_trials", query.trial_id.as_deref());
        self.sites.list(&filter).await
    }

    pub async fn create(&self, site: Site) -> LogisticsResult<Site> {
        self.sites.insert(&site).await
    }

    pub async fn retrieve(&self, site_id: &str) -> LogisticsResult<Site> {
        self.sites.retrieve(site_id).await
    }

    pub async fn update(&self, site_id: &str, partial: Document) -> LogisticsResult<Site> {
        self.sites.update(site_id, partial).await
    }

    pub async fn kit_inventory(&self, site_id: &str) -> LogisticsResult<KitInventoryStatus> {
        let site = self.sites.retrieve(site_id).await?;
        Ok(KitInventoryStatus::new(site.site_id, site.kit_inventory))
    }

    /// Adds `delta` (which may be negative) to the site's kit count.
    ///
    /// The increment is conditional on the count read beforehand, so concurrent adjustments
    /// cannot push the stock below zero between the check and the write.
    ///
    /// # Errors
    ///
    /// - `LogisticsError::NotFound` if the site does not exist.
    /// - `LogisticsError::Validation` if the count would drop below zero, or if the count kept
    ///   changing underneath every attempt.
    pub async fn adjust_kit_inventory(
        &self,
        site_id: &str,
        delta: i64,
    ) -> LogisticsResult<KitInventoryStatus> {
        for _ in 0..MAX_ADJUST_ATTEMPTS {
            let site = self.sites.retrieve(site_id).await?;
            let current = site.kit_inventory.inventory_count;
            if !current.checked_add(delta).is_some_and(|n| n >= 0) {
                tracing::warn!(site_id, delta, "inventory adjustment rejected");
                return Err(LogisticsError::validation(NEGATIVE_INVENTORY));
            }

            let update = Update::new().inc(INVENTORY_COUNT, delta);
            if self
                .sites
                .apply_guarded(site_id, inventory_guard(current), update)
                .await?
                .is_some()
            {
                tracing::info!(site_id, delta, "kit inventory adjusted");
                return self.kit_inventory(site_id).await;
            }
            tracing::debug!(site_id, delta, "kit inventory changed during adjustment");
        }
        Err(LogisticsError::validation(
            "Kit inventory is changing concurrently, retry the adjustment",
        ))
    }

    pub async fn rollup(&self, site_id: &str) -> LogisticsResult<SiteRollupView> {
        let query = SiteRollup {
            site_id: site_id.to_owned(),
        };
        queries::run(self.sites.store().as_ref(), &query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LogisticsError::not_found("Site", site_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Kit, Patient};
    use crate::store::{MemoryStore, INDEX_PLAN};
    use serde_json::json;

    async fn service() -> (SiteService, Arc<dyn DocumentStore>) {
        let store = MemoryStore::new();
        store.ensure_indexes(INDEX_PLAN).await.unwrap();
        let store: Arc<dyn DocumentStore> = Arc::new(store);
        let svc = SiteService::new(Arc::clone(&store));
        svc.create(
            serde_json::from_value(json!({
                "site_id": "SITE001",
                "name": "Test Site 1",
                "associated_trials": ["TRIAL001"],
                "kit_inventory": {"inventory_count": 12, "inventory_threshold": 10},
            }))
            .unwrap(),
        )
        .await
        .unwrap();
        svc.create(serde_json::from_value(json!({"site_id": "SITE002"})).unwrap())
            .await
            .unwrap();
        (svc, store)
    }

    #[tokio::test]
    async fn list_filters_by_trial_membership() {
        let (svc, _) = service().await;
        let query = SiteQuery {
            trial_id: Some("TRIAL001".into()),
        };
        let sites = svc.list(&query).await.unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].site_id, "SITE001");
        assert_eq!(svc.list(&SiteQuery::default()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn kit_inventory_flags_low_stock() {
        let (svc, _) = service().await;
        assert!(!svc.kit_inventory("SITE001").await.unwrap().below_threshold);

        let status = svc.adjust_kit_inventory("SITE001", -5).await.unwrap();
        assert_eq!(status.inventory_count, 7);
        assert!(status.below_threshold);
    }

    #[tokio::test]
    async fn adjust_inventory_rejects_negative_stock() {
        let (svc, _) = service().await;
        let err = svc.adjust_kit_inventory("SITE002", -1).await.unwrap_err();
        assert!(matches!(err, LogisticsError::Validation(_)));
        assert_eq!(svc.kit_inventory("SITE002").await.unwrap().inventory_count, 0);
    }

    #[tokio::test]
    async fn concurrent_decrements_never_overdraw_stock() {
        let (svc, _) = service().await;
        let (a, b) = tokio::join!(
            svc.adjust_kit_inventory("SITE001", -7),
            svc.adjust_kit_inventory("SITE001", -7),
        );
        assert!(a.is_ok() != b.is_ok());
        assert_eq!(svc.kit_inventory("SITE001").await.unwrap().inventory_count, 5);
    }

    #[tokio::test]
    async fn site_update_cannot_set_negative_stock() {
        let (svc, _) = service().await;
        let partial = match json!({"kit_inventory": {"inventory_count": -7}}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let err = svc.update("SITE001", partial).await.unwrap_err();
        assert!(matches!(err, LogisticsError::Validation(m) if m == NEGATIVE_INVENTORY));
        assert_eq!(svc.kit_inventory("SITE001").await.unwrap().inventory_count, 12);
    }

    #[tokio::test]
    async fn adjust_inventory_on_unknown_site_is_not_found() {
        let (svc, _) = service().await;
        let err = svc.adjust_kit_inventory("SITE404", 1).await.unwrap_err();
        assert!(matches!(err, LogisticsError::NotFound { .. }));
    }

    #[tokio::test]
    async fn rollup_collects_patients_and_kits() {
        let (svc, store) = service().await;
        RecordRepository::<Patient>::new(Arc::clone(&store))
            .insert(&serde_json::from_value(json!({
                "patient_id": "PAT001",
                "associated_sites": ["SITE001"],
            })).unwrap())
            .await
            .unwrap();
        RecordRepository::<Kit>::new(Arc::clone(&store))
            .insert(&serde_json::from_value(json!({
                "kit_id": "KIT001",
                "device_id": "DEV001",
                "return_box_dimensions": "12x8x6in",
                "site_id": "SITE001",
            })).unwrap())
            .await
            .unwrap();

        let view = svc.rollup("SITE001").await.unwrap();
        assert_eq!(view.patient_details[0].patient_id, "PAT001");
        assert_eq!(view.available_kits[0].kit_id, "KIT001");
        assert!(svc.rollup("SITE002").await.unwrap().available_kits.is_empty());
    }
}
