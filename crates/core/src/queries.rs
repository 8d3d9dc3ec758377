//! Named relationship and analytics queries.
//!
//! Each query is a small parameterised object that knows its source collection, builds a
//! [`Pipeline`] and names the row type its results deserialize into. Pipelines are backend
//! neutral, so every query here runs unchanged against [`MemoryStore`](crate::store::MemoryStore)
//! in tests and against MongoDB in production.

use crate::constants::{DEVICES, IOT_DEVICES, KITS, PARCELS, PATIENTS, SHIPMENTS, SITES, TRIALS};
use crate::error::LogisticsResult;
use crate::records::{Device, IotDevice, Kit, Parcel, Patient, Shipment, Site, Trial};
use crate::repositories::shared::from_document;
use crate::store::{DocumentStore, Filter, Group, GroupKey, Pipeline, SortOrder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub trait NamedQuery {
    type Row: DeserializeOwned;

    /// Stable name used in logs.
    const NAME: &'static str;

    fn collection(&self) -> &'static str;

    fn pipeline(&self) -> Pipeline;
}

/// Runs `query` and deserializes every result row.
///
/// # Errors
///
/// Returns `LogisticsError::Store` if the aggregation fails or a row does not match the
/// query's row type.
pub async fn run<Q: NamedQuery>(store: &dyn DocumentStore, query: &Q) -> LogisticsResult<Vec<Q::Row>> {
    let docs = store.aggregate(query.collection(), &query.pipeline()).await?;
    tracing::debug!(query = Q::NAME, rows = docs.len(), "query executed");
    docs.into_iter().map(from_document).collect()
}

// ============================================================================
// RELATIONSHIP VIEWS
// ============================================================================

/// A trial with its sites, patients and template kits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TrialRollupView {
    #[serde(flatten)]
    pub trial: Trial,
    #[serde(default)]
    pub site_details: Vec<Site>,
    #[serde(default)]
    pub patient_details: Vec<Patient>,
    #[serde(default)]
    pub kit_templates: Vec<Kit>,
}

pub struct TrialRollup {
    pub trial_id: String,
}

impl NamedQuery for TrialRollup {
    type Row = TrialRollupView;
    const NAME: &'static str = "trial_rollup";

    fn collection(&self) -> &'static str {
        TRIALS
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::new()
            .matching(Filter::eq("trial_id", self.trial_id.as_str()))
            .lookup(SITES, "associated_sites", "site_id", "site_details")
            .lookup(PATIENTS, "associated_patients", "patient_id", "patient_details")
            .lookup(KITS, "diagnostic_kits_template", "kit_id", "kit_templates")
    }
}

/// A site with the patients enrolled there and the kits stocked there.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SiteRollupView {
    #[serde(flatten)]
    pub site: Site,
    #[serde(default)]
    pub patient_details: Vec<Patient>,
    #[serde(default)]
    pub available_kits: Vec<Kit>,
}

pub struct SiteRollup {
    pub site_id: String,
}

impl NamedQuery for SiteRollup {
    type Row = SiteRollupView;
    const NAME: &'static str = "site_rollup";

    fn collection(&self) -> &'static str {
        SITES
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::new()
            .matching(Filter::eq("site_id", self.site_id.as_str()))
            .lookup(PATIENTS, "site_id", "associated_sites", "patient_details")
            .lookup(KITS, "site_id", "site_id", "available_kits")
    }
}

/// A shipment joined with its trial, both sites and its kit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShipmentDetailsView {
    #[serde(flatten)]
    pub shipment: Shipment,
    #[serde(default)]
    pub trial_info: Vec<Trial>,
    #[serde(default)]
    pub origin_site: Vec<Site>,
    #[serde(default)]
    pub destination_site: Vec<Site>,
    #[serde(default)]
    pub kit_info: Vec<Kit>,
}

pub struct ShipmentDetails {
    pub tracking_number: String,
}

impl NamedQuery for ShipmentDetails {
    type Row = ShipmentDetailsView;
    const NAME: &'static str = "shipment_details";

    fn collection(&self) -> &'static str {
        SHIPMENTS
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::new()
            .matching(Filter::eq("tracking_number", self.tracking_number.as_str()))
            .lookup(TRIALS, "trial_id", "trial_id", "trial_info")
            .lookup(SITES, "origin", "site_id", "origin_site")
            .lookup(SITES, "destination", "site_id", "destination_site")
            .lookup(KITS, "kit_id", "kit_id", "kit_info")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct KitDeviceDetailsView {
    #[serde(flatten)]
    pub kit: Kit,
    #[serde(default)]
    pub device_details: Vec<Device>,
    #[serde(default)]
    pub iot_device_details: Vec<IotDevice>,
}

pub struct KitDeviceDetails {
    pub kit_id: String,
}

impl NamedQuery for KitDeviceDetails {
    type Row = KitDeviceDetailsView;
    const NAME: &'static str = "kit_device_details";

    fn collection(&self) -> &'static str {
        KITS
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::new()
            .matching(Filter::eq("kit_id", self.kit_id.as_str()))
            .lookup(DEVICES, "device_id", "device_id", "device_details")
            .lookup(IOT_DEVICES, "iot_device.device_id", "device_id", "iot_device_details")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ParcelTemplateView {
    #[serde(flatten)]
    pub parcel: Parcel,
    #[serde(default)]
    pub kit_details: Vec<Kit>,
}

/// Template parcels with the kits they contain.
pub struct ParcelTemplates;

impl NamedQuery for ParcelTemplates {
    type Row = ParcelTemplateView;
    const NAME: &'static str = "parcel_templates";

    fn collection(&self) -> &'static str {
        PARCELS
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::new()
            .matching(Filter::eq("is_template", true))
            .lookup(KITS, "contents.kit_id", "kit_id", "kit_details")
    }
}

// ============================================================================
// SHIPMENT ANALYTICS
// ============================================================================

/// How often one failure descriptor occurred and on which shipments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FailureBreakdownRow {
    #[serde(rename = "_id")]
    pub failure: String,
    pub count: i64,
    #[serde(default)]
    pub shipments: Vec<String>,
}

/// Failure descriptors ranked by frequency, ties broken by descriptor.
pub struct FailureBreakdown {
    pub pre_filter: Filter,
}

impl FailureBreakdown {
    fn stages(pre_filter: Filter) -> Pipeline {
        Pipeline::new()
            .matching(pre_filter)
            .unwind("failures")
            .group(
                Group::by(GroupKey::Field("failures".into()))
                    .count("count")
                    .push("shipments", "tracking_number"),
            )
            .sort(&[("count", SortOrder::Descending), ("_id", SortOrder::Ascending)])
    }
}

impl NamedQuery for FailureBreakdown {
    type Row = FailureBreakdownRow;
    const NAME: &'static str = "failure_breakdown";

    fn collection(&self) -> &'static str {
        SHIPMENTS
    }

    fn pipeline(&self) -> Pipeline {
        Self::stages(self.pre_filter.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StatusSummaryRow {
    #[serde(rename = "_id")]
    pub status: Option<String>,
    pub count: i64,
    #[serde(default)]
    pub total_cost: f64,
    pub avg_cost: Option<f64>,
    #[serde(default)]
    pub shipments: Vec<String>,
}

/// Shipment counts and costs per status.
pub struct StatusSummary {
    pub pre_filter: Filter,
}

impl StatusSummary {
    fn stages(pre_filter: Filter) -> Pipeline {
        Pipeline::new()
            .matching(pre_filter)
            .group(
                Group::by(GroupKey::Field("status".into()))
                    .count("count")
                    .sum("total_cost", "cost")
                    .avg("avg_cost", "cost")
                    .push("shipments", "tracking_number"),
            )
            .sort(&[("count", SortOrder::Descending), ("_id", SortOrder::Ascending)])
    }
}

impl NamedQuery for StatusSummary {
    type Row = StatusSummaryRow;
    const NAME: &'static str = "status_summary";

    fn collection(&self) -> &'static str {
        SHIPMENTS
    }

    fn pipeline(&self) -> Pipeline {
        Self::stages(self.pre_filter.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyTrendRow {
    /// `YYYY-MM` of `created_at`.
    #[serde(rename = "_id")]
    pub month: Option<String>,
    pub shipment_count: i64,
    #[serde(default)]
    pub total_cost: f64,
}

/// Shipments created and money spent per calendar month, oldest first.
pub struct MonthlyTrend {
    pub pre_filter: Filter,
}

impl MonthlyTrend {
    fn stages(pre_filter: Filter) -> Pipeline {
        Pipeline::new()
            .matching(pre_filter)
            .group(
                Group::by(GroupKey::Month("created_at".into()))
                    .count("shipment_count")
                    .sum("total_cost", "cost"),
            )
            .sort(&[("_id", SortOrder::Ascending)])
    }
}

impl NamedQuery for MonthlyTrend {
    type Row = MonthlyTrendRow;
    const NAME: &'static str = "monthly_trend";

    fn collection(&self) -> &'static str {
        SHIPMENTS
    }

    fn pipeline(&self) -> Pipeline {
        Self::stages(self.pre_filter.clone())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShipmentAnalyticsView {
    #[serde(default)]
    pub status_summary: Vec<StatusSummaryRow>,
    #[serde(default)]
    pub failure_analysis: Vec<FailureBreakdownRow>,
    #[serde(default)]
    pub monthly_trends: Vec<MonthlyTrendRow>,
}

/// Status summary, failure breakdown and monthly trend in one pass.
pub struct ShipmentAnalytics {
    pub pre_filter: Filter,
}

impl NamedQuery for ShipmentAnalytics {
    type Row = ShipmentAnalyticsView;
    const NAME: &'static str = "shipment_analytics";

    fn collection(&self) -> &'static str {
        SHIPMENTS
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::new().matching(self.pre_filter.clone()).facet(vec![
            ("status_summary", StatusSummary::stages(Filter::All)),
            ("failure_analysis", FailureBreakdown::stages(Filter::All)),
            ("monthly_trends", MonthlyTrend::stages(Filter::All)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Document, MemoryStore};
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    async fn seed(store: &MemoryStore, collection: &str, docs: Vec<Value>) {
        store
            .insert_many(collection, docs.into_iter().map(doc).collect())
            .await
            .unwrap();
    }

    fn shipment(tracking: &str, status: &str, cost: f64, month: &str, failures: &[&str]) -> Value {
        json!({
            "tracking_number": tracking,
            "trial_id": "TRIAL001",
            "origin": "SITE001",
            "destination": "SITE002",
            "status": status,
            "cost": cost,
            "created_at": format!("{month}-10T12:00:00Z"),
            "failures": failures,
        })
    }

    async fn seeded_shipments() -> MemoryStore {
        let store = MemoryStore::new();
        seed(
            &store,
            SHIPMENTS,
            vec![
                shipment("S1", "PENDING", 10.0, "2024-01", &["temperature excursion", "late pickup"]),
                shipment("S2", "DELIVERED", 20.0, "2024-01", &["temperature excursion"]),
                shipment("S3", "DELIVERED", 30.0, "2024-02", &[]),
                shipment("S4", "IN_TRANSIT", 40.0, "2024-03", &["damaged box", "late pickup", "temperature excursion"]),
            ],
        )
        .await;
        store
    }

    #[tokio::test]
    async fn failure_breakdown_matches_hand_counts() {
        let store = seeded_shipments().await;
        let rows = run(&store, &FailureBreakdown { pre_filter: Filter::All }).await.unwrap();
        let summary: Vec<(&str, i64)> = rows.iter().map(|r| (r.failure.as_str(), r.count)).collect();
        assert_eq!(
            summary,
            [("temperature excursion", 3), ("late pickup", 2), ("damaged box", 1)]
        );
        assert_eq!(rows[0].shipments, ["S1", "S2", "S4"]);
    }

    #[tokio::test]
    async fn failure_breakdown_honours_pre_filter() {
        let store = seeded_shipments().await;
        let rows = run(
            &store,
            &FailureBreakdown {
                pre_filter: Filter::eq("status", "DELIVERED"),
            },
        )
        .await
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].failure, "temperature excursion");
        assert_eq!(rows[0].count, 1);
    }

    #[tokio::test]
    async fn status_summary_totals_costs() {
        let store = seeded_shipments().await;
        let rows = run(&store, &StatusSummary { pre_filter: Filter::All }).await.unwrap();
        let delivered = &rows[0];
        assert_eq!(delivered.status.as_deref(), Some("DELIVERED"));
        assert_eq!(delivered.count, 2);
        assert_eq!(delivered.total_cost, 50.0);
        assert_eq!(delivered.avg_cost, Some(25.0));
        assert_eq!(rows.len(), 3);
    }

    #[tokio::test]
    async fn monthly_trend_groups_by_creation_month() {
        let store = seeded_shipments().await;
        let rows = run(&store, &MonthlyTrend { pre_filter: Filter::All }).await.unwrap();
        let months: Vec<(Option<&str>, i64, f64)> = rows
            .iter()
            .map(|r| (r.month.as_deref(), r.shipment_count, r.total_cost))
            .collect();
        assert_eq!(
            months,
            [
                (Some("2024-01"), 2, 30.0),
                (Some("2024-02"), 1, 30.0),
                (Some("2024-03"), 1, 40.0),
            ]
        );
    }

    #[tokio::test]
    async fn shipment_analytics_combines_facets() {
        let store = seeded_shipments().await;
        let rows = run(&store, &ShipmentAnalytics { pre_filter: Filter::All }).await.unwrap();
        assert_eq!(rows.len(), 1);
        let view = &rows[0];
        assert_eq!(view.status_summary.len(), 3);
        assert_eq!(view.failure_analysis[0].count, 3);
        assert_eq!(view.monthly_trends.len(), 3);
    }

    #[tokio::test]
    async fn trial_rollup_joins_sites_patients_and_kits() {
        let store = MemoryStore::new();
        seed(
            &store,
            TRIALS,
            vec![json!({
                "trial_id": "TRIAL001",
                "associated_sites": ["SITE001"],
                "associated_patients": ["PAT001", "PAT404"],
                "diagnostic_kits_template": ["KIT001"],
            })],
        )
        .await;
        seed(&store, SITES, vec![json!({"site_id": "SITE001"}), json!({"site_id": "SITE002"})]).await;
        seed(&store, PATIENTS, vec![json!({"patient_id": "PAT001"})]).await;
        seed(
            &store,
            KITS,
            vec![json!({"kit_id": "KIT001", "device_id": "DEV001", "return_box_dimensions": "12x8x6in"})],
        )
        .await;

        let rows = run(&store, &TrialRollup { trial_id: "TRIAL001".into() }).await.unwrap();
        let view = &rows[0];
        assert_eq!(view.trial.trial_id, "TRIAL001");
        assert_eq!(view.site_details.len(), 1);
        assert_eq!(view.patient_details.len(), 1);
        assert_eq!(view.kit_templates[0].kit_id, "KIT001");
    }

    #[tokio::test]
    async fn parcel_templates_join_kits_through_contents() {
        let store = MemoryStore::new();
        seed(
            &store,
            PARCELS,
            vec![
                json!({
                    "dimensions": "24x18x12in", "weight": 5.5, "total_pieces": 3,
                    "contents": [{"kit_id": "KIT001", "quantity": 2}], "is_template": true,
                }),
                json!({"dimensions": "1x1x1in", "weight": 1.0, "total_pieces": 1, "is_template": false}),
            ],
        )
        .await;
        seed(
            &store,
            KITS,
            vec![json!({"kit_id": "KIT001", "device_id": "DEV001", "return_box_dimensions": "12x8x6in"})],
        )
        .await;

        let rows = run(&store, &ParcelTemplates).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kit_details[0].kit_id, "KIT001");
    }

    #[tokio::test]
    async fn kit_device_details_follow_embedded_iot_descriptor() {
        let store = MemoryStore::new();
        seed(
            &store,
            KITS,
            vec![json!({
                "kit_id": "KIT001", "device_id": "DEV001", "return_box_dimensions": "12x8x6in",
                "iot_device": {"device_id": "IOT001"},
            })],
        )
        .await;
        seed(&store, DEVICES, vec![json!({"device_id": "DEV001"})]).await;
        seed(&store, IOT_DEVICES, vec![json!({"device_id": "IOT001", "exists": true})]).await;

        let rows = run(&store, &KitDeviceDetails { kit_id: "KIT001".into() }).await.unwrap();
        assert_eq!(rows[0].device_details[0].device_id, "DEV001");
        assert!(rows[0].iot_device_details[0].exists);
    }
}
