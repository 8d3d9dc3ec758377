use super::shared::RecordRepository;
use crate::error::LogisticsResult;
use crate::records::FailureReport;
use crate::store::{DocumentStore, Filter};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FailureReportQuery {
    pub reason: Option<String>,
}

/// The standalone failure log in the `failures` collection.
#[derive(Clone)]
pub struct FailureReportService {
    reports: RecordRepository<FailureReport>,
}

impl FailureReportService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            reports: RecordRepository::new(store),
        }
    }

    pub async fn list(&self, query: &FailureReportQuery) -> LogisticsResult<Vec<FailureReport>> {
        let filter = Filter::All.and_eq_opt("reason", query.reason.as_deref());
        self.reports.list(&filter).await
    }

    pub async fn create(&self, report: FailureReport) -> LogisticsResult<FailureReport> {
        self.reports.insert(&report).await
    }

    pub async fn retrieve(&self, failure_id: &str) -> LogisticsResult<FailureReport> {
        self.reports.retrieve(failure_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn reports_filter_by_reason() {
        let svc = FailureReportService::new(Arc::new(MemoryStore::new()));
        for (id, reason) in [("F1", "temperature excursion"), ("F2", "lost")] {
            svc.create(
                serde_json::from_value(json!({
                    "failure_id": id,
                    "reason": reason,
                    "aggregated_shipment_locator": "SHIP001",
                }))
                .unwrap(),
            )
            .await
            .unwrap();
        }
        let query = FailureReportQuery {
            reason: Some("lost".into()),
        };
        let found = svc.list(&query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].failure_id, "F2");
        assert_eq!(svc.retrieve("F1").await.unwrap().reason, "temperature excursion");
    }
}
