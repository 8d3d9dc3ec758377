use super::shared::RecordRepository;
use crate::error::LogisticsResult;
use crate::records::Patient;
use crate::store::{Document, DocumentStore, Filter};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PatientQuery {
    pub trial_id: Option<String>,
    pub site_id: Option<String>,
}

#[derive(Clone)]
pub struct PatientService {
    patients: RecordRepository<Patient>,
}

impl PatientService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            patients: RecordRepository::new(store),
        }
    }

    pub async fn list(&self, query: &PatientQuery) -> LogisticsResult<Vec<Patient>> {
        let filter = Filter::All
            .and_eq_opt("associated_trials", query.trial_id.as_deref())
            .and_eq_opt("associated_sites", query.site_id.as_deref());
        self.patients.list(&filter).await
    }

    pub async fn create(&self, patient: Patient) -> LogisticsResult<Patient> {
        self.patients.insert(&patient).await
    }

    pub async fn retrieve(&self, patient_id: &str) -> LogisticsResult<Patient> {
        self.patients.retrieve(patient_id).await
    }

    pub async fn update(&self, patient_id: &str, partial: Document) -> LogisticsResult<Patient> {
        self.patients.update(patient_id, partial).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn list_combines_trial_and_site_filters() {
        let svc = PatientService::new(Arc::new(MemoryStore::new()));
        for (id, trials, sites) in [
            ("PAT001", vec!["TRIAL001"], vec!["SITE001"]),
            ("PAT002", vec!["TRIAL001"], vec!["SITE002"]),
            ("PAT003", vec!["TRIAL002"], vec!["SITE001"]),
        ] {
            svc.create(
                serde_json::from_value(json!({
                    "patient_id": id,
                    "associated_trials": trials,
                    "associated_sites": sites,
                    "scheduled_collection_dates": ["2024-05-01T09:00:00Z"],
                }))
                .unwrap(),
            )
            .await
            .unwrap();
        }

        let query = PatientQuery {
            trial_id: Some("TRIAL001".into()),
            site_id: Some("SITE001".into()),
        };
        let found = svc.list(&query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].patient_id, "PAT001");
        assert_eq!(found[0].scheduled_collection_dates.len(), 1);
    }
}
