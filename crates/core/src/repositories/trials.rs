//! Trials and their site/patient relationships.
//!
//! Links are one-directional: adding a site to a trial updates the trial's
//! `associated_sites` only. Site membership in a trial (`associated_trials`) is maintained on
//! the site document.

use super::shared::RecordRepository;
use crate::error::{LogisticsError, LogisticsResult};
use crate::queries::{self, TrialRollup, TrialRollupView};
use crate::records::{Patient, Site, Trial};
use crate::store::{Document, DocumentStore, Filter, Update};
use std::sync::Arc;

/// Requested changes to a trial's site and patient lists.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelationshipChanges {
    pub add_sites: Vec<String>,
    pub remove_sites: Vec<String>,
    pub add_patients: Vec<String>,
    pub remove_patients: Vec<String>,
}

#[derive(Clone)]
pub struct TrialService {
    trials: RecordRepository<Trial>,
    sites: RecordRepository<Site>,
    patients: RecordRepository<Patient>,
}

impl TrialService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            trials: RecordRepository::new(Arc::clone(&store)),
            sites: RecordRepository::new(Arc::clone(&store)),
            patients: RecordRepository::new(store),
        }
    }

    pub async fn list(&self) -> LogisticsResult<Vec<Trial>> {
        self.trials.list(&Filter::All).await
    }

    pub async fn create(&self, trial: Trial) -> LogisticsResult<Trial> {
        self.trials.insert(&trial).await
    }

    pub async fn retrieve(&self, trial_id: &str) -> LogisticsResult<Trial> {
        self.trials.retrieve(trial_id).await
    }

    pub async fn update(&self, trial_id: &str, partial: Document) -> LogisticsResult<Trial> {
        self.trials.update(trial_id, partial).await
    }

    /// Sites that list `trial_id` in their `associated_trials`.
    pub async fn associated_sites(&self, trial_id: &str) -> LogisticsResult<Vec<Site>> {
        self.sites
            .list(&Filter::eq("associated_trials", trial_id))
            .await
    }

    /// Adds existing sites to the trial's `associated_sites`, skipping ones already present.
    ///
    /// # Errors
    ///
    /// - `LogisticsError::Validation` if `site_ids` is empty.
    /// - `LogisticsError::Reference` if any site id does not exist; nothing is written.
    /// - `LogisticsError::NotFound` if the trial does not exist.
    pub async fn bulk_add_sites(&self, trial_id: &str, site_ids: Vec<String>) -> LogisticsResult<Trial> {
        if site_ids.is_empty() {
            return Err(LogisticsError::validation("site_ids must not be empty"));
        }
        if !self.sites.all_exist("site_id", &site_ids).await? {
            tracing::warn!(trial_id, ?site_ids, "bulk_add_sites rejected: unknown site");
            return Err(LogisticsError::reference("One or more site IDs are invalid"));
        }

        self.trials
            .apply(trial_id, Update::new().add_to_set("associated_sites", site_ids))
            .await?;
        tracing::info!(trial_id, "sites added to trial");
        self.trials.retrieve(trial_id).await
    }

    /// Adds and removes site and patient links in one call.
    ///
    /// Added ids must exist. Additions are applied before removals, so an id that appears in
    /// both lists ends up removed.
    ///
    /// # Errors
    ///
    /// - `LogisticsError::Reference` if an added site or patient does not exist.
    /// - `LogisticsError::NotFound` if the trial does not exist.
    pub async fn manage_relationships(
        &self,
        trial_id: &str,
        changes: RelationshipChanges,
    ) -> LogisticsResult<Trial> {
        if !self.trials.exists(trial_id).await? {
            return Err(LogisticsError::not_found("Trial", trial_id));
        }
        if !self.sites.all_exist("site_id", &changes.add_sites).await? {
            return Err(LogisticsError::reference("One or more site IDs are invalid"));
        }
        if !self
            .patients
            .all_exist("patient_id", &changes.add_patients)
            .await?
        {
            return Err(LogisticsError::reference("One or more patient IDs are invalid"));
        }

        let mut adds = Update::new();
        if !changes.add_sites.is_empty() {
            adds = adds.add_to_set("associated_sites", changes.add_sites);
        }
        if !changes.add_patients.is_empty() {
            adds = adds.add_to_set("associated_patients", changes.add_patients);
        }
        let mut removes = Update::new();
        if !changes.remove_sites.is_empty() {
            removes = removes.pull_all("associated_sites", changes.remove_sites);
        }
        if !changes.remove_patients.is_empty() {
            removes = removes.pull_all("associated_patients", changes.remove_patients);
        }

        // MongoDB rejects $addToSet and $pullAll on the same path in one update.
        for update in [adds, removes] {
            if !update.is_empty() {
                self.trials.apply(trial_id, update).await?;
            }
        }
        tracing::info!(trial_id, "trial relationships updated");
        self.trials.retrieve(trial_id).await
    }

    /// The trial joined with its sites, patients and template kits.
    pub async fn rollup(&self, trial_id: &str) -> LogisticsResult<TrialRollupView> {
        let query = TrialRollup {
            trial_id: trial_id.to_owned(),
        };
        queries::run(self.trials.store().as_ref(), &query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LogisticsError::not_found("Trial", trial_id))
    }
}
