//! Shipment lifecycle.
//!
//! Shipments are created `PENDING` with an empty failure log whatever the client sends. After
//! that the status moves only through [`ShipmentService::update_status`] (any status may follow
//! any other) and failures only through [`ShipmentService::add_failure`], which appends.

use super::shared::RecordRepository;
use crate::constants::SHIPMENTS;
use crate::error::{LogisticsError, LogisticsResult};
use crate::queries::{
    self, FailureBreakdown, FailureBreakdownRow, ShipmentAnalytics, ShipmentAnalyticsView,
    ShipmentDetails, ShipmentDetailsView,
};
use crate::records::{Shipment, ShipmentStatus, Site};
use crate::store::{Document, DocumentStore, Filter, StoreError, Update};
use odyssey_types::NonEmptyText;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ShipmentQuery {
    pub trial_id: Option<String>,
    /// Shipments leaving from or arriving at this site.
    pub site_id: Option<String>,
    pub status: Option<ShipmentStatus>,
    /// Shipments whose failure log contains this descriptor.
    pub failure_mode: Option<String>,
}

impl ShipmentQuery {
    pub fn filter(&self) -> Filter {
        let mut filter = Filter::All
            .and_eq_opt("trial_id", self.trial_id.as_deref())
            .and_eq_opt("status", self.status.map(ShipmentStatus::as_str))
            .and_eq_opt("failures", self.failure_mode.as_deref());
        if let Some(site_id) = &self.site_id {
            filter = filter.and(Filter::Or(vec![
                Filter::eq("origin", site_id.as_str()),
                Filter::eq("destination", site_id.as_str()),
            ]));
        }
        filter
    }
}

#[derive(Clone)]
pub struct ShipmentService {
    shipments: RecordRepository<Shipment>,
    sites: RecordRepository<Site>,
}

impl ShipmentService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            shipments: RecordRepository::new(Arc::clone(&store)),
            sites: RecordRepository::new(store),
        }
    }

    pub async fn list(&self, query: &ShipmentQuery) -> LogisticsResult<Vec<Shipment>> {
        self.shipments.list(&query.filter()).await
    }

    /// Format and reference checks shared by single and bulk create. Returns the shipment
    /// with its lifecycle fields reset.
    async fn prepare(&self, mut shipment: Shipment) -> LogisticsResult<Shipment> {
        RecordRepository::<Shipment>::check_new(&shipment)?;
        for site_id in [&shipment.origin, &shipment.destination] {
            if !self.sites.exists(site_id).await? {
                tracing::warn!(
                    tracking_number = %shipment.tracking_number,
                    site_id = %site_id,
                    "shipment rejected: unknown site"
                );
                return Err(LogisticsError::reference(format!(
                    "Invalid origin or destination site: {site_id}"
                )));
            }
        }
        shipment.status = ShipmentStatus::Pending;
        shipment.failures.clear();
        Ok(shipment)
    }

    /// Creates a shipment in `PENDING` with an empty failure log.
    ///
    /// # Errors
    ///
    /// - `LogisticsError::Validation` for a malformed key or pickup after expected delivery.
    /// - `LogisticsError::Reference` if the origin or destination site does not exist.
    /// - `LogisticsError::Store` with `StoreError::DuplicateKey` if the tracking number exists.
    pub async fn create(&self, shipment: Shipment) -> LogisticsResult<Shipment> {
        let shipment = self.prepare(shipment).await?;
        self.shipments.insert(&shipment).await
    }

    /// Creates several shipments, or none.
    ///
    /// Every item is checked before anything is written: formats, site references, tracking
    /// numbers repeated within the batch and tracking numbers already stored.
    pub async fn bulk_create(&self, shipments: Vec<Shipment>) -> LogisticsResult<Vec<Shipment>> {
        if shipments.is_empty() {
            return Err(LogisticsError::validation("shipments must not be empty"));
        }

        let mut seen = HashSet::new();
        let mut prepared = Vec::with_capacity(shipments.len());
        for shipment in shipments {
            if !seen.insert(shipment.tracking_number.clone()) {
                return Err(LogisticsError::validation(format!(
                    "Duplicate tracking number in batch: {}",
                    shipment.tracking_number
                )));
            }
            prepared.push(self.prepare(shipment).await?);
        }

        let tracking: Vec<String> = seen.into_iter().collect();
        if let Some(existing) = self
            .shipments
            .list(&Filter::is_in("tracking_number", tracking.iter().map(String::as_str)))
            .await?
            .into_iter()
            .next()
        {
            return Err(StoreError::DuplicateKey {
                collection: SHIPMENTS.to_owned(),
                key: format!("tracking_number={}", existing.tracking_number),
            }
            .into());
        }

        self.shipments.insert_many(&prepared).await
    }

    pub async fn retrieve(&self, tracking_number: &str) -> LogisticsResult<Shipment> {
        self.shipments.retrieve(tracking_number).await
    }

    /// General field update. The failure log cannot be changed this way.
    pub async fn update(&self, tracking_number: &str, partial: Document) -> LogisticsResult<Shipment> {
        self.shipments.update(tracking_number, partial).await
    }

    /// Sets the shipment's status. Only `status` and `updated_at` change.
    ///
    /// # Errors
    ///
    /// - `LogisticsError::Validation` if `status` is not one of the four lifecycle values.
    /// - `LogisticsError::NotFound` if no shipment has this tracking number.
    pub async fn update_status(&self, tracking_number: &str, status: &str) -> LogisticsResult<Shipment> {
        let status: ShipmentStatus = status
            .parse()
            .map_err(|e: crate::records::UnknownStatus| LogisticsError::validation(e.to_string()))?;
        self.shipments
            .apply(tracking_number, Update::new().set("status", status.as_str()))
            .await?;
        tracing::info!(tracking_number, %status, "shipment status updated");
        self.shipments.retrieve(tracking_number).await
    }

    /// Appends one descriptor to the shipment's failure log. Status is untouched.
    ///
    /// # Errors
    ///
    /// - `LogisticsError::Validation` if `failure` is empty.
    /// - `LogisticsError::NotFound` if no shipment has this tracking number.
    pub async fn add_failure(&self, tracking_number: &str, failure: &str) -> LogisticsResult<Shipment> {
        NonEmptyText::new(failure)
            .map_err(|_| LogisticsError::validation("Failure mode is required"))?;
        self.shipments
            .apply(tracking_number, Update::new().push("failures", failure))
            .await?;
        tracing::info!(tracking_number, failure, "shipment failure recorded");
        self.shipments.retrieve(tracking_number).await
    }

    /// Failure descriptors across matching shipments, most frequent first.
    pub async fn failure_analytics(&self, query: &ShipmentQuery) -> LogisticsResult<Vec<FailureBreakdownRow>> {
        let breakdown = FailureBreakdown {
            pre_filter: query.filter(),
        };
        queries::run(self.shipments.store().as_ref(), &breakdown).await
    }

    pub async fn analytics(&self, query: &ShipmentQuery) -> LogisticsResult<ShipmentAnalyticsView> {
        let analytics = ShipmentAnalytics {
            pre_filter: query.filter(),
        };
        Ok(queries::run(self.shipments.store().as_ref(), &analytics)
            .await?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    pub async fn details(&self, tracking_number: &str) -> LogisticsResult<ShipmentDetailsView> {
        let query = ShipmentDetails {
            tracking_number: tracking_number.to_owned(),
        };
        queries::run(self.shipments.store().as_ref(), &query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LogisticsError::not_found("Shipment", tracking_number))
    }

    /// Shipments that notify `username` (an email address).
    pub async fn saved_shipment_information(&self, username: &str) -> LogisticsResult<Vec<Shipment>> {
        self.shipments
            .list(&Filter::eq("notification_emails", username))
            .await
    }
}
