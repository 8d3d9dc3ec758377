use super::shared::RecordRepository;
use crate::error::LogisticsResult;
use crate::queries::{self, ParcelTemplateView, ParcelTemplates};
use crate::records::Parcel;
use crate::store::{DocumentStore, Filter};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ParcelQuery {
    pub shipment_id: Option<String>,
    pub is_template: Option<bool>,
}

#[derive(Clone)]
pub struct ParcelService {
    parcels: RecordRepository<Parcel>,
}

impl ParcelService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            parcels: RecordRepository::new(store),
        }
    }

    pub async fn list(&self, query: &ParcelQuery) -> LogisticsResult<Vec<Parcel>> {
        let filter = Filter::All
            .and_eq_opt("shipment_id", query.shipment_id.as_deref())
            .and_eq_opt("is_template", query.is_template);
        self.parcels.list(&filter).await
    }

    /// Creates a parcel after checking dimensions, weight and piece count.
    pub async fn create(&self, parcel: Parcel) -> LogisticsResult<Parcel> {
        self.parcels.insert(&parcel).await
    }

    pub async fn retrieve(&self, id: &str) -> LogisticsResult<Parcel> {
        self.parcels.retrieve(id).await
    }

    /// Template parcels joined with the kits they contain.
    pub async fn templates(&self) -> LogisticsResult<Vec<ParcelTemplateView>> {
        queries::run(self.parcels.store().as_ref(), &ParcelTemplates).await
    }
}
