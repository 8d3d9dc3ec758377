//! Devices, IoT devices and the kits built from them.

use super::shared::RecordRepository;
use crate::error::{LogisticsError, LogisticsResult};
use crate::queries::{self, KitDeviceDetails, KitDeviceDetailsView};
use crate::records::{Device, IotDevice, Kit, SampleType};
use crate::store::{Document, DocumentStore, Filter};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeviceQuery {
    pub manufacturer: Option<String>,
    pub sample_type: Option<SampleType>,
}

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IotDeviceQuery {
    pub exists: Option<bool>,
}

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct KitQuery {
    pub site_id: Option<String>,
    pub is_template: Option<bool>,
}

#[derive(Clone)]
pub struct DeviceService {
    devices: RecordRepository<Device>,
}

impl DeviceService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            devices: RecordRepository::new(store),
        }
    }

    pub async fn list(&self, query: &DeviceQuery) -> LogisticsResult<Vec<Device>> {
        let filter = Filter::All
            .and_eq_opt("manufacturer", query.manufacturer.as_deref())
            .and_eq_opt("sample_type", query.sample_type.map(SampleType::as_str));
        self.devices.list(&filter).await
    }

    pub async fn create(&self, device: Device) -> LogisticsResult<Device> {
        self.devices.insert(&device).await
    }

    pub async fn retrieve(&self, device_id: &str) -> LogisticsResult<Device> {
        self.devices.retrieve(device_id).await
    }

    pub async fn update(&self, device_id: &str, partial: Document) -> LogisticsResult<Device> {
        self.devices.update(device_id, partial).await
    }
}

#[derive(Clone)]
pub struct IotDeviceService {
    devices: RecordRepository<IotDevice>,
}

impl IotDeviceService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            devices: RecordRepository::new(store),
        }
    }

    pub async fn list(&self, query: &IotDeviceQuery) -> LogisticsResult<Vec<IotDevice>> {
        let filter = Filter::All.and_eq_opt("exists", query.exists);
        self.devices.list(&filter).await
    }

    pub async fn create(&self, device: IotDevice) -> LogisticsResult<IotDevice> {
        self.devices.insert(&device).await
    }

    pub async fn retrieve(&self, device_id: &str) -> LogisticsResult<IotDevice> {
        self.devices.retrieve(device_id).await
    }

    pub async fn update(&self, device_id: &str, partial: Document) -> LogisticsResult<IotDevice> {
        self.devices.update(device_id, partial).await
    }
}

#[derive(Clone)]
pub struct KitService {
    kits: RecordRepository<Kit>,
    devices: RecordRepository<Device>,
    iot_devices: RecordRepository<IotDevice>,
}

impl KitService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            kits: RecordRepository::new(Arc::clone(&store)),
            devices: RecordRepository::new(Arc::clone(&store)),
            iot_devices: RecordRepository::new(store),
        }
    }

    pub async fn list(&self, query: &KitQuery) -> LogisticsResult<Vec<Kit>> {
        let filter = Filter::All
            .and_eq_opt("site_id", query.site_id.as_deref())
            .and_eq_opt("is_template", query.is_template);
        self.kits.list(&filter).await
    }

    /// Creates a kit.
    ///
    /// # Errors
    ///
    /// - `LogisticsError::Validation` if the return box dimensions are malformed.
    /// - `LogisticsError::Reference` if the device, or the embedded IoT device, does not
    ///   exist.
    pub async fn create(&self, kit: Kit) -> LogisticsResult<Kit> {
        RecordRepository::<Kit>::check_new(&kit)?;
        if !self.devices.exists(&kit.device_id).await? {
            tracing::warn!(kit_id = %kit.kit_id, device_id = %kit.device_id, "kit rejected: unknown device");
            return Err(LogisticsError::reference("Invalid device_id"));
        }
        if let Some(iot) = &kit.iot_device {
            if !self.iot_devices.exists(&iot.device_id).await? {
                tracing::warn!(kit_id = %kit.kit_id, iot_device_id = %iot.device_id, "kit rejected: unknown IoT device");
                return Err(LogisticsError::reference("Invalid IoT device_id"));
            }
        }
        self.kits.insert(&kit).await
    }

    pub async fn retrieve(&self, kit_id: &str) -> LogisticsResult<Kit> {
        self.kits.retrieve(kit_id).await
    }

    pub async fn update(&self, kit_id: &str, partial: Document) -> LogisticsResult<Kit> {
        self.kits.update(kit_id, partial).await
    }

    pub async fn device_details(&self, kit_id: &str) -> LogisticsResult<KitDeviceDetailsView> {
        let query = KitDeviceDetails {
            kit_id: kit_id.to_owned(),
        };
        queries::run(self.kits.store().as_ref(), &query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LogisticsError::not_found("Kit", kit_id))
    }
}
