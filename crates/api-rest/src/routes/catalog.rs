//! Devices, IoT devices and kits.

use crate::error::{ApiJson, ApiQuery, ApiResult};
use crate::AppState;
use api_shared::ErrorRes;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use odyssey_core::queries::KitDeviceDetailsView;
use odyssey_core::records::{Device, IotDevice, Kit};
use odyssey_core::repositories::catalog::{DeviceQuery, IotDeviceQuery, KitQuery};
use odyssey_core::store::Document;

// ============================================================================
// Devices
// ============================================================================

#[utoipa::path(
    get,
    path = "/devices",
    tag = "catalog",
    params(DeviceQuery),
    responses((status = 200, description = "Devices matching the filters", body = [Device]))
)]
pub(crate) async fn list_devices(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DeviceQuery>,
) -> ApiResult<Json<Vec<Device>>> {
    Ok(Json(state.devices.list(&query).await?))
}

#[utoipa::path(
    post,
    path = "/devices",
    tag = "catalog",
    request_body = Device,
    responses(
        (status = 201, description = "Device created", body = Device),
        (status = 400, description = "Invalid device", body = ErrorRes),
        (status = 409, description = "Device id already exists", body = ErrorRes)
    )
)]
pub(crate) async fn create_device(
    State(state): State<AppState>,
    ApiJson(device): ApiJson<Device>,
) -> ApiResult<(StatusCode, Json<Device>)> {
    Ok((StatusCode::CREATED, Json(state.devices.create(device).await?)))
}

#[utoipa::path(
    get,
    path = "/devices/{id}",
    tag = "catalog",
    params(("id" = String, Path, description = "Device id")),
    responses(
        (status = 200, description = "The device", body = Device),
        (status = 404, description = "Unknown device", body = ErrorRes)
    )
)]
pub(crate) async fn retrieve_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Device>> {
    Ok(Json(state.devices.retrieve(&id).await?))
}

#[utoipa::path(
    put,
    path = "/devices/{id}",
    tag = "catalog",
    params(("id" = String, Path, description = "Device id")),
    request_body = Object,
    responses(
        (status = 200, description = "Device updated", body = Device),
        (status = 400, description = "Invalid fields", body = ErrorRes),
        (status = 404, description = "Unknown device", body = ErrorRes)
    )
)]
pub(crate) async fn update_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(partial): ApiJson<Document>,
) -> ApiResult<Json<Device>> {
    Ok(Json(state.devices.update(&id, partial).await?))
}

// ============================================================================
// IoT devices
// ============================================================================

#[utoipa::path(
    get,
    path = "/iot-devices",
    tag = "catalog",
    params(IotDeviceQuery),
    responses((status = 200, description = "IoT devices", body = [IotDevice]))
)]
pub(crate) async fn list_iot_devices(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IotDeviceQuery>,
) -> ApiResult<Json<Vec<IotDevice>>> {
    Ok(Json(state.iot_devices.list(&query).await?))
}

#[utoipa::path(
    post,
    path = "/iot-devices",
    tag = "catalog",
    request_body = IotDevice,
    responses(
        (status = 201, description = "IoT device created", body = IotDevice),
        (status = 409, description = "Device id already exists", body = ErrorRes)
    )
)]
pub(crate) async fn create_iot_device(
    State(state): State<AppState>,
    ApiJson(device): ApiJson<IotDevice>,
) -> ApiResult<(StatusCode, Json<IotDevice>)> {
    Ok((StatusCode::CREATED, Json(state.iot_devices.create(device).await?)))
}

#[utoipa::path(
    get,
    path = "/iot-devices/{id}",
    tag = "catalog",
    params(("id" = String, Path, description = "IoT device id")),
    responses(
        (status = 200, description = "The IoT device", body = IotDevice),
        (status = 404, description = "Unknown IoT device", body = ErrorRes)
    )
)]
pub(crate) async fn retrieve_iot_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<IotDevice>> {
    Ok(Json(state.iot_devices.retrieve(&id).await?))
}

#[utoipa::path(
    put,
    path = "/iot-devices/{id}",
    tag = "catalog",
    params(("id" = String, Path, description = "IoT device id")),
    request_body = Object,
    responses(
        (status = 200, description = "IoT device updated", body = IotDevice),
        (status = 400, description = "Invalid fields", body = ErrorRes),
        (status = 404, description = "Unknown IoT device", body = ErrorRes)
    )
)]
pub(crate) async fn update_iot_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(partial): ApiJson<Document>,
) -> ApiResult<Json<IotDevice>> {
    Ok(Json(state.iot_devices.update(&id, partial).await?))
}

// ============================================================================
// Kits
// ============================================================================

#[utoipa::path(
    get,
    path = "/kits",
    tag = "catalog",
    params(KitQuery),
    responses((status = 200, description = "Kits matching the filters", body = [Kit]))
)]
pub(crate) async fn list_kits(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<KitQuery>,
) -> ApiResult<Json<Vec<Kit>>> {
    Ok(Json(state.kits.list(&query).await?))
}

#[utoipa::path(
    post,
    path = "/kits",
    tag = "catalog",
    request_body = Kit,
    responses(
        (status = 201, description = "Kit created", body = Kit),
        (status = 400, description = "Invalid box dimensions or unknown device", body = ErrorRes),
        (status = 409, description = "Kit id already exists", body = ErrorRes)
    )
)]
/// Creates a kit from an existing device and, optionally, an existing IoT device.
pub(crate) async fn create_kit(
    State(state): State<AppState>,
    ApiJson(kit): ApiJson<Kit>,
) -> ApiResult<(StatusCode, Json<Kit>)> {
    Ok((StatusCode::CREATED, Json(state.kits.create(kit).await?)))
}

#[utoipa::path(
    get,
    path = "/kits/{id}",
    tag = "catalog",
    params(("id" = String, Path, description = "Kit id")),
    responses(
        (status = 200, description = "The kit", body = Kit),
        (status = 404, description = "Unknown kit", body = ErrorRes)
    )
)]
pub(crate) async fn retrieve_kit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Kit>> {
    Ok(Json(state.kits.retrieve(&id).await?))
}

#[utoipa::path(
    put,
    path = "/kits/{id}",
    tag = "catalog",
    params(("id" = String, Path, description = "Kit id")),
    request_body = Object,
    responses(
        (status = 200, description = "Kit updated", body = Kit),
        (status = 400, description = "Invalid fields", body = ErrorRes),
        (status = 404, description = "Unknown kit", body = ErrorRes)
    )
)]
pub(crate) async fn update_kit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(partial): ApiJson<Document>,
) -> ApiResult<Json<Kit>> {
    Ok(Json(state.kits.update(&id, partial).await?))
}

#[utoipa::path(
    get,
    path = "/kits/{id}/device_details",
    tag = "catalog",
    params(("id" = String, Path, description = "Kit id")),
    responses(
        (status = 200, description = "Kit with its device and IoT device", body = KitDeviceDetailsView),
        (status = 404, description = "Unknown kit", body = ErrorRes)
    )
)]
pub(crate) async fn kit_device_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<KitDeviceDetailsView>> {
    Ok(Json(state.kits.device_details(&id).await?))
}
