//! Shipments: CRUD, lifecycle transitions, joined details and analytics.

use crate::error::{ApiJson, ApiQuery, ApiResult};
use crate::AppState;
use api_shared::{AddFailureReq, BulkCreateShipmentsReq, ErrorRes, SavedShipmentsParams, UpdateStatusReq};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use odyssey_core::queries::{FailureBreakdownRow, ShipmentAnalyticsView, ShipmentDetailsView};
use odyssey_core::records::Shipment;
use odyssey_core::repositories::shipments::ShipmentQuery;
use odyssey_core::store::Document;

#[utoipa::path(
    get,
    path = "/shipments",
    tag = "shipments",
    params(ShipmentQuery),
    responses(
        (status = 200, description = "Shipments matching the filters", body = [Shipment]),
        (status = 400, description = "Unknown status filter", body = ErrorRes)
    )
)]
pub(crate) async fn list_shipments(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ShipmentQuery>,
) -> ApiResult<Json<Vec<Shipment>>> {
    Ok(Json(state.shipments.list(&query).await?))
}

#[utoipa::path(
    post,
    path = "/shipments",
    tag = "shipments",
    request_body = Shipment,
    responses(
        (status = 201, description = "Shipment created as PENDING", body = Shipment),
        (status = 400, description = "Unknown site or inconsistent dates", body = ErrorRes),
        (status = 409, description = "Tracking number already exists", body = ErrorRes)
    )
)]
/// Creates a shipment between two existing sites.
///
/// Any `status` or `failures` in the body are ignored; new shipments start `PENDING` with an
/// empty failure log.
pub(crate) async fn create_shipment(
    State(state): State<AppState>,
    ApiJson(shipment): ApiJson<Shipment>,
) -> ApiResult<(StatusCode, Json<Shipment>)> {
    Ok((StatusCode::CREATED, Json(state.shipments.create(shipment).await?)))
}

#[utoipa::path(
    post,
    path = "/shipments/save_created_shipment",
    tag = "shipments",
    request_body = Shipment,
    responses(
        (status = 201, description = "Shipment created as PENDING", body = Shipment),
        (status = 400, description = "Unknown site or inconsistent dates", body = ErrorRes),
        (status = 409, description = "Tracking number already exists", body = ErrorRes)
    )
)]
/// Alias of `POST /shipments` kept for clients of the shipment builder.
pub(crate) async fn save_created_shipment(
    state: State<AppState>,
    body: ApiJson<Shipment>,
) -> ApiResult<(StatusCode, Json<Shipment>)> {
    create_shipment(state, body).await
}

#[utoipa::path(
    post,
    path = "/shipments/bulk_create",
    tag = "shipments",
    request_body = BulkCreateShipmentsReq,
    responses(
        (status = 201, description = "All shipments created", body = [Shipment]),
        (status = 400, description = "An item failed validation; nothing was created", body = ErrorRes),
        (status = 409, description = "A tracking number already exists; nothing was created", body = ErrorRes)
    )
)]
/// Creates several shipments, or none of them.
pub(crate) async fn bulk_create_shipments(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<BulkCreateShipmentsReq>,
) -> ApiResult<(StatusCode, Json<Vec<Shipment>>)> {
    Ok((
        StatusCode::CREATED,
        Json(state.shipments.bulk_create(req.shipments).await?),
    ))
}

#[utoipa::path(
    get,
    path = "/shipments/{tracking}",
    tag = "shipments",
    params(("tracking" = String, Path, description = "Tracking number")),
    responses(
        (status = 200, description = "The shipment", body = Shipment),
        (status = 404, description = "Unknown tracking number", body = ErrorRes)
    )
)]
pub(crate) async fn retrieve_shipment(
    State(state): State<AppState>,
    Path(tracking): Path<String>,
) -> ApiResult<Json<Shipment>> {
    Ok(Json(state.shipments.retrieve(&tracking).await?))
}

#[utoipa::path(
    put,
    path = "/shipments/{tracking}",
    tag = "shipments",
    params(("tracking" = String, Path, description = "Tracking number")),
    request_body = Object,
    responses(
        (status = 200, description = "Shipment updated", body = Shipment),
        (status = 400, description = "Invalid or protected fields", body = ErrorRes),
        (status = 404, description = "Unknown tracking number", body = ErrorRes)
    )
)]
pub(crate) async fn update_shipment(
    State(state): State<AppState>,
    Path(tracking): Path<String>,
    ApiJson(partial): ApiJson<Document>,
) -> ApiResult<Json<Shipment>> {
    Ok(Json(state.shipments.update(&tracking, partial).await?))
}

#[utoipa::path(
    get,
    path = "/shipments/{tracking}/details",
    tag = "shipments",
    params(("tracking" = String, Path, description = "Tracking number")),
    responses(
        (status = 200, description = "Shipment with trial, sites and kit", body = ShipmentDetailsView),
        (status = 404, description = "Unknown tracking number", body = ErrorRes)
    )
)]
pub(crate) async fn shipment_details(
    State(state): State<AppState>,
    Path(tracking): Path<String>,
) -> ApiResult<Json<ShipmentDetailsView>> {
    Ok(Json(state.shipments.details(&tracking).await?))
}

#[utoipa::path(
    post,
    path = "/shipments/{tracking}/update_status",
    tag = "shipments",
    params(("tracking" = String, Path, description = "Tracking number")),
    request_body = UpdateStatusReq,
    responses(
        (status = 200, description = "Status changed", body = Shipment),
        (status = 400, description = "Not a shipment status", body = ErrorRes),
        (status = 404, description = "Unknown tracking number", body = ErrorRes)
    )
)]
pub(crate) async fn update_status(
    State(state): State<AppState>,
    Path(tracking): Path<String>,
    ApiJson(req): ApiJson<UpdateStatusReq>,
) -> ApiResult<Json<Shipment>> {
    Ok(Json(
        state.shipments.update_status(&tracking, &req.status).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/shipments/{tracking}/add_failure",
    tag = "shipments",
    params(("tracking" = String, Path, description = "Tracking number")),
    request_body = AddFailureReq,
    responses(
        (status = 200, description = "Failure appended", body = Shipment),
        (status = 400, description = "Empty failure descriptor", body = ErrorRes),
        (status = 404, description = "Unknown tracking number", body = ErrorRes)
    )
)]
pub(crate) async fn add_failure(
    State(state): State<AppState>,
    Path(tracking): Path<String>,
    ApiJson(req): ApiJson<AddFailureReq>,
) -> ApiResult<Json<Shipment>> {
    Ok(Json(
        state.shipments.add_failure(&tracking, &req.failure).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/shipments/failure_analytics",
    tag = "shipments",
    params(ShipmentQuery),
    responses((status = 200, description = "Failure descriptors by frequency", body = [FailureBreakdownRow]))
)]
pub(crate) async fn failure_analytics(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ShipmentQuery>,
) -> ApiResult<Json<Vec<FailureBreakdownRow>>> {
    Ok(Json(state.shipments.failure_analytics(&query).await?))
}

#[utoipa::path(
    get,
    path = "/shipments/analytics",
    tag = "shipments",
    params(ShipmentQuery),
    responses((status = 200, description = "Status summary, failures and monthly trend", body = ShipmentAnalyticsView))
)]
pub(crate) async fn shipment_analytics(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ShipmentQuery>,
) -> ApiResult<Json<ShipmentAnalyticsView>> {
    Ok(Json(state.shipments.analytics(&query).await?))
}

#[utoipa::path(
    get,
    path = "/shipments/saved_shipment_information",
    tag = "shipments",
    params(SavedShipmentsParams),
    responses((status = 200, description = "Shipments notifying this user", body = [Shipment]))
)]
pub(crate) async fn saved_shipment_information(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SavedShipmentsParams>,
) -> ApiResult<Json<Vec<Shipment>>> {
    Ok(Json(
        state
            .shipments
            .saved_shipment_information(&params.username)
            .await?,
    ))
}
