use crate::error::{ApiJson, ApiQuery, ApiResult};
use crate::AppState;
use api_shared::ErrorRes;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use odyssey_core::queries::ParcelTemplateView;
use odyssey_core::records::Parcel;
use odyssey_core::repositories::parcels::ParcelQuery;

#[utoipa::path(
    get,
    path = "/parcels",
    tag = "parcels",
    params(ParcelQuery),
    responses((status = 200, description = "Parcels matching the filters", body = [Parcel]))
)]
pub(crate) async fn list_parcels(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ParcelQuery>,
) -> ApiResult<Json<Vec<Parcel>>> {
    Ok(Json(state.parcels.list(&query).await?))
}

#[utoipa::path(
    post,
    path = "/parcels",
    tag = "parcels",
    request_body = Parcel,
    responses(
        (status = 201, description = "Parcel created", body = Parcel),
        (status = 400, description = "Invalid dimensions, weight or piece count", body = ErrorRes)
    )
)]
pub(crate) async fn create_parcel(
    State(state): State<AppState>,
    ApiJson(parcel): ApiJson<Parcel>,
) -> ApiResult<(StatusCode, Json<Parcel>)> {
    Ok((StatusCode::CREATED, Json(state.parcels.create(parcel).await?)))
}

#[utoipa::path(
    get,
    path = "/parcels/{id}",
    tag = "parcels",
    params(("id" = String, Path, description = "Store identity")),
    responses(
        (status = 200, description = "The parcel", body = Parcel),
        (status = 404, description = "Unknown parcel", body = ErrorRes)
    )
)]
pub(crate) async fn retrieve_parcel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Parcel>> {
    Ok(Json(state.parcels.retrieve(&id).await?))
}

#[utoipa::path(
    get,
    path = "/parcels/templates",
    tag = "parcels",
    responses((status = 200, description = "Template parcels with their kits", body = [ParcelTemplateView]))
)]
pub(crate) async fn parcel_templates(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ParcelTemplateView>>> {
    Ok(Json(state.parcels.templates().await?))
}
