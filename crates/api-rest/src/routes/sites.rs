use crate::error::{ApiJson, ApiQuery, ApiResult};
use crate::AppState;
use api_shared::{AdjustInventoryReq, ErrorRes};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use odyssey_core::queries::SiteRollupView;
use odyssey_core::records::Site;
use odyssey_core::repositories::sites::{KitInventoryStatus, SiteQuery};
use odyssey_core::store::Document;

#[utoipa::path(
    get,
    path = "/sites",
    tag = "sites",
    params(SiteQuery),
    responses((status = 200, description = "Sites, optionally limited to one trial", body = [Site]))
)]
pub(crate) async fn list_sites(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SiteQuery>,
) -> ApiResult<Json<Vec<Site>>> {
    Ok(Json(state.sites.list(&query).await?))
}

#[utoipa::path(
    post,
    path = "/sites",
    tag = "sites",
    request_body = Site,
    responses(
        (status = 201, description = "Site created", body = Site),
        (status = 400, description = "Invalid site", body = ErrorRes),
        (status = 409, description = "Site id already exists", body = ErrorRes)
    )
)]
pub(crate) async fn create_site(
    State(state): State<AppState>,
    ApiJson(site): ApiJson<Site>,
) -> ApiResult<(StatusCode, Json<Site>)> {
    Ok((StatusCode::CREATED, Json(state.sites.create(site).await?)))
}

#[utoipa::path(
    get,
    path = "/sites/{id}",
    tag = "sites",
    params(("id" = String, Path, description = "Site id")),
    responses(
        (status = 200, description = "The site", body = Site),
        (status = 404, description = "Unknown site", body = ErrorRes)
    )
)]
pub(crate) async fn retrieve_site(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Site>> {
    Ok(Json(state.sites.retrieve(&id).await?))
}

#[utoipa::path(
    put,
    path = "/sites/{id}",
    tag = "sites",
    params(("id" = String, Path, description = "Site id")),
    request_body = Object,
    responses(
        (status = 200, description = "Site updated", body = Site),
        (status = 400, description = "Invalid fields", body = ErrorRes),
        (status = 404, description = "Unknown site", body = ErrorRes)
    )
)]
pub(crate) async fn update_site(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(partial): ApiJson<Document>,
) -> ApiResult<Json<Site>> {
    Ok(Json(state.sites.update(&id, partial).await?))
}

#[utoipa::path(
    get,
    path = "/sites/{id}/kit_inventory",
    tag = "sites",
    params(("id" = String, Path, description = "Site id")),
    responses(
        (status = 200, description = "Kit stock and reorder flag", body = KitInventoryStatus),
        (status = 404, description = "Unknown site", body = ErrorRes)
    )
)]
pub(crate) async fn kit_inventory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<KitInventoryStatus>> {
    Ok(Json(state.sites.kit_inventory(&id).await?))
}

#[utoipa::path(
    post,
    path = "/sites/{id}/adjust_inventory",
    tag = "sites",
    params(("id" = String, Path, description = "Site id")),
    request_body = AdjustInventoryReq,
    responses(
        (status = 200, description = "Adjusted kit stock", body = KitInventoryStatus),
        (status = 400, description = "Stock would drop below zero", body = ErrorRes),
        (status = 404, description = "Unknown site", body = ErrorRes)
    )
)]
pub(crate) async fn adjust_inventory(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<AdjustInventoryReq>,
) -> ApiResult<Json<KitInventoryStatus>> {
    Ok(Json(state.sites.adjust_kit_inventory(&id, req.delta).await?))
}

#[utoipa::path(
    get,
    path = "/sites/{id}/rollup",
    tag = "sites",
    params(("id" = String, Path, description = "Site id")),
    responses(
        (status = 200, description = "Site with its patients and kits", body = SiteRollupView),
        (status = 404, description = "Unknown site", body = ErrorRes)
    )
)]
pub(crate) async fn site_rollup(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SiteRollupView>> {
    Ok(Json(state.sites.rollup(&id).await?))
}
