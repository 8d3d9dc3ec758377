use crate::error::{ApiJson, ApiResult};
use crate::AppState;
use api_shared::{BulkAddSitesReq, ErrorRes, ManageRelationshipsReq};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use odyssey_core::queries::TrialRollupView;
use odyssey_core::records::{Site, Trial};
use odyssey_core::store::Document;

#[utoipa::path(
    get,
    path = "/trials",
    tag = "trials",
    responses((status = 200, description = "All trials", body = [Trial]))
)]
pub(crate) async fn list_trials(State(state): State<AppState>) -> ApiResult<Json<Vec<Trial>>> {
    Ok(Json(state.trials.list().await?))
}

#[utoipa::path(
    post,
    path = "/trials",
    tag = "trials",
    request_body = Trial,
    responses(
        (status = 201, description = "Trial created", body = Trial),
        (status = 400, description = "Invalid trial", body = ErrorRes),
        (status = 409, description = "Trial id already exists", body = ErrorRes)
    )
)]
pub(crate) async fn create_trial(
    State(state): State<AppState>,
    ApiJson(trial): ApiJson<Trial>,
) -> ApiResult<(StatusCode, Json<Trial>)> {
    Ok((StatusCode::CREATED, Json(state.trials.create(trial).await?)))
}

#[utoipa::path(
    get,
    path = "/trials/{id}",
    tag = "trials",
    params(("id" = String, Path, description = "Trial id")),
    responses(
        (status = 200, description = "The trial", body = Trial),
        (status = 404, description = "Unknown trial", body = ErrorRes)
    )
)]
pub(crate) async fn retrieve_trial(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Trial>> {
    Ok(Json(state.trials.retrieve(&id).await?))
}

#[utoipa::path(
    put,
    path = "/trials/{id}",
    tag = "trials",
    params(("id" = String, Path, description = "Trial id")),
    request_body = Object,
    responses(
        (status = 200, description = "Trial updated", body = Trial),
        (status = 400, description = "Invalid fields", body = ErrorRes),
        (status = 404, description = "Unknown trial", body = ErrorRes)
    )
)]
/// Overwrites the given top-level fields of a trial.
pub(crate) async fn update_trial(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(partial): ApiJson<Document>,
) -> ApiResult<Json<Trial>> {
    Ok(Json(state.trials.update(&id, partial).await?))
}

#[utoipa::path(
    get,
    path = "/trials/{id}/associated_sites",
    tag = "trials",
    params(("id" = String, Path, description = "Trial id")),
    responses((status = 200, description = "Sites participating in the trial", body = [Site]))
)]
pub(crate) async fn associated_sites(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Site>>> {
    Ok(Json(state.trials.associated_sites(&id).await?))
}

#[utoipa::path(
    post,
    path = "/trials/{id}/bulk_add_sites",
    tag = "trials",
    params(("id" = String, Path, description = "Trial id")),
    request_body = BulkAddSitesReq,
    responses(
        (status = 200, description = "Sites added", body = Trial),
        (status = 400, description = "Empty list or unknown site", body = ErrorRes),
        (status = 404, description = "Unknown trial", body = ErrorRes)
    )
)]
/// Adds several existing sites to a trial.
///
/// # Errors
/// Returns `400 Bad Request` if `site_ids` is empty or names a site that does not exist; no
/// site is added in that case.
pub(crate) async fn bulk_add_sites(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<BulkAddSitesReq>,
) -> ApiResult<Json<Trial>> {
    Ok(Json(state.trials.bulk_add_sites(&id, req.site_ids).await?))
}

#[utoipa::path(
    post,
    path = "/trials/{id}/manage_relationships",
    tag = "trials",
    params(("id" = String, Path, description = "Trial id")),
    request_body = ManageRelationshipsReq,
    responses(
        (status = 200, description = "Relationships updated", body = Trial),
        (status = 400, description = "Unknown site or patient", body = ErrorRes),
        (status = 404, description = "Unknown trial", body = ErrorRes)
    )
)]
/// Adds and removes site and patient links. Additions are applied first.
pub(crate) async fn manage_relationships(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ManageRelationshipsReq>,
) -> ApiResult<Json<Trial>> {
    Ok(Json(
        state.trials.manage_relationships(&id, req.into()).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/trials/{id}/rollup",
    tag = "trials",
    params(("id" = String, Path, description = "Trial id")),
    responses(
        (status = 200, description = "Trial with sites, patients and kit templates", body = TrialRollupView),
        (status = 404, description = "Unknown trial", body = ErrorRes)
    )
)]
pub(crate) async fn trial_rollup(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TrialRollupView>> {
    Ok(Json(state.trials.rollup(&id).await?))
}
