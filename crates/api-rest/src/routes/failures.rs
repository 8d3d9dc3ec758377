use crate::error::{ApiJson, ApiQuery, ApiResult};
use crate::AppState;
use api_shared::ErrorRes;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use odyssey_core::records::FailureReport;
use odyssey_core::repositories::failures::FailureReportQuery;

#[utoipa::path(
    get,
    path = "/failures",
    tag = "failures",
    params(FailureReportQuery),
    responses((status = 200, description = "Failure reports", body = [FailureReport]))
)]
pub(crate) async fn list_failures(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<FailureReportQuery>,
) -> ApiResult<Json<Vec<FailureReport>>> {
    Ok(Json(state.failures.list(&query).await?))
}

#[utoipa::path(
    post,
    path = "/failures",
    tag = "failures",
    request_body = FailureReport,
    responses(
        (status = 201, description = "Failure report created", body = FailureReport),
        (status = 409, description = "Failure id already exists", body = ErrorRes)
    )
)]
pub(crate) async fn create_failure(
    State(state): State<AppState>,
    ApiJson(report): ApiJson<FailureReport>,
) -> ApiResult<(StatusCode, Json<FailureReport>)> {
    Ok((StatusCode::CREATED, Json(state.failures.create(report).await?)))
}

#[utoipa::path(
    get,
    path = "/failures/{id}",
    tag = "failures",
    params(("id" = String, Path, description = "Failure id")),
    responses(
        (status = 200, description = "The failure report", body = FailureReport),
        (status = 404, description = "Unknown failure report", body = ErrorRes)
    )
)]
pub(crate) async fn retrieve_failure(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<FailureReport>> {
    Ok(Json(state.failures.retrieve(&id).await?))
}
