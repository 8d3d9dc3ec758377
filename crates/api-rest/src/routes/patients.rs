use crate::error::{ApiJson, ApiQuery, ApiResult};
use crate::AppState;
use api_shared::ErrorRes;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use odyssey_core::records::Patient;
use odyssey_core::repositories::patients::PatientQuery;
use odyssey_core::store::Document;

#[utoipa::path(
    get,
    path = "/patients",
    tag = "patients",
    params(PatientQuery),
    responses((status = 200, description = "Patients matching the filters", body = [Patient]))
)]
pub(crate) async fn list_patients(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PatientQuery>,
) -> ApiResult<Json<Vec<Patient>>> {
    Ok(Json(state.patients.list(&query).await?))
}

#[utoipa::path(
    post,
    path = "/patients",
    tag = "patients",
    request_body = Patient,
    responses(
        (status = 201, description = "Patient created", body = Patient),
        (status = 400, description = "Invalid patient", body = ErrorRes),
        (status = 409, description = "Patient id already exists", body = ErrorRes)
    )
)]
pub(crate) async fn create_patient(
    State(state): State<AppState>,
    ApiJson(patient): ApiJson<Patient>,
) -> ApiResult<(StatusCode, Json<Patient>)> {
    Ok((StatusCode::CREATED, Json(state.patients.create(patient).await?)))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    tag = "patients",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "The patient", body = Patient),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    )
)]
pub(crate) async fn retrieve_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Patient>> {
    Ok(Json(state.patients.retrieve(&id).await?))
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    tag = "patients",
    params(("id" = String, Path, description = "Patient id")),
    request_body = Object,
    responses(
        (status = 200, description = "Patient updated", body = Patient),
        (status = 400, description = "Invalid fields", body = ErrorRes),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    )
)]
pub(crate) async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(partial): ApiJson<Document>,
) -> ApiResult<Json<Patient>> {
    Ok(Json(state.patients.update(&id, partial).await?))
}
