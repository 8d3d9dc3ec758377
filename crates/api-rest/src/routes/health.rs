use crate::AppState;
use api_shared::{HealthRes, HealthService};
use axum::{extract::State, http::StatusCode, Json};

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service and document store are up", body = HealthRes),
        (status = 503, description = "Document store unavailable", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Pings the document store. Used by monitoring and load balancer health checks, so it does
/// not require a bearer token.
pub(crate) async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthRes>) {
    let res = HealthService::check_health(state.store.as_ref()).await;
    let status = if res.ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(res))
}
