//! Addresses and contact persons, addressed by store identity.

use crate::error::{ApiJson, ApiQuery, ApiResult};
use crate::AppState;
use api_shared::ErrorRes;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use odyssey_core::records::{Address, ContactPerson};
use odyssey_core::repositories::contacts::ContactPersonQuery;

#[utoipa::path(
    get,
    path = "/addresses",
    tag = "contacts",
    responses((status = 200, description = "All addresses", body = [Address]))
)]
pub(crate) async fn list_addresses(State(state): State<AppState>) -> ApiResult<Json<Vec<Address>>> {
    Ok(Json(state.addresses.list().await?))
}

#[utoipa::path(
    post,
    path = "/addresses",
    tag = "contacts",
    request_body = Address,
    responses(
        (status = 201, description = "Address created", body = Address),
        (status = 400, description = "Invalid postal code", body = ErrorRes)
    )
)]
pub(crate) async fn create_address(
    State(state): State<AppState>,
    ApiJson(address): ApiJson<Address>,
) -> ApiResult<(StatusCode, Json<Address>)> {
    Ok((StatusCode::CREATED, Json(state.addresses.create(address).await?)))
}

#[utoipa::path(
    get,
    path = "/addresses/{id}",
    tag = "contacts",
    params(("id" = String, Path, description = "Store identity")),
    responses(
        (status = 200, description = "The address", body = Address),
        (status = 404, description = "Unknown address", body = ErrorRes)
    )
)]
pub(crate) async fn retrieve_address(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Address>> {
    Ok(Json(state.addresses.retrieve(&id).await?))
}

#[utoipa::path(
    get,
    path = "/contact-persons",
    tag = "contacts",
    params(ContactPersonQuery),
    responses((status = 200, description = "Contact persons, optionally for one site", body = [ContactPerson]))
)]
pub(crate) async fn list_contact_persons(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ContactPersonQuery>,
) -> ApiResult<Json<Vec<ContactPerson>>> {
    Ok(Json(state.contacts.list(&query).await?))
}

#[utoipa::path(
    post,
    path = "/contact-persons",
    tag = "contacts",
    request_body = ContactPerson,
    responses(
        (status = 201, description = "Contact person created", body = ContactPerson),
        (status = 400, description = "Invalid email or phone", body = ErrorRes)
    )
)]
pub(crate) async fn create_contact_person(
    State(state): State<AppState>,
    ApiJson(contact): ApiJson<ContactPerson>,
) -> ApiResult<(StatusCode, Json<ContactPerson>)> {
    Ok((StatusCode::CREATED, Json(state.contacts.create(contact).await?)))
}

#[utoipa::path(
    get,
    path = "/contact-persons/{id}",
    tag = "contacts",
    params(("id" = String, Path, description = "Store identity")),
    responses(
        (status = 200, description = "The contact person", body = ContactPerson),
        (status = 404, description = "Unknown contact person", body = ErrorRes)
    )
)]
pub(crate) async fn retrieve_contact_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ContactPerson>> {
    Ok(Json(state.contacts.retrieve(&id).await?))
}
