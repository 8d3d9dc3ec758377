//! # API REST
//!
//! REST API implementation for Odyssey.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - Bearer token authentication
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, trailing slashes)
//!
//! Uses `api-shared` for common types and utilities. Business rules live in `odyssey-core`.

#![warn(rust_2018_idioms)]

mod error;
mod routes;

use api_shared::{
    auth::bearer_token, AddFailureReq, AdjustInventoryReq, BulkAddSitesReq,
    BulkCreateShipmentsReq, ErrorRes, HealthRes, ManageRelationshipsReq, TokenVerifier,
    UpdateStatusReq,
};
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use odyssey_core::queries::{
    FailureBreakdownRow, KitDeviceDetailsView, MonthlyTrendRow, ParcelTemplateView,
    ShipmentAnalyticsView, ShipmentDetailsView, SiteRollupView, StatusSummaryRow,
    TrialRollupView,
};
use odyssey_core::records::{
    Address, ContactPerson, Device, FailureReport, IotDevice, IotDeviceDescriptor, Kit,
    KitInventory, Parcel, ParcelContent, Patient, RecordMeta, SampleType, Shipment,
    ShipmentStatus, Site, Trial,
};
use odyssey_core::repositories::sites::KitInventoryStatus;
use odyssey_core::{
    AddressService, ContactPersonService, DeviceService, DocumentStore, FailureReportService,
    IotDeviceService, KitService, ParcelService, PatientService, ShipmentService, SiteService,
    TrialService,
};
use routes::{catalog, contacts, failures, health, parcels, patients, shipments, sites, trials};
use std::sync::Arc;
use tower::Layer;
use tower_http::{cors::CorsLayer, normalize_path::NormalizePathLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use error::{ApiError, ApiResult};

/// Application state for the REST API server
///
/// Holds the single document store handle, the token verifier and one service per entity,
/// all sharing that store.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn DocumentStore>,
    verifier: Arc<dyn TokenVerifier>,
    trials: TrialService,
    sites: SiteService,
    patients: PatientService,
    addresses: AddressService,
    contacts: ContactPersonService,
    devices: DeviceService,
    iot_devices: IotDeviceService,
    kits: KitService,
    parcels: ParcelService,
    shipments: ShipmentService,
    failures: FailureReportService,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            trials: TrialService::new(Arc::clone(&store)),
            sites: SiteService::new(Arc::clone(&store)),
            patients: PatientService::new(Arc::clone(&store)),
            addresses: AddressService::new(Arc::clone(&store)),
            contacts: ContactPersonService::new(Arc::clone(&store)),
            devices: DeviceService::new(Arc::clone(&store)),
            iot_devices: IotDeviceService::new(Arc::clone(&store)),
            kits: KitService::new(Arc::clone(&store)),
            parcels: ParcelService::new(Arc::clone(&store)),
            shipments: ShipmentService::new(Arc::clone(&store)),
            failures: FailureReportService::new(Arc::clone(&store)),
            store,
            verifier,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Odyssey API", description = "Clinical-trial logistics"),
    paths(
        health::health,
        trials::list_trials,
        trials::create_trial,
        trials::retrieve_trial,
        trials::update_trial,
        trials::associated_sites,
        trials::bulk_add_sites,
        trials::manage_relationships,
        trials::trial_rollup,
        sites::list_sites,
        sites::create_site,
        sites::retrieve_site,
        sites::update_site,
        sites::kit_inventory,
        sites::adjust_inventory,
        sites::site_rollup,
        patients::list_patients,
        patients::create_patient,
        patients::retrieve_patient,
        patients::update_patient,
        contacts::list_addresses,
        contacts::create_address,
        contacts::retrieve_address,
        contacts::list_contact_persons,
        contacts::create_contact_person,
        contacts::retrieve_contact_person,
        catalog::list_devices,
        catalog::create_device,
        catalog::retrieve_device,
        catalog::update_device,
        catalog::list_iot_devices,
        catalog::create_iot_device,
        catalog::retrieve_iot_device,
        catalog::update_iot_device,
        catalog::list_kits,
        catalog::create_kit,
        catalog::retrieve_kit,
        catalog::update_kit,
        catalog::kit_device_details,
        parcels::list_parcels,
        parcels::create_parcel,
        parcels::retrieve_parcel,
        parcels::parcel_templates,
        failures::list_failures,
        failures::create_failure,
        failures::retrieve_failure,
        shipments::list_shipments,
        shipments::create_shipment,
        shipments::save_created_shipment,
        shipments::bulk_create_shipments,
        shipments::retrieve_shipment,
        shipments::update_shipment,
        shipments::shipment_details,
        shipments::update_status,
        shipments::add_failure,
        shipments::failure_analytics,
        shipments::shipment_analytics,
        shipments::saved_shipment_information,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        BulkAddSitesReq,
        ManageRelationshipsReq,
        UpdateStatusReq,
        AddFailureReq,
        BulkCreateShipmentsReq,
        AdjustInventoryReq,
        RecordMeta,
        Trial,
        Site,
        KitInventory,
        KitInventoryStatus,
        Patient,
        Address,
        ContactPerson,
        Device,
        SampleType,
        IotDevice,
        IotDeviceDescriptor,
        Kit,
        Parcel,
        ParcelContent,
        Shipment,
        ShipmentStatus,
        FailureReport,
        TrialRollupView,
        SiteRollupView,
        ShipmentDetailsView,
        KitDeviceDetailsView,
        ParcelTemplateView,
        FailureBreakdownRow,
        StatusSummaryRow,
        MonthlyTrendRow,
        ShipmentAnalyticsView,
    ))
)]
pub struct ApiDoc;

/// Rejects requests without a valid `Authorization: Bearer <token>` header.
async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match bearer_token(header).and_then(|token| state.verifier.verify(token)) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            tracing::warn!(path = %request.uri().path(), "unauthorised request: {e}");
            (StatusCode::UNAUTHORIZED, Json(ErrorRes::new(e.to_string()))).into_response()
        }
    }
}

/// The authenticated entity routes, without trailing-slash handling.
fn api_routes(state: AppState) -> Router {
    let protected = Router::new()
        .route("/trials", get(trials::list_trials).post(trials::create_trial))
        .route(
            "/trials/:id",
            get(trials::retrieve_trial).put(trials::update_trial),
        )
        .route("/trials/:id/associated_sites", get(trials::associated_sites))
        .route("/trials/:id/bulk_add_sites", post(trials::bulk_add_sites))
        .route(
            "/trials/:id/manage_relationships",
            post(trials::manage_relationships),
        )
        .route("/trials/:id/rollup", get(trials::trial_rollup))
        .route("/sites", get(sites::list_sites).post(sites::create_site))
        .route("/sites/:id", get(sites::retrieve_site).put(sites::update_site))
        .route("/sites/:id/kit_inventory", get(sites::kit_inventory))
        .route("/sites/:id/adjust_inventory", post(sites::adjust_inventory))
        .route("/sites/:id/rollup", get(sites::site_rollup))
        .route(
            "/patients",
            get(patients::list_patients).post(patients::create_patient),
        )
        .route(
            "/patients/:id",
            get(patients::retrieve_patient).put(patients::update_patient),
        )
        .route(
            "/addresses",
            get(contacts::list_addresses).post(contacts::create_address),
        )
        .route("/addresses/:id", get(contacts::retrieve_address))
        .route(
            "/contact-persons",
            get(contacts::list_contact_persons).post(contacts::create_contact_person),
        )
        .route("/contact-persons/:id", get(contacts::retrieve_contact_person))
        .route(
            "/devices",
            get(catalog::list_devices).post(catalog::create_device),
        )
        .route(
            "/devices/:id",
            get(catalog::retrieve_device).put(catalog::update_device),
        )
        .route(
            "/iot-devices",
            get(catalog::list_iot_devices).post(catalog::create_iot_device),
        )
        .route(
            "/iot-devices/:id",
            get(catalog::retrieve_iot_device).put(catalog::update_iot_device),
        )
        .route("/kits", get(catalog::list_kits).post(catalog::create_kit))
        .route("/kits/:id", get(catalog::retrieve_kit).put(catalog::update_kit))
        .route("/kits/:id/device_details", get(catalog::kit_device_details))
        .route(
            "/parcels",
            get(parcels::list_parcels).post(parcels::create_parcel),
        )
        .route("/parcels/templates", get(parcels::parcel_templates))
        .route("/parcels/:id", get(parcels::retrieve_parcel))
        .route(
            "/failures",
            get(failures::list_failures).post(failures::create_failure),
        )
        .route("/failures/:id", get(failures::retrieve_failure))
        .route(
            "/shipments",
            get(shipments::list_shipments).post(shipments::create_shipment),
        )
        .route(
            "/shipments/bulk_create",
            post(shipments::bulk_create_shipments),
        )
        .route(
            "/shipments/save_created_shipment",
            post(shipments::save_created_shipment),
        )
        .route(
            "/shipments/failure_analytics",
            get(shipments::failure_analytics),
        )
        .route("/shipments/analytics", get(shipments::shipment_analytics))
        .route(
            "/shipments/saved_shipment_information",
            get(shipments::saved_shipment_information),
        )
        .route(
            "/shipments/:tracking",
            get(shipments::retrieve_shipment).put(shipments::update_shipment),
        )
        .route(
            "/shipments/:tracking/details",
            get(shipments::shipment_details),
        )
        .route(
            "/shipments/:tracking/update_status",
            post(shipments::update_status),
        )
        .route(
            "/shipments/:tracking/add_failure",
            post(shipments::add_failure),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/health", get(health::health))
        .merge(protected)
        .with_state(state)
}

/// Builds the complete application.
///
/// Entity routes accept an optional trailing slash (`/trials/` and `/trials` are the same
/// route). Swagger UI is served at `/swagger-ui` and the OpenAPI document at
/// `/api-docs/openapi.json`, both without authentication.
pub fn app(state: AppState) -> Router {
    let api = NormalizePathLayer::trim_trailing_slash().layer(api_routes(state));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback_service(api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
