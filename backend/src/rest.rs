use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::{
    AppointmentListResponse, AppointmentStatus, CreateAppointmentRequest, CreateServiceRequest,
    ReplaceScheduleRequest, ScheduleResponse, SelectableDaysResponse, UpdateAppointmentStatusRequest,
};
use tracing::info;
use uuid::Uuid;

use crate::db::DbConnection;
use crate::domain::{
    AdmissionError, AdmissionService, AppointmentService, AvailabilityService, BookingPolicy,
    CatalogService, ScheduleService, TransitionError,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub availability: AvailabilityService,
    pub admission: AdmissionService,
    pub appointments: AppointmentService,
    pub schedule: ScheduleService,
    pub catalog: CatalogService,
}

impl AppState {
    pub fn new(db: DbConnection, policy: BookingPolicy) -> Self {
        Self {
            availability: AvailabilityService::new(db.clone(), policy),
            admission: AdmissionService::new(db.clone()),
            appointments: AppointmentService::new(db.clone()),
            schedule: ScheduleService::new(db.clone()),
            catalog: CatalogService::new(db),
        }
    }
}

/// Query parameters for the slot listing endpoint
#[derive(Deserialize, Debug)]
pub struct SlotsQuery {
    pub date: NaiveDate,
    pub service_id: Uuid,
}

/// Query parameters for the tenant appointment list
#[derive(Deserialize, Debug)]
pub struct AppointmentsQuery {
    pub status: Option<String>,
}

/// Axum handler for GET /api/booking/:tenant/services
pub async fn list_services(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/booking/{}/services", tenant);

    match state.catalog.list_active(&tenant).await {
        Ok(services) => (StatusCode::OK, Json(services)).into_response(),
        Err(e) => {
            tracing::error!("Error listing services: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error listing services").into_response()
        }
    }
}

/// Axum handler for GET /api/booking/:tenant/schedule
pub async fn get_schedule(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/booking/{}/schedule", tenant);

    match state.schedule.opening_rules(&tenant).await {
        Ok(rules) => (StatusCode::OK, Json(ScheduleResponse { rules })).into_response(),
        Err(e) => {
            tracing::error!("Error fetching schedule: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error fetching schedule").into_response()
        }
    }
}

/// Axum handler for GET /api/booking/:tenant/days
pub async fn list_selectable_days(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/booking/{}/days", tenant);

    match state.availability.selectable_days(&tenant).await {
        Ok(days) => (StatusCode::OK, Json(SelectableDaysResponse { days })).into_response(),
        Err(e) => {
            tracing::error!("Error listing selectable days: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error listing selectable days").into_response()
        }
    }
}

/// Axum handler for GET /api/booking/:tenant/slots
pub async fn list_slots(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> impl IntoResponse {
    info!("GET /api/booking/{}/slots - query: {:?}", tenant, query);

    match state.availability.available_slots(&tenant, query.date, query.service_id).await {
        Ok(Some(response)) => (StatusCode::OK, Json(response)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Service not found").into_response(),
        Err(e) => {
            tracing::error!("Error computing slots: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error computing slots").into_response()
        }
    }
}

/// Axum handler for POST /api/booking/:tenant/appointments
pub async fn create_appointment(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Json(request): Json<CreateAppointmentRequest>,
) -> impl IntoResponse {
    info!(
        "POST /api/booking/{}/appointments - {} at {}",
        tenant, request.date, request.start_time
    );

    match state.admission.admit(&tenant, request).await {
        Ok(appointment) => (StatusCode::CREATED, Json(appointment)).into_response(),
        Err(e) => admission_error_response(e),
    }
}

fn admission_error_response(error: AdmissionError) -> axum::response::Response {
    let status = match &error {
        AdmissionError::NotFound => StatusCode::NOT_FOUND,
        AdmissionError::OutOfHours | AdmissionError::InThePast => StatusCode::UNPROCESSABLE_ENTITY,
        AdmissionError::Conflict => StatusCode::CONFLICT,
        AdmissionError::Storage(e) => {
            tracing::error!("Storage error during admission: {:?}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error creating appointment").into_response();
        }
    };
    (status, error.to_string()).into_response()
}

/// Axum handler for GET /api/tenants/:tenant/appointments
pub async fn list_appointments(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Query(query): Query<AppointmentsQuery>,
) -> impl IntoResponse {
    info!("GET /api/tenants/{}/appointments - query: {:?}", tenant, query);

    let status = match query.status.as_deref() {
        None | Some("all") => None,
        Some(raw) => match AppointmentStatus::parse(raw) {
            Ok(status) => Some(status),
            Err(e) => return (StatusCode::BAD_REQUEST, e).into_response(),
        },
    };

    match state.appointments.list(&tenant, status).await {
        Ok(appointments) => {
            (StatusCode::OK, Json(AppointmentListResponse { appointments })).into_response()
        }
        Err(e) => {
            tracing::error!("Error listing appointments: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error listing appointments").into_response()
        }
    }
}

/// Axum handler for POST /api/tenants/:tenant/appointments/:id/status
pub async fn update_appointment_status(
    State(state): State<AppState>,
    Path((tenant, id)): Path<(String, Uuid)>,
    Json(request): Json<UpdateAppointmentStatusRequest>,
) -> impl IntoResponse {
    info!(
        "POST /api/tenants/{}/appointments/{}/status -> {}",
        tenant,
        id,
        request.status.as_str()
    );

    match state.appointments.transition(&tenant, id, request.status).await {
        Ok(appointment) => (StatusCode::OK, Json(appointment)).into_response(),
        Err(TransitionError::NotFound) => (StatusCode::NOT_FOUND, "Appointment not found").into_response(),
        Err(e @ TransitionError::Illegal { .. }) => {
            (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response()
        }
        Err(e @ TransitionError::Raced) => (StatusCode::CONFLICT, e.to_string()).into_response(),
        Err(TransitionError::Storage(e)) => {
            tracing::error!("Error updating appointment status: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error updating appointment").into_response()
        }
    }
}

/// Axum handler for PUT /api/tenants/:tenant/schedule
pub async fn replace_schedule(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Json(request): Json<ReplaceScheduleRequest>,
) -> impl IntoResponse {
    info!("PUT /api/tenants/{}/schedule - {} rules", tenant, request.rules.len());

    match state.schedule.replace_schedule(&tenant, &request.rules).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

/// Axum handler for POST /api/tenants/:tenant/services
pub async fn create_service(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Json(request): Json<CreateServiceRequest>,
) -> impl IntoResponse {
    info!("POST /api/tenants/{}/services - {}", tenant, request.name);

    match state.catalog.create_service(&tenant, request).await {
        Ok(service) => (StatusCode::CREATED, Json(service)).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}
