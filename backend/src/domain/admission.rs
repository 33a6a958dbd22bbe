//! Write-time validation and persistence of a booking.
//!
//! Slot generation is advisory: the ledger may change between the
//! moment slots are displayed and the moment the client submits one.
//! Admission therefore re-validates everything against fresh data and
//! performs the conflict check and the insert as a single atomic
//! statement at the persistence boundary, so two racing clients can
//! never both book overlapping intervals.

use chrono::{Duration, Local, NaiveDate, NaiveTime, Utc};
use shared::{Appointment, AppointmentStatus, CreateAppointmentRequest};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::DbConnection;
use crate::domain::schedule::WeeklySchedule;

/// Why a booking was rejected. All variants are recoverable,
/// user-facing outcomes; the client picks another slot and resubmits.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("Service not found")]
    NotFound,
    #[error("Requested time is outside opening hours")]
    OutOfHours,
    #[error("Requested slot is in the past")]
    InThePast,
    #[error("Requested slot conflicts with an existing appointment")]
    Conflict,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Service admitting client bookings into the ledger
#[derive(Clone)]
pub struct AdmissionService {
    db: DbConnection,
}

impl AdmissionService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Validate and persist a booking, or reject it
    pub async fn admit(
        &self,
        tenant_id: &str,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AdmissionError> {
        let now = Local::now();
        self.admit_at(tenant_id, request, now.date_naive(), now.time()).await
    }

    /// [`admit`](Self::admit) with the clock passed explicitly
    pub async fn admit_at(
        &self,
        tenant_id: &str,
        request: CreateAppointmentRequest,
        today: NaiveDate,
        now: NaiveTime,
    ) -> Result<Appointment, AdmissionError> {
        let service = self
            .db
            .get_service(tenant_id, request.service_id)
            .await?
            .ok_or(AdmissionError::NotFound)?;

        // End time is recomputed here, never trusted from client state
        let duration = Duration::minutes(service.duration_minutes as i64);
        let (end_time, wrap) = request.start_time.overflowing_add_signed(duration);
        if wrap != 0 {
            return Err(AdmissionError::OutOfHours);
        }

        let schedule = WeeklySchedule::new(self.db.opening_rules(tenant_id).await?);
        let Some((opens_at, closes_at)) = schedule.opening_interval(request.date) else {
            return Err(AdmissionError::OutOfHours);
        };
        if request.start_time < opens_at || end_time > closes_at {
            return Err(AdmissionError::OutOfHours);
        }

        if request.date < today || (request.date == today && request.start_time < now) {
            return Err(AdmissionError::InThePast);
        }

        let appointment = Appointment {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            service_id: service.id,
            staff_id: request.staff_id,
            date: request.date,
            start_time: request.start_time,
            end_time,
            client_name: request.client_name,
            client_email: request.client_email,
            client_phone: request.client_phone,
            price: service.price,
            status: AppointmentStatus::Pending,
            created_at: Utc::now().to_rfc3339(),
        };

        // Conflict check and insert are one statement; a race that
        // slipped past slot generation surfaces here as Conflict.
        let inserted = self.db.insert_appointment_if_free(&appointment).await?;
        if !inserted {
            warn!(
                tenant_id,
                date = %appointment.date,
                start = %appointment.start_time,
                "booking rejected: interval already taken"
            );
            return Err(AdmissionError::Conflict);
        }

        info!(
            tenant_id,
            id = %appointment.id,
            date = %appointment.date,
            start = %appointment.start_time,
            "appointment admitted"
        );
        Ok(appointment)
    }
}
