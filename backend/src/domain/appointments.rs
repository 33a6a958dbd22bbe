//! Tenant-side appointment management: dashboard listing and status
//! transitions. Appointments are never deleted, only moved between
//! states; cancelling one releases its interval back to the slot
//! generator.

use shared::{Appointment, AppointmentStatus};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::db::DbConnection;

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Appointment not found")]
    NotFound,
    #[error("Cannot move a {} appointment to {}", from.as_str(), to.as_str())]
    Illegal {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
    #[error("Appointment status changed concurrently")]
    Raced,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct AppointmentService {
    db: DbConnection,
}

impl AppointmentService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// List a tenant's appointments, optionally filtered by status,
    /// newest date first
    pub async fn list(
        &self,
        tenant_id: &str,
        status: Option<AppointmentStatus>,
    ) -> anyhow::Result<Vec<Appointment>> {
        self.db.list_appointments(tenant_id, status).await
    }

    /// Apply a status transition. The stored row is only updated when
    /// it is still in the state the transition was checked against, so
    /// two concurrent transitions cannot both apply.
    pub async fn transition(
        &self,
        tenant_id: &str,
        id: Uuid,
        to: AppointmentStatus,
    ) -> Result<Appointment, TransitionError> {
        let appointment = self
            .db
            .get_appointment(tenant_id, id)
            .await?
            .ok_or(TransitionError::NotFound)?;

        let from = appointment.status;
        if !from.can_transition_to(to) {
            return Err(TransitionError::Illegal { from, to });
        }

        let updated = self.db.update_appointment_status(tenant_id, id, from, to).await?;
        if !updated {
            return Err(TransitionError::Raced);
        }

        info!(
            tenant_id,
            id = %id,
            from = from.as_str(),
            to = to.as_str(),
            "appointment status updated"
        );
        Ok(Appointment { status: to, ..appointment })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use shared::{CreateAppointmentRequest, OpeningRule, Service};

    use crate::domain::admission::AdmissionService;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    // A Monday
    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 24).unwrap()
    }

    async fn admit_one(db: &DbConnection, at: NaiveTime) -> Appointment {
        let service = Service {
            id: Uuid::new_v4(),
            tenant_id: "tenant-a".to_string(),
            name: "Consultation".to_string(),
            duration_minutes: 30,
            price: 50.0,
            is_active: true,
        };
        db.create_service(&service).await.unwrap();

        AdmissionService::new(db.clone())
            .admit_at(
                "tenant-a",
                CreateAppointmentRequest {
                    service_id: service.id,
                    staff_id: None,
                    date: day(),
                    start_time: at,
                    client_name: "Bruno Lima".to_string(),
                    client_email: "bruno@example.com".to_string(),
                    client_phone: "11 98888-0000".to_string(),
                },
                day(),
                time(8, 0),
            )
            .await
            .unwrap()
    }

    async fn seeded_db() -> DbConnection {
        let db = DbConnection::init_test().await.unwrap();
        db.replace_opening_rules("tenant-a", &OpeningRule::default_week())
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_confirm_then_complete() {
        let db = seeded_db().await;
        let appointment = admit_one(&db, time(10, 0)).await;
        let service = AppointmentService::new(db);

        let confirmed = service
            .transition("tenant-a", appointment.id, AppointmentStatus::Confirmed)
            .await
            .unwrap();
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

        let completed = service
            .transition("tenant-a", appointment.id, AppointmentStatus::Completed)
            .await
            .unwrap();
        assert_eq!(completed.status, AppointmentStatus::Completed);
    }

    #[tokio::test]
    async fn test_illegal_transition_rejected() {
        let db = seeded_db().await;
        let appointment = admit_one(&db, time(10, 0)).await;
        let service = AppointmentService::new(db);

        // Pending cannot jump straight to completed
        let result = service
            .transition("tenant-a", appointment.id, AppointmentStatus::Completed)
            .await;
        assert!(matches!(result, Err(TransitionError::Illegal { .. })));
    }

    #[tokio::test]
    async fn test_transition_unknown_appointment() {
        let db = seeded_db().await;
        let service = AppointmentService::new(db);

        let result = service
            .transition("tenant-a", Uuid::new_v4(), AppointmentStatus::Confirmed)
            .await;
        assert!(matches!(result, Err(TransitionError::NotFound)));
    }

    #[tokio::test]
    async fn test_list_with_status_filter() {
        let db = seeded_db().await;
        let first = admit_one(&db, time(10, 0)).await;
        let _second = admit_one(&db, time(11, 0)).await;
        let service = AppointmentService::new(db);

        service
            .transition("tenant-a", first.id, AppointmentStatus::Cancelled)
            .await
            .unwrap();

        let all = service.list("tenant-a", None).await.unwrap();
        assert_eq!(all.len(), 2);
        // Newest start first within the same date
        assert!(all[0].start_time > all[1].start_time);

        let pending = service
            .list("tenant-a", Some(AppointmentStatus::Pending))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);

        let cancelled = service
            .list("tenant-a", Some(AppointmentStatus::Cancelled))
            .await
            .unwrap();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].id, first.id);
    }
}
