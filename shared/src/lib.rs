use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One weekly opening rule for a tenant. There is at most one rule per
/// weekday; a missing rule means the tenant is closed on that weekday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningRule {
    /// Day of week: 0 = Sunday, 1 = Monday, ..., 6 = Saturday
    pub day_of_week: u8,
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
    pub is_closed: bool,
}

impl OpeningRule {
    pub fn is_valid_day_of_week(day: u8) -> bool {
        day <= 6
    }

    /// Human-readable name for this rule's weekday
    pub fn day_name(&self) -> &'static str {
        match self.day_of_week {
            0 => "Sunday",
            1 => "Monday",
            2 => "Tuesday",
            3 => "Wednesday",
            4 => "Thursday",
            5 => "Friday",
            6 => "Saturday",
            _ => "Invalid",
        }
    }

    /// The week a freshly created tenant starts from: Mon-Sat
    /// 09:00-18:00, Sunday closed. Settings can overwrite it later.
    pub fn default_week() -> Vec<OpeningRule> {
        (0..7)
            .map(|day| OpeningRule {
                day_of_week: day,
                opens_at: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                closes_at: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
                is_closed: day == 0,
            })
            .collect()
    }
}

/// A bookable service offered by a tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub tenant_id: String,
    pub name: String,
    /// Length of one appointment, in minutes (always positive)
    pub duration_minutes: u32,
    pub price: f64,
    pub is_active: bool,
}

/// Lifecycle state of an appointment. Appointments are never deleted,
/// only moved between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "completed" => Ok(AppointmentStatus::Completed),
            _ => Err(format!("Invalid appointment status: {}", s)),
        }
    }

    /// Legal status transitions: a tenant confirms or cancels a pending
    /// appointment, and completes or cancels a confirmed one. Terminal
    /// states cannot move.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Completed) | (Confirmed, Cancelled)
        )
    }
}

/// A persisted appointment. `end_time` is computed from the service
/// duration at creation time and never re-derived afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub tenant_id: String,
    pub service_id: Uuid,
    /// Optional staff preference; the shared weekly schedule applies
    /// regardless of who is selected.
    pub staff_id: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    /// Price snapshot taken from the service when the booking was made
    pub price: f64,
    pub status: AppointmentStatus,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

/// Request body for the public booking endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub service_id: Uuid,
    pub staff_id: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
}

/// Free start times for one tenant/date/service combination. Slots are
/// recomputed on every request and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotsResponse {
    pub date: NaiveDate,
    pub service_id: Uuid,
    pub slots: Vec<NaiveTime>,
}

/// Dates within the booking horizon that can yield at least a slot on
/// an open weekday. Advisory for calendar rendering only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectableDaysResponse {
    pub days: Vec<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleResponse {
    pub rules: Vec<OpeningRule>,
}

/// Replaces all seven weekly rules for a tenant in one operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaceScheduleRequest {
    pub rules: Vec<OpeningRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub duration_minutes: u32,
    pub price: f64,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateAppointmentStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentListResponse {
    pub appointments: Vec<Appointment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Completed,
        ] {
            assert_eq!(AppointmentStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(AppointmentStatus::parse("no_show").is_err());
    }

    #[test]
    fn test_status_transitions() {
        use AppointmentStatus::*;

        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(Cancelled));

        // Terminal states stay put
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Confirmed));
        // No skipping straight to completed
        assert!(!Pending.can_transition_to(Completed));
    }

    #[test]
    fn test_default_week() {
        let week = OpeningRule::default_week();
        assert_eq!(week.len(), 7);

        let sunday = &week[0];
        assert_eq!(sunday.day_name(), "Sunday");
        assert!(sunday.is_closed);

        let monday = &week[1];
        assert_eq!(monday.day_name(), "Monday");
        assert!(!monday.is_closed);
        assert_eq!(monday.opens_at, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(monday.closes_at, NaiveTime::from_hms_opt(18, 0, 0).unwrap());
    }

    #[test]
    fn test_day_of_week_validation() {
        assert!(OpeningRule::is_valid_day_of_week(0));
        assert!(OpeningRule::is_valid_day_of_week(6));
        assert!(!OpeningRule::is_valid_day_of_week(7));
    }
}
