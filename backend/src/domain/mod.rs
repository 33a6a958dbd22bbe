//! Domain layer: the availability engine and the services around it.
//!
//! Everything here is a stateless computation over data fetched fresh
//! from storage at call time; there is no session state between
//! requests.

pub mod admission;
pub mod appointments;
pub mod availability;
pub mod catalog;
pub mod schedule;

pub use admission::{AdmissionError, AdmissionService};
pub use appointments::{AppointmentService, TransitionError};
pub use availability::AvailabilityService;
pub use catalog::CatalogService;
pub use schedule::{ScheduleService, WeeklySchedule};

/// Tunable booking policy. These are configuration, not magic numbers:
/// the slot grid and the booking horizon are fixed per deployment.
#[derive(Debug, Clone)]
pub struct BookingPolicy {
    /// Spacing of candidate start times, independent of service duration
    pub slot_step_minutes: u32,
    /// How far ahead of today a date may be booked, inclusive
    pub horizon_days: i64,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            slot_step_minutes: 30,
            horizon_days: 60,
        }
    }
}
