//! Slot generation for the public booking page.
//!
//! Candidate start times step through the opening interval in fixed
//! 30-minute increments regardless of service duration; a shorter or
//! longer service changes which candidates survive, never the grid.
//! This keeps start times aligned for staff at the cost of sometimes
//! leaving unusable sub-30-minute gaps between bookings.
//!
//! `generate_slots` is a pure function of its inputs: calling it twice
//! against the same ledger snapshot yields the same sequence.

use anyhow::Result;
use chrono::{Duration, Local, NaiveDate, NaiveTime, Timelike};
use shared::SlotsResponse;
use tracing::debug;
use uuid::Uuid;

use crate::db::DbConnection;
use crate::domain::schedule::WeeklySchedule;
use crate::domain::BookingPolicy;

/// Half-open interval intersection on minute-granularity times
pub fn overlaps(
    a_start: NaiveTime,
    a_end: NaiveTime,
    b_start: NaiveTime,
    b_end: NaiveTime,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Compute the free start times for one day.
///
/// * `interval` — the day's opening interval, `None` when closed
/// * `booked` — non-cancelled appointment intervals for the day
/// * `now` — `Some(current time)` when the day is today; candidates
///   strictly before it are dropped
///
/// A candidate `[cursor, cursor + duration)` is kept while it ends at
/// or before closing time (ending exactly at closing is allowed) and
/// does not intersect any booked interval.
pub fn generate_slots(
    interval: Option<(NaiveTime, NaiveTime)>,
    booked: &[(NaiveTime, NaiveTime)],
    duration_minutes: u32,
    step_minutes: u32,
    now: Option<NaiveTime>,
) -> Vec<NaiveTime> {
    let Some((opens_at, closes_at)) = interval else {
        return Vec::new();
    };
    if duration_minutes == 0 || step_minutes == 0 {
        return Vec::new();
    }

    let duration = Duration::minutes(duration_minutes as i64);
    let step = Duration::minutes(step_minutes as i64);

    let mut slots = Vec::new();
    let mut cursor = opens_at;

    loop {
        // NaiveTime arithmetic wraps at midnight; a wrapped end means
        // the candidate runs past the end of the day.
        let (end, wrap) = cursor.overflowing_add_signed(duration);
        if wrap != 0 || end > closes_at {
            break;
        }

        let in_past = now.map_or(false, |now| cursor < now);
        let conflict = booked
            .iter()
            .any(|&(b_start, b_end)| overlaps(cursor, end, b_start, b_end));

        if !in_past && !conflict {
            slots.push(cursor);
        }

        let (next, wrap) = cursor.overflowing_add_signed(step);
        if wrap != 0 {
            break;
        }
        cursor = next;
    }

    slots
}

/// Service computing availability from fresh calendar and ledger data
#[derive(Clone)]
pub struct AvailabilityService {
    db: DbConnection,
    policy: BookingPolicy,
}

impl AvailabilityService {
    pub fn new(db: DbConnection, policy: BookingPolicy) -> Self {
        Self { db, policy }
    }

    /// Free slots for a tenant/date/service. Returns `Ok(None)` when
    /// the service does not exist for this tenant.
    pub async fn available_slots(
        &self,
        tenant_id: &str,
        date: NaiveDate,
        service_id: Uuid,
    ) -> Result<Option<SlotsResponse>> {
        let now = Local::now();
        self.available_slots_at(tenant_id, date, service_id, now.date_naive(), now.time())
            .await
    }

    /// Same as [`available_slots`](Self::available_slots) with the
    /// clock passed explicitly, so tests control "today".
    pub async fn available_slots_at(
        &self,
        tenant_id: &str,
        date: NaiveDate,
        service_id: Uuid,
        today: NaiveDate,
        now: NaiveTime,
    ) -> Result<Option<SlotsResponse>> {
        let Some(service) = self.db.get_service(tenant_id, service_id).await? else {
            return Ok(None);
        };

        let schedule = WeeklySchedule::new(self.db.opening_rules(tenant_id).await?);
        // Ledger is read fresh on every request; slots are derived
        // values and never cached across calls.
        let booked = self.db.booked_intervals(tenant_id, date).await?;

        let slots = generate_slots(
            schedule.opening_interval(date),
            &booked,
            service.duration_minutes,
            self.policy.slot_step_minutes,
            // Truncate to the minute so a slot starting this minute is
            // still offered even when seconds have passed.
            (date == today).then(|| now.with_second(0).unwrap_or(now)),
        );

        debug!(
            tenant_id,
            %date,
            %service_id,
            booked = booked.len(),
            slots = slots.len(),
            "computed availability"
        );

        Ok(Some(SlotsResponse { date, service_id, slots }))
    }

    /// Whether the booking calendar should let a client pick this
    /// date. Advisory only; admission re-validates independently.
    pub async fn is_date_selectable(&self, tenant_id: &str, date: NaiveDate) -> Result<bool> {
        self.is_date_selectable_at(tenant_id, date, Local::now().date_naive()).await
    }

    pub async fn is_date_selectable_at(
        &self,
        tenant_id: &str,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<bool> {
        let schedule = WeeklySchedule::new(self.db.opening_rules(tenant_id).await?);
        Ok(schedule.is_date_selectable(date, today, self.policy.horizon_days))
    }

    /// Dates a client may pick on the booking calendar: today through
    /// the booking horizon, open weekdays only.
    pub async fn selectable_days(&self, tenant_id: &str) -> Result<Vec<NaiveDate>> {
        self.selectable_days_at(tenant_id, Local::now().date_naive()).await
    }

    pub async fn selectable_days_at(&self, tenant_id: &str, today: NaiveDate) -> Result<Vec<NaiveDate>> {
        let schedule = WeeklySchedule::new(self.db.opening_rules(tenant_id).await?);
        Ok(schedule.selectable_days(today, self.policy.horizon_days))
    }
}
