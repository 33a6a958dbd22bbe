//! Calendar rules for a tenant's week.
//!
//! A tenant has at most one opening rule per weekday. A date is open
//! when its weekday has a rule that is not marked closed; a missing
//! rule means closed, never an error. All computations here are pure
//! functions over explicitly passed data so they can be unit tested
//! without a database.

use anyhow::{anyhow, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use shared::OpeningRule;
use tracing::info;

use crate::db::DbConnection;

/// A tenant's weekly opening hours, indexed by weekday
#[derive(Debug, Clone)]
pub struct WeeklySchedule {
    rules: Vec<OpeningRule>,
}

impl WeeklySchedule {
    pub fn new(rules: Vec<OpeningRule>) -> Self {
        Self { rules }
    }

    /// Weekday number for a date: 0 = Sunday, ..., 6 = Saturday
    pub fn weekday_of(date: NaiveDate) -> u8 {
        date.weekday().num_days_from_sunday() as u8
    }

    fn rule_for(&self, date: NaiveDate) -> Option<&OpeningRule> {
        let weekday = Self::weekday_of(date);
        self.rules.iter().find(|r| r.day_of_week == weekday)
    }

    /// Whether the tenant is open at all on this date
    pub fn is_open(&self, date: NaiveDate) -> bool {
        self.rule_for(date).map_or(false, |rule| !rule.is_closed)
    }

    /// The contiguous open period for this date, if any
    pub fn opening_interval(&self, date: NaiveDate) -> Option<(NaiveTime, NaiveTime)> {
        self.rule_for(date)
            .filter(|rule| !rule.is_closed)
            .map(|rule| (rule.opens_at, rule.closes_at))
    }

    /// Front-end calendar gate: a date can be picked when it is not in
    /// the past, not beyond the booking horizon, and its weekday is
    /// open. Advisory only; admission re-validates independently.
    pub fn is_date_selectable(&self, date: NaiveDate, today: NaiveDate, horizon_days: i64) -> bool {
        if date < today {
            return false;
        }
        if date > today + Duration::days(horizon_days) {
            return false;
        }
        self.is_open(date)
    }

    /// All selectable dates from `today` through the horizon, inclusive
    pub fn selectable_days(&self, today: NaiveDate, horizon_days: i64) -> Vec<NaiveDate> {
        (0..=horizon_days)
            .map(|offset| today + Duration::days(offset))
            .filter(|date| self.is_open(*date))
            .collect()
    }
}

/// Service for reading and replacing a tenant's weekly schedule
#[derive(Clone)]
pub struct ScheduleService {
    db: DbConnection,
}

impl ScheduleService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn opening_rules(&self, tenant_id: &str) -> Result<Vec<OpeningRule>> {
        self.db.opening_rules(tenant_id).await
    }

    /// Replace all weekly rules for a tenant in one operation
    pub async fn replace_schedule(&self, tenant_id: &str, rules: &[OpeningRule]) -> Result<()> {
        for rule in rules {
            if !OpeningRule::is_valid_day_of_week(rule.day_of_week) {
                return Err(anyhow!("Invalid day of week: {}", rule.day_of_week));
            }
            if !rule.is_closed && rule.opens_at >= rule.closes_at {
                return Err(anyhow!(
                    "Opening time must be before closing time on {}",
                    rule.day_name()
                ));
            }
        }
        let mut seen = [false; 7];
        for rule in rules {
            if seen[rule.day_of_week as usize] {
                return Err(anyhow!("Duplicate rule for {}", rule.day_name()));
            }
            seen[rule.day_of_week as usize] = true;
        }

        info!("Replacing weekly schedule for tenant {} ({} rules)", tenant_id, rules.len());
        self.db.replace_opening_rules(tenant_id, rules).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn mon_to_sat() -> WeeklySchedule {
        WeeklySchedule::new(OpeningRule::default_week())
    }

    #[test]
    fn test_weekday_numbering_starts_at_sunday() {
        // 2026-08-23 is a Sunday
        assert_eq!(WeeklySchedule::weekday_of(date(2026, 8, 23)), 0);
        assert_eq!(WeeklySchedule::weekday_of(date(2026, 8, 24)), 1);
        assert_eq!(WeeklySchedule::weekday_of(date(2026, 8, 29)), 6);
    }

    #[test]
    fn test_is_open_follows_rules() {
        let schedule = mon_to_sat();

        assert!(!schedule.is_open(date(2026, 8, 23))); // Sunday closed
        assert!(schedule.is_open(date(2026, 8, 25))); // Tuesday open
    }

    #[test]
    fn test_missing_rule_means_closed() {
        // Only a Monday rule exists; every other weekday is closed
        let schedule = WeeklySchedule::new(vec![OpeningRule {
            day_of_week: 1,
            opens_at: time(8, 0),
            closes_at: time(12, 0),
            is_closed: false,
        }]);

        assert!(schedule.is_open(date(2026, 8, 24)));
        assert!(!schedule.is_open(date(2026, 8, 25)));
        assert_eq!(schedule.opening_interval(date(2026, 8, 25)), None);
    }

    #[test]
    fn test_opening_interval() {
        let schedule = mon_to_sat();

        assert_eq!(
            schedule.opening_interval(date(2026, 8, 25)),
            Some((time(9, 0), time(18, 0)))
        );
        assert_eq!(schedule.opening_interval(date(2026, 8, 23)), None);
    }

    #[test]
    fn test_date_selectable_horizon_is_inclusive() {
        let schedule = mon_to_sat();
        // A Monday; today + 60 (Friday) and today + 61 (Saturday) are
        // open weekdays, so only the horizon decides
        let today = date(2026, 8, 24);

        // The previous Saturday is an open weekday, but in the past
        assert!(!schedule.is_date_selectable(today - Duration::days(2), today, 60));
        assert!(schedule.is_date_selectable(today, today, 60));
        assert!(schedule.is_date_selectable(today + Duration::days(60), today, 60));
        assert!(!schedule.is_date_selectable(today + Duration::days(61), today, 60));
    }

    #[test]
    fn test_date_selectable_respects_closed_weekday() {
        let schedule = mon_to_sat();
        let sunday = date(2026, 8, 30);

        assert!(!schedule.is_date_selectable(sunday, date(2026, 8, 25), 60));
    }

    #[test]
    fn test_selectable_days_excludes_sundays() {
        let schedule = mon_to_sat();
        let today = date(2026, 8, 25);

        let days = schedule.selectable_days(today, 13);
        assert_eq!(days.len(), 12); // 14 dates minus 2 Sundays
        assert!(days.contains(&today));
        assert!(!days.contains(&date(2026, 8, 30)));
        assert!(days.windows(2).all(|w| w[0] < w[1]));
    }
}
