use anyhow::{anyhow, Result};
use chrono::{NaiveDate, NaiveTime, Timelike};
use shared::{Appointment, AppointmentStatus, OpeningRule, Service};
use sqlx::{migrate::MigrateDatabase, sqlite::SqliteRow, Row, Sqlite, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

// The database URL for the production database
const DATABASE_URL: &str = "sqlite:slotbook.db";

/// DbConnection manages all persistence for the booking engine.
///
/// Times-of-day are stored as zero-padded `HH:MM` TEXT so that SQL
/// string comparison matches minute-granularity time comparison; dates
/// are stored as `YYYY-MM-DD` TEXT.
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Create a new database connection
    pub async fn new(url: &str) -> Result<Self> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url).await?
        }

        let pool = SqlitePool::connect(url).await?;
        Self::setup_schema(&pool).await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Initialize the standard database, honoring `SLOTBOOK_DB` when set
    pub async fn init() -> Result<Self> {
        let url = std::env::var("SLOTBOOK_DB").unwrap_or_else(|_| DATABASE_URL.to_string());
        Self::new(&url).await
    }

    /// Initialize a test database with a unique name
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        // Generate a unique database name so parallel tests don't share state
        let test_id = Uuid::new_v4().to_string();
        let db_url = format!("file:memdb_{}?mode=memory&cache=shared", test_id);

        Self::new(&db_url).await
    }

    /// Set up the required database schema
    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS opening_rules (
                tenant_id   TEXT NOT NULL,
                day_of_week INTEGER NOT NULL,
                opens_at    TEXT NOT NULL,
                closes_at   TEXT NOT NULL,
                is_closed   INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (tenant_id, day_of_week)
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS services (
                id               TEXT PRIMARY KEY,
                tenant_id        TEXT NOT NULL,
                name             TEXT NOT NULL,
                duration_minutes INTEGER NOT NULL,
                price            REAL NOT NULL DEFAULT 0,
                is_active        INTEGER NOT NULL DEFAULT 1
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS appointments (
                id           TEXT PRIMARY KEY,
                tenant_id    TEXT NOT NULL,
                service_id   TEXT NOT NULL,
                staff_id     TEXT,
                date         TEXT NOT NULL,
                start_time   TEXT NOT NULL,
                end_time     TEXT NOT NULL,
                client_name  TEXT NOT NULL,
                client_email TEXT NOT NULL,
                client_phone TEXT NOT NULL,
                price        REAL NOT NULL DEFAULT 0,
                status       TEXT NOT NULL,
                created_at   TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_appointments_tenant_date ON appointments (tenant_id, date);",
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    // ----- opening rules -----

    /// Fetch a tenant's weekly opening rules, ordered by weekday.
    /// An empty result means the tenant is closed every day.
    pub async fn opening_rules(&self, tenant_id: &str) -> Result<Vec<OpeningRule>> {
        let rows = sqlx::query(
            "SELECT day_of_week, opens_at, closes_at, is_closed
             FROM opening_rules WHERE tenant_id = ? ORDER BY day_of_week",
        )
        .bind(tenant_id)
        .fetch_all(&*self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(OpeningRule {
                    day_of_week: row.get::<i64, _>("day_of_week") as u8,
                    opens_at: parse_time(&row.get::<String, _>("opens_at"))?,
                    closes_at: parse_time(&row.get::<String, _>("closes_at"))?,
                    is_closed: row.get::<i64, _>("is_closed") != 0,
                })
            })
            .collect()
    }

    /// Replace all of a tenant's weekly rules in a single transaction
    pub async fn replace_opening_rules(&self, tenant_id: &str, rules: &[OpeningRule]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM opening_rules WHERE tenant_id = ?")
            .bind(tenant_id)
            .execute(&mut *tx)
            .await?;

        for rule in rules {
            sqlx::query(
                "INSERT INTO opening_rules (tenant_id, day_of_week, opens_at, closes_at, is_closed)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(tenant_id)
            .bind(rule.day_of_week as i64)
            .bind(format_time(rule.opens_at))
            .bind(format_time(rule.closes_at))
            .bind(rule.is_closed as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    // ----- services -----

    pub async fn create_service(&self, service: &Service) -> Result<()> {
        sqlx::query(
            "INSERT INTO services (id, tenant_id, name, duration_minutes, price, is_active)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(service.id.to_string())
        .bind(&service.tenant_id)
        .bind(&service.name)
        .bind(service.duration_minutes as i64)
        .bind(service.price)
        .bind(service.is_active as i64)
        .execute(&*self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_service(&self, tenant_id: &str, service_id: Uuid) -> Result<Option<Service>> {
        let row = sqlx::query(
            "SELECT id, tenant_id, name, duration_minutes, price, is_active
             FROM services WHERE tenant_id = ? AND id = ?",
        )
        .bind(tenant_id)
        .bind(service_id.to_string())
        .fetch_optional(&*self.pool)
        .await?;

        row.map(|row| service_from_row(&row)).transpose()
    }

    /// Services shown on the public booking page: active only, name order
    pub async fn list_active_services(&self, tenant_id: &str) -> Result<Vec<Service>> {
        let rows = sqlx::query(
            "SELECT id, tenant_id, name, duration_minutes, price, is_active
             FROM services WHERE tenant_id = ? AND is_active = 1 ORDER BY name",
        )
        .bind(tenant_id)
        .fetch_all(&*self.pool)
        .await?;

        rows.iter().map(service_from_row).collect()
    }

    // ----- booking ledger -----

    /// Booked intervals for a tenant/date, cancelled appointments
    /// excluded, ordered by start time. Always read fresh; slot
    /// computation must never reuse a stale snapshot across requests.
    pub async fn booked_intervals(
        &self,
        tenant_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<(NaiveTime, NaiveTime)>> {
        let rows = sqlx::query(
            "SELECT start_time, end_time FROM appointments
             WHERE tenant_id = ? AND date = ? AND status != 'cancelled'
             ORDER BY start_time",
        )
        .bind(tenant_id)
        .bind(date.to_string())
        .fetch_all(&*self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok((
                    parse_time(&row.get::<String, _>("start_time"))?,
                    parse_time(&row.get::<String, _>("end_time"))?,
                ))
            })
            .collect()
    }

    /// Insert the appointment unless it overlaps an existing
    /// non-cancelled appointment for the same tenant/date.
    ///
    /// The overlap check and the insert run as one SQL statement, so
    /// two racing admissions cannot both commit: SQLite serializes
    /// writers and the loser sees the winner's row. Returns `false`
    /// when the insert was rejected because of an overlap.
    pub async fn insert_appointment_if_free(&self, appointment: &Appointment) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO appointments
                (id, tenant_id, service_id, staff_id, date, start_time, end_time,
                 client_name, client_email, client_phone, price, status, created_at)
            SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
            WHERE NOT EXISTS (
                SELECT 1 FROM appointments
                WHERE tenant_id = ? AND date = ? AND status != 'cancelled'
                  AND start_time < ? AND end_time > ?
            )
            "#,
        )
        .bind(appointment.id.to_string())
        .bind(&appointment.tenant_id)
        .bind(appointment.service_id.to_string())
        .bind(appointment.staff_id.as_deref())
        .bind(appointment.date.to_string())
        .bind(format_time(appointment.start_time))
        .bind(format_time(appointment.end_time))
        .bind(&appointment.client_name)
        .bind(&appointment.client_email)
        .bind(&appointment.client_phone)
        .bind(appointment.price)
        .bind(appointment.status.as_str())
        .bind(&appointment.created_at)
        .bind(&appointment.tenant_id)
        .bind(appointment.date.to_string())
        .bind(format_time(appointment.end_time))
        .bind(format_time(appointment.start_time))
        .execute(&*self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn get_appointment(&self, tenant_id: &str, id: Uuid) -> Result<Option<Appointment>> {
        let row = sqlx::query(
            "SELECT * FROM appointments WHERE tenant_id = ? AND id = ?",
        )
        .bind(tenant_id)
        .bind(id.to_string())
        .fetch_optional(&*self.pool)
        .await?;

        row.map(|row| appointment_from_row(&row)).transpose()
    }

    /// List a tenant's appointments for the dashboard, optionally
    /// filtered by status, newest date first.
    pub async fn list_appointments(
        &self,
        tenant_id: &str,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>> {
        let rows = match status {
            Some(status) => {
                sqlx::query(
                    "SELECT * FROM appointments
                     WHERE tenant_id = ? AND status = ?
                     ORDER BY date DESC, start_time DESC",
                )
                .bind(tenant_id)
                .bind(status.as_str())
                .fetch_all(&*self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT * FROM appointments
                     WHERE tenant_id = ?
                     ORDER BY date DESC, start_time DESC",
                )
                .bind(tenant_id)
                .fetch_all(&*self.pool)
                .await?
            }
        };

        rows.iter().map(appointment_from_row).collect()
    }

    /// Move an appointment from `from` to `to`. The guard on the
    /// current status makes concurrent transitions lose cleanly.
    /// Returns `false` if the appointment was not in `from` anymore.
    pub async fn update_appointment_status(
        &self,
        tenant_id: &str,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE appointments SET status = ?
             WHERE tenant_id = ? AND id = ? AND status = ?",
        )
        .bind(to.as_str())
        .bind(tenant_id)
        .bind(id.to_string())
        .bind(from.as_str())
        .execute(&*self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// Format a time-of-day for storage. Seconds are dropped; all
/// comparisons in this system are minute-granular.
fn format_time(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

/// Parse a stored time-of-day. Accepts `HH:MM` and `HH:MM:SS` since
/// imported data may carry seconds; seconds are dropped on read so
/// every value in the system stays minute-granular.
fn parse_time(s: &str) -> Result<NaiveTime> {
    let t = NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|e| anyhow!("invalid time of day '{}': {}", s, e))?;
    Ok(t.with_second(0).unwrap_or(t))
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| anyhow!("invalid date '{}': {}", s, e))
}

fn service_from_row(row: &SqliteRow) -> Result<Service> {
    Ok(Service {
        id: Uuid::parse_str(&row.get::<String, _>("id"))?,
        tenant_id: row.get("tenant_id"),
        name: row.get("name"),
        duration_minutes: row.get::<i64, _>("duration_minutes") as u32,
        price: row.get("price"),
        is_active: row.get::<i64, _>("is_active") != 0,
    })
}

fn appointment_from_row(row: &SqliteRow) -> Result<Appointment> {
    Ok(Appointment {
        id: Uuid::parse_str(&row.get::<String, _>("id"))?,
        tenant_id: row.get("tenant_id"),
        service_id: Uuid::parse_str(&row.get::<String, _>("service_id"))?,
        staff_id: row.get("staff_id"),
        date: parse_date(&row.get::<String, _>("date"))?,
        start_time: parse_time(&row.get::<String, _>("start_time"))?,
        end_time: parse_time(&row.get::<String, _>("end_time"))?,
        client_name: row.get("client_name"),
        client_email: row.get("client_email"),
        client_phone: row.get("client_phone"),
        price: row.get("price"),
        status: AppointmentStatus::parse(&row.get::<String, _>("status")).map_err(|e| anyhow!(e))?,
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_time_parsing_accepts_seconds() {
        assert_eq!(parse_time("09:00").unwrap(), time(9, 0));
        assert_eq!(parse_time("09:00:00").unwrap(), time(9, 0));
        assert_eq!(parse_time("17:30:15").unwrap(), time(17, 30));
        assert!(parse_time("25:00").is_err());
        assert!(parse_time("").is_err());
    }

    #[test]
    fn test_time_formatting_is_minute_granular() {
        assert_eq!(format_time(time(9, 5)), "09:05");
        assert_eq!(format_time(NaiveTime::from_hms_opt(14, 0, 30).unwrap()), "14:00");
    }

    #[tokio::test]
    async fn test_schema_and_rule_round_trip() {
        let db = DbConnection::init_test().await.unwrap();

        db.replace_opening_rules("tenant-a", &shared::OpeningRule::default_week())
            .await
            .unwrap();

        let rules = db.opening_rules("tenant-a").await.unwrap();
        assert_eq!(rules.len(), 7);
        assert!(rules[0].is_closed);
        assert_eq!(rules[1].opens_at, time(9, 0));
        assert_eq!(rules[1].closes_at, time(18, 0));

        // Other tenants are unaffected
        assert!(db.opening_rules("tenant-b").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_booked_intervals_drop_seconds_from_imported_rows() {
        let db = DbConnection::init_test().await.unwrap();

        // A row imported with seconds in its times
        sqlx::query(
            "INSERT INTO appointments
                 (id, tenant_id, service_id, staff_id, date, start_time, end_time,
                  client_name, client_email, client_phone, price, status, created_at)
             VALUES (?, ?, ?, NULL, ?, '10:00:00', '10:30:15', 'Ana', 'a@example.com', '11', 35.0,
                     'pending', '2026-08-24T10:00:00Z')",
        )
        .bind(Uuid::new_v4().to_string())
        .bind("tenant-a")
        .bind(Uuid::new_v4().to_string())
        .bind("2026-08-24")
        .execute(&*db.pool)
        .await
        .unwrap();

        // Seconds must not leak into the ledger, or the 10:30 slot
        // would be treated as overlapping
        let booked = db.booked_intervals("tenant-a", NaiveDate::from_ymd_opt(2026, 8, 24).unwrap())
            .await
            .unwrap();
        assert_eq!(booked, vec![(time(10, 0), time(10, 30))]);
    }

    #[tokio::test]
    async fn test_replace_opening_rules_overwrites() {
        let db = DbConnection::init_test().await.unwrap();
        db.replace_opening_rules("tenant-a", &shared::OpeningRule::default_week())
            .await
            .unwrap();

        let mut short_week = shared::OpeningRule::default_week();
        short_week.truncate(2);
        db.replace_opening_rules("tenant-a", &short_week).await.unwrap();

        assert_eq!(db.opening_rules("tenant-a").await.unwrap().len(), 2);
    }
}
