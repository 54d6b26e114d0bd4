use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One attendance session: opened at check-in, closed (once) at check-out,
/// never mutated afterwards. The local calendar fields are captured from the
/// configured time zone at the moment each instant is recorded and are the
/// basis for all day matching; they are never recomputed from the absolute
/// timestamps.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct TimeRecord {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 42)]
    pub user_id: u64,

    #[schema(example = "2025-10-01T03:05:00Z", value_type = String, format = "date-time")]
    pub login_at: DateTime<Utc>,

    /// NULL while the session is still open.
    #[schema(example = "2025-10-01T12:10:00Z", value_type = String, format = "date-time", nullable = true)]
    pub logout_at: Option<DateTime<Utc>>,

    #[schema(example = "2025-10-01", value_type = String, format = "date")]
    pub login_date: NaiveDate,

    #[schema(example = "09:05:00", value_type = String)]
    pub login_time: NaiveTime,

    #[schema(example = "Wednesday")]
    pub login_day: String,

    #[schema(example = "2025-10-01", value_type = String, format = "date", nullable = true)]
    pub logout_date: Option<NaiveDate>,

    #[schema(example = "18:10:00", value_type = String, nullable = true)]
    pub logout_time: Option<NaiveTime>,

    #[schema(example = "Asia/Dhaka")]
    pub timezone: String,

    /// Rounded whole minutes between login and logout, filled only at logout.
    #[schema(example = 545, nullable = true)]
    pub duration_minutes: Option<i64>,
}

/// The slice of a session the analytics core works on. Fetched with the
/// overlap prefilter and fed to the pure matching/aggregation functions.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionDay {
    pub user_id: u64,
    pub login_date: NaiveDate,
    pub login_time: NaiveTime,
    pub logout_date: Option<NaiveDate>,
    pub duration_minutes: Option<i64>,
}
