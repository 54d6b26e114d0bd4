use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OvertimeStatus {
    Pending,
    Approved,
    Rejected,
}

/// Overtime attributed to one (user, calendar day). Created either manually
/// by an admin from HH:MM start/end strings, or automatically from a
/// completed session measured against its assigned shift. Auto-generated
/// rows carry `auto_day` (= `date`) so the `(user_id, auto_day)` unique key
/// caps them at one per user and day; `auto_day` stays NULL on manual rows,
/// which MySQL exempts from the constraint.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Overtime {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 42)]
    pub user_id: u64,

    #[schema(example = "2025-10-01", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = "Worked beyond assigned shift")]
    pub description: String,

    #[schema(example = 1.5)]
    pub total_hours: f64,

    /// Manual entry only: local "HH:MM" strings the total was derived from.
    #[schema(example = "18:00", nullable = true)]
    pub start_time: Option<String>,

    #[schema(example = "19:30", nullable = true)]
    pub end_time: Option<String>,

    /// Automatic entry only: hours past the shift window.
    #[schema(example = 1.5, nullable = true)]
    pub actual_hours: Option<f64>,

    /// Automatic entry only: the assigned shift's end.
    #[schema(example = "2025-10-01T12:00:00Z", value_type = String, format = "date-time", nullable = true)]
    pub actual_start_time: Option<DateTime<Utc>>,

    /// Automatic entry only: the session's logout.
    #[schema(example = "2025-10-01T13:30:00Z", value_type = String, format = "date-time", nullable = true)]
    pub actual_end_time: Option<DateTime<Utc>>,

    #[schema(example = "pending")]
    pub status: String,

    #[schema(example = 1, nullable = true)]
    pub approved_by: Option<u64>,

    #[schema(example = "2025-10-02T09:00:00Z", value_type = String, format = "date-time", nullable = true)]
    pub approved_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing)]
    #[schema(value_type = Option<String>)]
    pub auto_day: Option<NaiveDate>,
}
