use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
    Unpaid,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Leave {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 42)]
    pub user_id: u64,

    /// Snapshot of the requester's department at request time.
    #[schema(example = "Engineering", nullable = true)]
    pub department: Option<String>,

    #[schema(example = "sick")]
    pub leave_type: String,

    #[schema(example = "2025-10-06", value_type = String, format = "date")]
    pub start_date: NaiveDate,

    #[schema(example = "2025-10-08", value_type = String, format = "date")]
    pub end_date: NaiveDate,

    /// Inclusive day count, derived once at create.
    #[schema(example = 3)]
    pub total_days: i64,

    #[schema(example = "pending")]
    pub status: String,

    #[schema(example = "2025-10-01T00:00:00Z", value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}
