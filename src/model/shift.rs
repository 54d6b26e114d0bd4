use std::ops::RangeInclusive;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ShiftType {
    Morning,
    Evening,
    Night,
}

/// Per-type validation data: the permitted local start hours (a sanity check
/// on manual entry, not a scheduling constraint) and the canonical
/// time-of-day window used by batch planning.
pub struct ShiftProfile {
    pub start_hours: RangeInclusive<u32>,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
}

impl ShiftType {
    pub fn profile(self) -> ShiftProfile {
        let (hours, start, end) = match self {
            ShiftType::Morning => (5..=8, (6, 0), (14, 0)),
            ShiftType::Evening => (13..=16, (14, 0), (22, 0)),
            // Night windows cross midnight; the window end lands on the
            // following calendar day.
            ShiftType::Night => (21..=23, (22, 0), (6, 0)),
        };
        ShiftProfile {
            start_hours: hours,
            window_start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            window_end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        }
    }

    /// The canonical window spills into the next day when it wraps midnight.
    pub fn window_crosses_midnight(self) -> bool {
        let p = self.profile();
        p.window_end <= p.window_start
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ShiftStatus {
    Assigned,
    Confirmed,
    Completed,
    Cancelled,
}

impl ShiftStatus {
    /// Only `assigned` can transition; the other three are terminal.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ShiftStatus::Assigned)
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Shift {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 42)]
    pub user_id: u64,

    #[schema(example = "morning")]
    pub shift_type: String,

    #[schema(example = "2025-10-01T00:00:00Z", value_type = String, format = "date-time")]
    pub start_time: DateTime<Utc>,

    #[schema(example = "2025-10-01T08:00:00Z", value_type = String, format = "date-time")]
    pub end_time: DateTime<Utc>,

    /// Local calendar day of `start_time`, captured at assignment. The
    /// per-day lookup key for shift-relative overtime.
    #[schema(example = "2025-10-01", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = 1)]
    pub assigned_by: u64,

    #[schema(example = "assigned")]
    pub status: String,

    #[schema(example = "Covers the release window", nullable = true)]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn profile_table_matches_documented_hours() {
        assert_eq!(ShiftType::Morning.profile().start_hours, 5..=8);
        assert_eq!(ShiftType::Evening.profile().start_hours, 13..=16);
        assert_eq!(ShiftType::Night.profile().start_hours, 21..=23);
    }

    #[test]
    fn night_window_wraps_midnight() {
        assert!(ShiftType::Night.window_crosses_midnight());
        assert!(!ShiftType::Morning.window_crosses_midnight());
        assert!(!ShiftType::Evening.window_crosses_midnight());
    }

    #[test]
    fn shift_type_round_trips_through_strings() {
        assert_eq!(ShiftType::from_str("night").unwrap(), ShiftType::Night);
        assert_eq!(ShiftType::Evening.to_string(), "evening");
        assert_eq!(ShiftStatus::from_str("cancelled").unwrap(), ShiftStatus::Cancelled);
    }
}
