//! Shift planning.
//!
//! A strategy selector picks one pure planning function; both produce a
//! [`Plan`] the assignment handler consumes uniformly. Validation problems
//! come back as [`Plan::Rejected`] with a caller-facing reason, not as
//! errors.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use super::calendar;
use crate::model::shift::ShiftType;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PlanStrategy {
    /// One shift from the caller's explicit start and end instants.
    #[default]
    Single,
    /// Seven shifts on the type's canonical window, Monday through Sunday of
    /// the week containing the reference instant.
    BatchWeekly,
}

/// One plannable shift window plus its cached local day, the per-day lookup
/// key for shift-relative overtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanItem {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Single(PlanItem),
    Batch(Vec<PlanItem>),
    Rejected { reason: String },
}

pub fn build_plan(
    strategy: PlanStrategy,
    shift_type: ShiftType,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    tz: Tz,
) -> Plan {
    match strategy {
        PlanStrategy::Single => plan_single(shift_type, start, end, tz),
        PlanStrategy::BatchWeekly => {
            plan_batch_weekly(shift_type, calendar::local_date(start, tz), tz)
        }
    }
}

/// Validates the caller's window: end after start, and the local start hour
/// inside the type's permitted range.
pub fn plan_single(
    shift_type: ShiftType,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    tz: Tz,
) -> Plan {
    if end <= start {
        return Plan::Rejected {
            reason: "shift end time must be after its start time".to_string(),
        };
    }
    let local_start = calendar::local_time(start, tz);
    let hours = shift_type.profile().start_hours;
    if !hours.contains(&local_start.hour()) {
        return Plan::Rejected {
            reason: format!(
                "{shift_type} shifts must start between {:02}:00 and {:02}:59 local time",
                hours.start(),
                hours.end()
            ),
        };
    }
    Plan::Single(PlanItem {
        start,
        end,
        date: calendar::local_date(start, tz),
    })
}

/// Seven canonical-window shifts covering the ISO week (Monday through
/// Sunday) that contains `week_of`. A night window's end instant lands on
/// the following local day.
pub fn plan_batch_weekly(shift_type: ShiftType, week_of: NaiveDate, tz: Tz) -> Plan {
    let monday = week_of - Duration::days(week_of.weekday().num_days_from_monday() as i64);
    let profile = shift_type.profile();
    let wraps = shift_type.window_crosses_midnight();

    let mut items = Vec::with_capacity(7);
    for offset in 0..7 {
        let day = monday + Duration::days(offset);
        let end_day = if wraps { day + Duration::days(1) } else { day };
        let (Some(start), Some(end)) = (
            local_instant(day, profile.window_start, tz),
            local_instant(end_day, profile.window_end, tz),
        ) else {
            return Plan::Rejected {
                reason: format!("{shift_type} window does not exist on {day} in {tz}"),
            };
        };
        items.push(PlanItem { start, end, date: day });
    }
    Plan::Batch(items)
}

// Local-to-UTC for a literal wall-clock time; None in a DST gap.
fn local_instant(day: NaiveDate, time: NaiveTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&day.and_time(time))
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Dhaka;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().into()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn single_plan_caches_the_local_day() {
        // 00:30 UTC is 06:30 in Dhaka, inside the morning start range.
        let start = utc("2025-10-01T00:30:00Z");
        let end = utc("2025-10-01T08:00:00Z");
        match plan_single(ShiftType::Morning, start, end, Dhaka) {
            Plan::Single(item) => {
                assert_eq!(item.start, start);
                assert_eq!(item.date, d(2025, 10, 1));
            }
            other => panic!("expected a single plan, got {other:?}"),
        }
    }

    #[test]
    fn start_hour_outside_the_profile_is_rejected() {
        // 06:00 UTC is 12:00 in Dhaka, outside the morning range 05..=08.
        let plan = plan_single(
            ShiftType::Morning,
            utc("2025-10-01T06:00:00Z"),
            utc("2025-10-01T12:00:00Z"),
            Dhaka,
        );
        match plan {
            Plan::Rejected { reason } => assert!(reason.contains("morning")),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn inverted_window_is_rejected() {
        let plan = plan_single(
            ShiftType::Evening,
            utc("2025-10-01T10:00:00Z"),
            utc("2025-10-01T10:00:00Z"),
            Dhaka,
        );
        assert!(matches!(plan, Plan::Rejected { .. }));
    }

    #[test]
    fn batch_weekly_covers_monday_through_sunday() {
        // 2025-10-08 is a Wednesday; the week is Oct 6..=12.
        let plan = plan_batch_weekly(ShiftType::Morning, d(2025, 10, 8), Dhaka);
        let Plan::Batch(items) = plan else {
            panic!("expected a batch plan");
        };
        assert_eq!(items.len(), 7);
        assert_eq!(items[0].date, d(2025, 10, 6));
        assert_eq!(items[6].date, d(2025, 10, 12));
        // Monday 06:00 Dhaka is Monday 00:00 UTC.
        assert_eq!(items[0].start, utc("2025-10-06T00:00:00Z"));
        assert_eq!(items[0].end, utc("2025-10-06T08:00:00Z"));
    }

    #[test]
    fn night_batch_ends_on_the_next_local_day() {
        let plan = plan_batch_weekly(ShiftType::Night, d(2025, 10, 6), Dhaka);
        let Plan::Batch(items) = plan else {
            panic!("expected a batch plan");
        };
        for item in &items {
            assert_eq!(item.end - item.start, Duration::hours(8));
            assert_eq!(
                calendar::local_date(item.end, Dhaka),
                item.date + Duration::days(1)
            );
        }
        // Attribution day stays the start day.
        assert_eq!(items[0].date, d(2025, 10, 6));
    }

    #[test]
    fn dispatcher_routes_by_strategy() {
        let start = utc("2025-10-01T00:30:00Z");
        let end = utc("2025-10-01T08:00:00Z");
        let single = build_plan(PlanStrategy::Single, ShiftType::Morning, start, end, Dhaka);
        assert!(matches!(single, Plan::Single(_)));
        let batch = build_plan(PlanStrategy::BatchWeekly, ShiftType::Morning, start, end, Dhaka);
        assert!(matches!(batch, Plan::Batch(items) if items.len() == 7));
    }
}
