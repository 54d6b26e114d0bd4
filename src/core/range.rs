//! Named date-range buckets for analytics and reports.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DateRange {
    Today,
    ThisWeek,
    #[default]
    ThisMonth,
    LastMonth,
    ThisYear,
}

impl DateRange {
    /// Wire keys are forgiving: a missing or unrecognized key resolves to the
    /// default bucket instead of an error.
    pub fn parse_or_default(key: Option<&str>) -> Self {
        key.and_then(|k| k.parse().ok()).unwrap_or_default()
    }
}

/// A resolved bucket: inclusive local calendar days plus the bucket label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct RangeWindow {
    pub range: DateRange,
    #[schema(value_type = String, format = "date")]
    pub from: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub to: NaiveDate,
}

impl RangeWindow {
    /// Resolves a bucket against the local calendar day `today`. Weeks are
    /// ISO weeks (Monday through Sunday), not rolling 7-day windows.
    pub fn resolve(range: DateRange, today: NaiveDate) -> RangeWindow {
        let (from, to) = match range {
            DateRange::Today => (today, today),
            DateRange::ThisWeek => {
                let monday =
                    today - Duration::days(today.weekday().num_days_from_monday() as i64);
                (monday, monday + Duration::days(6))
            }
            DateRange::ThisMonth => (first_of_month(today), last_of_month(today)),
            DateRange::LastMonth => {
                let last = first_of_month(today).pred_opt().unwrap();
                (first_of_month(last), last)
            }
            DateRange::ThisYear => (
                NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap(),
            ),
        };
        RangeWindow { range, from, to }
    }

    pub fn day_count(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }
}

fn first_of_month(d: NaiveDate) -> NaiveDate {
    d.with_day(1).unwrap()
}

fn last_of_month(d: NaiveDate) -> NaiveDate {
    let next_month = if d.month() == 12 {
        NaiveDate::from_ymd_opt(d.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(d.year(), d.month() + 1, 1)
    };
    next_month.unwrap().pred_opt().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn this_week_on_a_wednesday_is_monday_through_sunday() {
        // 2025-10-08 is a Wednesday.
        let window = RangeWindow::resolve(DateRange::ThisWeek, d(2025, 10, 8));
        assert_eq!(window.from, d(2025, 10, 6));
        assert_eq!(window.to, d(2025, 10, 12));
        assert_eq!(window.day_count(), 7);
    }

    #[test]
    fn this_week_on_a_monday_starts_that_day() {
        let window = RangeWindow::resolve(DateRange::ThisWeek, d(2025, 10, 6));
        assert_eq!(window.from, d(2025, 10, 6));
        assert_eq!(window.to, d(2025, 10, 12));
    }

    #[test]
    fn this_month_covers_the_calendar_month() {
        let window = RangeWindow::resolve(DateRange::ThisMonth, d(2024, 2, 14));
        assert_eq!(window.from, d(2024, 2, 1));
        assert_eq!(window.to, d(2024, 2, 29));
    }

    #[test]
    fn last_month_crosses_the_year_boundary() {
        let window = RangeWindow::resolve(DateRange::LastMonth, d(2025, 1, 15));
        assert_eq!(window.from, d(2024, 12, 1));
        assert_eq!(window.to, d(2024, 12, 31));
    }

    #[test]
    fn this_year_runs_january_through_december() {
        let window = RangeWindow::resolve(DateRange::ThisYear, d(2025, 6, 1));
        assert_eq!(window.from, d(2025, 1, 1));
        assert_eq!(window.to, d(2025, 12, 31));
        assert_eq!(window.day_count(), 365);
    }

    #[test]
    fn today_is_a_single_day() {
        let window = RangeWindow::resolve(DateRange::Today, d(2025, 10, 5));
        assert_eq!(window.from, window.to);
        assert_eq!(window.day_count(), 1);
    }

    #[test]
    fn unrecognized_keys_fall_back_to_the_default_bucket() {
        assert_eq!(DateRange::parse_or_default(Some("this_week")), DateRange::ThisWeek);
        assert_eq!(DateRange::parse_or_default(Some("fortnight")), DateRange::ThisMonth);
        assert_eq!(DateRange::parse_or_default(None), DateRange::ThisMonth);
    }
}
