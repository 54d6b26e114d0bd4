//! Overtime computation.
//!
//! Two modes coexist and deliberately do not reconcile:
//!
//! * **Threshold mode** answers "how much past eight hours did each user work
//!   per day in a range" for analytics. It attributes a completed session's
//!   whole duration to its login day, so a midnight-spanning session piles
//!   onto the day it started. Read-only, never persisted.
//! * **Shift-relative mode** measures one completed session against the
//!   user's assigned shift for that day and feeds the persisted, pending
//!   overtime record. Per-day by construction, since the shift lookup is
//!   keyed to the login day.
//!
//! A multi-day session can therefore produce different numbers in the two
//! modes; both are documented approximations, kept as-is.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::model::time_record::SessionDay;

/// Flat daily cutoff for threshold-mode overtime.
pub const DAILY_THRESHOLD_MINUTES: i64 = 8 * 60;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn minutes_to_hours(minutes: i64) -> f64 {
    round2(minutes as f64 / 60.0)
}

/// Worked minutes per (user, login day) for completed sessions whose login
/// day falls inside `[from, to]`. Open sessions have no duration yet and are
/// skipped.
pub fn daily_minutes(
    sessions: &[SessionDay],
    from: NaiveDate,
    to: NaiveDate,
) -> BTreeMap<(u64, NaiveDate), i64> {
    let mut minutes: BTreeMap<(u64, NaiveDate), i64> = BTreeMap::new();
    for session in sessions {
        let Some(duration) = session.duration_minutes else {
            continue;
        };
        if session.login_date < from || session.login_date > to {
            continue;
        }
        *minutes.entry((session.user_id, session.login_date)).or_insert(0) += duration;
    }
    minutes
}

/// Threshold-mode overtime: minutes past the flat daily cutoff, per
/// (user, day). Days at or under the cutoff are omitted.
pub fn threshold_overtime(
    daily: &BTreeMap<(u64, NaiveDate), i64>,
) -> BTreeMap<(u64, NaiveDate), i64> {
    daily
        .iter()
        .filter_map(|(&key, &minutes)| {
            let over = minutes - DAILY_THRESHOLD_MINUTES;
            (over > 0).then_some((key, over))
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserOvertime {
    pub user_id: u64,
    pub overtime_minutes: i64,
    pub overtime_hours: f64,
    pub days_over_threshold: u64,
}

/// Per-user rollup of threshold-mode overtime across the range.
pub fn overtime_by_user(per_day: &BTreeMap<(u64, NaiveDate), i64>) -> Vec<UserOvertime> {
    let mut by_user: BTreeMap<u64, (i64, u64)> = BTreeMap::new();
    for (&(user_id, _), &minutes) in per_day {
        let entry = by_user.entry(user_id).or_insert((0, 0));
        entry.0 += minutes;
        entry.1 += 1;
    }
    by_user
        .into_iter()
        .map(|(user_id, (minutes, days))| UserOvertime {
            user_id,
            overtime_minutes: minutes,
            overtime_hours: minutes_to_hours(minutes),
            days_over_threshold: days,
        })
        .collect()
}

/// Shift-relative mode: minutes a completed session ran past its assigned
/// shift's duration. Never negative.
pub fn shift_overtime_minutes(
    session_minutes: i64,
    shift_start: DateTime<Utc>,
    shift_end: DateTime<Utc>,
) -> i64 {
    let shift_minutes = (shift_end - shift_start).num_minutes();
    (session_minutes - shift_minutes).max(0)
}

/// Hours between two local "HH:MM" strings for manual overtime entry. An end
/// before the start wraps past midnight.
pub fn hours_between_hhmm(start: &str, end: &str) -> Result<f64> {
    let start = NaiveTime::parse_from_str(start, "%H:%M")
        .with_context(|| format!("invalid start time {start:?}, expected HH:MM"))?;
    let end = NaiveTime::parse_from_str(end, "%H:%M")
        .with_context(|| format!("invalid end time {end:?}, expected HH:MM"))?;

    let mut minutes = (end - start).num_minutes();
    if minutes < 0 {
        minutes += 24 * 60;
    }
    Ok(round2(minutes as f64 / 60.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn completed(user_id: u64, login: NaiveDate, minutes: i64) -> SessionDay {
        SessionDay {
            user_id,
            login_date: login,
            login_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            logout_date: Some(login),
            duration_minutes: Some(minutes),
        }
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().into()
    }

    #[test]
    fn at_or_under_the_cutoff_is_zero_overtime() {
        let day = d(2025, 10, 1);
        let daily = daily_minutes(&[completed(1, day, 480), completed(2, day, 90)], day, day);
        let overtime = threshold_overtime(&daily);
        assert!(overtime.is_empty());
    }

    #[test]
    fn minutes_past_the_cutoff_count_exactly() {
        let day = d(2025, 10, 1);
        let daily = daily_minutes(&[completed(1, day, 480 + 37)], day, day);
        let overtime = threshold_overtime(&daily);
        assert_eq!(overtime[&(1, day)], 37);
    }

    #[test]
    fn split_sessions_on_one_day_accumulate_before_the_cutoff() {
        let day = d(2025, 10, 1);
        let sessions = vec![completed(1, day, 300), completed(1, day, 240)];
        let daily = daily_minutes(&sessions, day, day);
        assert_eq!(daily[&(1, day)], 540);
        assert_eq!(threshold_overtime(&daily)[&(1, day)], 60);
    }

    #[test]
    fn whole_duration_lands_on_the_login_day() {
        // 22:00 login, 10 hours across midnight: all 600 minutes attribute
        // to Oct 1, none to Oct 2. Documented approximation.
        let login = d(2025, 10, 1);
        let session = SessionDay {
            user_id: 1,
            login_date: login,
            login_time: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            logout_date: Some(d(2025, 10, 2)),
            duration_minutes: Some(600),
        };
        let daily = daily_minutes(&[session], d(2025, 10, 1), d(2025, 10, 2));
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[&(1, login)], 600);
    }

    #[test]
    fn open_sessions_are_excluded_from_threshold_mode() {
        let day = d(2025, 10, 1);
        let open = SessionDay {
            user_id: 1,
            login_date: day,
            login_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            logout_date: None,
            duration_minutes: None,
        };
        assert!(daily_minutes(&[open], day, day).is_empty());
    }

    #[test]
    fn user_rollup_sums_minutes_and_counts_days() {
        let daily = BTreeMap::from([
            ((1, d(2025, 10, 1)), 500),
            ((1, d(2025, 10, 2)), 600),
            ((2, d(2025, 10, 1)), 490),
        ]);
        let rollup = overtime_by_user(&threshold_overtime(&daily));
        assert_eq!(rollup.len(), 2);
        assert_eq!(rollup[0].user_id, 1);
        assert_eq!(rollup[0].overtime_minutes, 140);
        assert_eq!(rollup[0].days_over_threshold, 2);
        assert_eq!(rollup[0].overtime_hours, 2.33);
        assert_eq!(rollup[1].overtime_minutes, 10);
    }

    #[test]
    fn shift_relative_overtime_is_the_excess_over_the_window() {
        let start = utc("2025-10-01T09:00:00Z");
        let end = utc("2025-10-01T17:00:00Z");
        assert_eq!(shift_overtime_minutes(480, start, end), 0);
        assert_eq!(shift_overtime_minutes(525, start, end), 45);
        // Shorter than the shift is clamped to zero, not negative.
        assert_eq!(shift_overtime_minutes(300, start, end), 0);
    }

    #[test]
    fn manual_hours_wrap_past_midnight() {
        assert_eq!(hours_between_hhmm("18:00", "19:30").unwrap(), 1.5);
        assert_eq!(hours_between_hhmm("22:00", "06:00").unwrap(), 8.0);
        assert_eq!(hours_between_hhmm("09:00", "09:00").unwrap(), 0.0);
        assert!(hours_between_hhmm("25:00", "06:00").is_err());
    }
}
