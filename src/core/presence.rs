//! Presence aggregation: per-day attendance counts and percentages, lateness
//! flags, and department rollups, all derived from the overlap matcher's
//! expanded presence sets.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::time_record::SessionDay;
use crate::model::user::UserDim;

use super::{calendar, overlap};

/// Arriving strictly after this local time on a session's login day flags
/// the user late for that day.
pub static LATE_CUTOFF: Lazy<NaiveTime> =
    Lazy::new(|| NaiveTime::from_hms_opt(9, 15, 0).unwrap());

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DayAttendance {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub present: u64,
    pub absent: u64,
    pub late: u64,
    pub attendance_pct: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DepartmentAttendance {
    pub department: String,
    pub members: u64,
    pub present_slots: u64,
    pub attendance_pct: f64,
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Share of employees present, one decimal. Exactly 0 when there are no
/// employees; capped at 100 because sessions of since-deactivated users can
/// outnumber the active headcount.
pub fn daily_percentage(present: usize, total_employees: usize) -> f64 {
    if total_employees == 0 {
        return 0.0;
    }
    round1((present as f64 / total_employees as f64 * 100.0).min(100.0))
}

/// Earliest login time per user per day, reduced to the set of late users.
/// Lateness is judged on the session's login day only; days a session merely
/// spans into have no arrival time to judge.
pub fn late_users_by_day(
    sessions: &[SessionDay],
    from: NaiveDate,
    to: NaiveDate,
) -> BTreeMap<NaiveDate, BTreeSet<u64>> {
    let mut first_login: BTreeMap<(NaiveDate, u64), NaiveTime> = BTreeMap::new();
    for session in sessions {
        if session.login_date < from || session.login_date > to {
            continue;
        }
        first_login
            .entry((session.login_date, session.user_id))
            .and_modify(|t| *t = (*t).min(session.login_time))
            .or_insert(session.login_time);
    }

    let mut late: BTreeMap<NaiveDate, BTreeSet<u64>> = BTreeMap::new();
    for ((date, user_id), earliest) in first_login {
        if earliest > *LATE_CUTOFF {
            late.entry(date).or_default().insert(user_id);
        }
    }
    late
}

/// Per-day attendance series over every calendar day in `[from, to]`,
/// including days nobody worked.
pub fn daily_attendance(
    sessions: &[SessionDay],
    total_employees: usize,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<DayAttendance> {
    let presence = overlap::presence_by_day(sessions, from, to);
    let late = late_users_by_day(sessions, from, to);

    calendar::days_between(from, to)
        .into_iter()
        .map(|date| {
            let present = presence.get(&date).map_or(0, BTreeSet::len);
            DayAttendance {
                date,
                present: present as u64,
                absent: total_employees.saturating_sub(present) as u64,
                late: late.get(&date).map_or(0, BTreeSet::len) as u64,
                attendance_pct: daily_percentage(present, total_employees),
            }
        })
        .collect()
}

/// Arithmetic mean of the daily percentages, one decimal. Each calendar day
/// weighs the same regardless of headcount.
pub fn average_percentage(days: &[DayAttendance]) -> f64 {
    if days.is_empty() {
        return 0.0;
    }
    let sum: f64 = days.iter().map(|d| d.attendance_pct).sum();
    round1(sum / days.len() as f64)
}

/// Department rollup: a slot is one (member, day) pair, and the percentage is
/// filled slots over `members * days`. Users without a department group under
/// the sentinel label and sort like any other department.
pub fn department_attendance(
    presence: &BTreeMap<NaiveDate, BTreeSet<u64>>,
    users: &[UserDim],
    day_count: i64,
) -> Vec<DepartmentAttendance> {
    let mut members_by_dept: BTreeMap<String, Vec<u64>> = BTreeMap::new();
    for user in users {
        members_by_dept
            .entry(user.department_label().to_string())
            .or_default()
            .push(user.id);
    }

    members_by_dept
        .into_iter()
        .map(|(department, members)| {
            let present_slots: u64 = presence
                .values()
                .map(|day| members.iter().filter(|id| day.contains(id)).count() as u64)
                .sum();
            let slots = (members.len() as i64 * day_count).max(1) as f64;
            DepartmentAttendance {
                department,
                members: members.len() as u64,
                present_slots,
                attendance_pct: round1(present_slots as f64 / slots * 100.0),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::user::UNASSIGNED_DEPARTMENT;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn session_at(user_id: u64, login: NaiveDate, time: (u32, u32)) -> SessionDay {
        SessionDay {
            user_id,
            login_date: login,
            login_time: NaiveTime::from_hms_opt(time.0, time.1, 0).unwrap(),
            logout_date: Some(login),
            duration_minutes: Some(480),
        }
    }

    fn dim(id: u64, department: Option<&str>) -> UserDim {
        UserDim {
            id,
            name: format!("user-{id}"),
            department: department.map(str::to_string),
        }
    }

    #[test]
    fn daily_percentage_stays_within_bounds() {
        assert_eq!(daily_percentage(0, 10), 0.0);
        assert_eq!(daily_percentage(10, 10), 100.0);
        assert_eq!(daily_percentage(3, 9), 33.3);
        // Orphan sessions cannot push the figure past 100.
        assert_eq!(daily_percentage(12, 10), 100.0);
    }

    #[test]
    fn zero_employees_means_zero_percent_not_a_panic() {
        assert_eq!(daily_percentage(0, 0), 0.0);
        assert_eq!(daily_percentage(5, 0), 0.0);
    }

    #[test]
    fn late_flag_uses_the_earliest_login_of_the_day() {
        let day = d(2025, 10, 1);
        // Second session of the day is after the cutoff, but the 09:00
        // arrival clears the user.
        let sessions = vec![
            session_at(1, day, (9, 0)),
            session_at(1, day, (13, 0)),
            session_at(2, day, (9, 16)),
            session_at(3, day, (9, 15)),
        ];
        let late = late_users_by_day(&sessions, day, day);
        // 09:15:00 exactly is on time; the comparison is strict.
        assert_eq!(late[&day], BTreeSet::from([2]));
    }

    #[test]
    fn absent_count_never_goes_negative() {
        let day = d(2025, 10, 1);
        let sessions = vec![
            session_at(1, day, (9, 0)),
            session_at(2, day, (9, 0)),
            session_at(3, day, (9, 0)),
        ];
        let days = daily_attendance(&sessions, 2, day, day);
        assert_eq!(days[0].present, 3);
        assert_eq!(days[0].absent, 0);
    }

    #[test]
    fn series_includes_empty_days_and_averages_over_all_of_them() {
        let sessions = vec![session_at(1, d(2025, 10, 1), (9, 0))];
        let days = daily_attendance(&sessions, 2, d(2025, 10, 1), d(2025, 10, 2));
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].attendance_pct, 50.0);
        assert_eq!(days[1].present, 0);
        assert_eq!(days[1].absent, 2);
        assert_eq!(average_percentage(&days), 25.0);
    }

    #[test]
    fn department_rollup_keeps_the_unassigned_sentinel() {
        let day = d(2025, 10, 1);
        let users = vec![dim(1, Some("Engineering")), dim(2, None), dim(3, None)];
        let sessions = vec![session_at(1, day, (9, 0)), session_at(2, day, (9, 0))];
        let presence = overlap::presence_by_day(&sessions, day, day);

        let departments = department_attendance(&presence, &users, 1);
        assert_eq!(departments.len(), 2);

        let unassigned = departments
            .iter()
            .find(|d| d.department == UNASSIGNED_DEPARTMENT)
            .expect("sentinel department must be present");
        assert_eq!(unassigned.members, 2);
        assert_eq!(unassigned.present_slots, 1);
        assert_eq!(unassigned.attendance_pct, 50.0);

        let eng = departments.iter().find(|d| d.department == "Engineering").unwrap();
        assert_eq!(eng.attendance_pct, 100.0);
    }

    #[test]
    fn department_rollup_spans_multiple_days() {
        let users = vec![dim(1, Some("Support")), dim(2, Some("Support"))];
        let sessions = vec![
            session_at(1, d(2025, 10, 1), (9, 0)),
            session_at(1, d(2025, 10, 2), (9, 0)),
            session_at(2, d(2025, 10, 1), (9, 0)),
        ];
        let presence = overlap::presence_by_day(&sessions, d(2025, 10, 1), d(2025, 10, 2));
        let departments = department_attendance(&presence, &users, 2);

        // 3 filled slots out of 2 members * 2 days.
        assert_eq!(departments[0].present_slots, 3);
        assert_eq!(departments[0].attendance_pct, 75.0);
    }
}
