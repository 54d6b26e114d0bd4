//! Day-overlap matching for attendance sessions.
//!
//! A session occupies the inclusive range of local calendar days from its
//! login day through its logout day; a session without a logout is open and
//! occupies through the end of any queried range. Expansion steps calendar
//! days, not fractions: one minute inside a day is full presence for it.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::model::time_record::SessionDay;

/// The occupied-day interval of `session` intersects `[from, to]`.
pub fn session_matches(session: &SessionDay, from: NaiveDate, to: NaiveDate) -> bool {
    session.login_date <= to && session.logout_date.is_none_or(|d| d >= from)
}

/// Expands matched sessions into per-day distinct presence sets, clipped to
/// `[from, to]`. The ordered map is the explicit form of what the original
/// system expressed as a store-side aggregation stage.
pub fn presence_by_day(
    sessions: &[SessionDay],
    from: NaiveDate,
    to: NaiveDate,
) -> BTreeMap<NaiveDate, BTreeSet<u64>> {
    let mut presence: BTreeMap<NaiveDate, BTreeSet<u64>> = BTreeMap::new();
    for session in sessions {
        if !session_matches(session, from, to) {
            continue;
        }
        let first = session.login_date.max(from);
        let last = session.logout_date.unwrap_or(to).min(to);
        let mut day = first;
        while day <= last {
            presence.entry(day).or_default().insert(session.user_id);
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
    }
    presence
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn session(user_id: u64, login: NaiveDate, logout: Option<NaiveDate>) -> SessionDay {
        SessionDay {
            user_id,
            login_date: login,
            login_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            logout_date: logout,
            duration_minutes: logout.map(|_| 480),
        }
    }

    #[test]
    fn session_spanning_three_days_is_present_on_all_three() {
        let sessions = vec![session(7, d(2025, 9, 30), Some(d(2025, 10, 2)))];
        let presence = presence_by_day(&sessions, d(2025, 9, 30), d(2025, 10, 2));

        assert_eq!(presence.len(), 3);
        for day in [d(2025, 9, 30), d(2025, 10, 1), d(2025, 10, 2)] {
            assert!(presence[&day].contains(&7), "missing presence on {day}");
        }
    }

    #[test]
    fn open_session_counts_through_the_end_of_the_range() {
        // Started days before the queried window and never logged out.
        let sessions = vec![session(3, d(2025, 10, 1), None)];
        let today = d(2025, 10, 5);
        let presence = presence_by_day(&sessions, today, today);

        assert_eq!(presence[&today], BTreeSet::from([3]));
    }

    #[test]
    fn open_session_matches_any_range_ending_after_login() {
        let old = session(1, d(2020, 1, 1), None);
        assert!(session_matches(&old, d(2025, 10, 1), d(2025, 10, 31)));
        // But not a range that ends before it began.
        assert!(!session_matches(&old, d(2019, 1, 1), d(2019, 12, 31)));
    }

    #[test]
    fn closed_session_outside_the_range_does_not_match() {
        let done = session(1, d(2025, 9, 1), Some(d(2025, 9, 2)));
        assert!(!session_matches(&done, d(2025, 9, 10), d(2025, 9, 20)));
    }

    #[test]
    fn expansion_is_clipped_to_the_queried_range() {
        let sessions = vec![session(5, d(2025, 9, 28), Some(d(2025, 10, 4)))];
        let from = d(2025, 9, 30);
        let to = d(2025, 10, 2);
        let presence = presence_by_day(&sessions, from, to);

        assert!(!presence.is_empty());
        assert!(presence.keys().all(|day| *day >= from && *day <= to));
        assert_eq!(presence.len(), 3);
    }

    #[test]
    fn distinct_users_are_collected_per_day() {
        let day = d(2025, 10, 1);
        let sessions = vec![
            session(1, day, Some(day)),
            session(1, day, Some(day)),
            session(2, day, None),
        ];
        let presence = presence_by_day(&sessions, day, day);
        assert_eq!(presence[&day], BTreeSet::from([1, 2]));
    }
}
