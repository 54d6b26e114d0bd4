//! Local-day calendar for the configured time zone.
//!
//! Session rows cache their local calendar fields at write time through
//! [`local_fields`]; nothing ever derives them from the stored instants
//! afterwards. Changing the configured zone therefore leaves historical rows
//! keyed to the old zone — an accepted limitation of the capture-once model.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Local calendar snapshot of one instant, captured once when the instant is
/// recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFields {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub day_name: String,
}

pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

pub fn local_time(instant: DateTime<Utc>, tz: Tz) -> NaiveTime {
    instant.with_timezone(&tz).time()
}

pub fn local_fields(instant: DateTime<Utc>, tz: Tz) -> LocalFields {
    let local = instant.with_timezone(&tz);
    LocalFields {
        date: local.date_naive(),
        time: local.time(),
        day_name: local.format("%A").to_string(),
    }
}

/// First and last instant of the given local calendar day, as UTC bounds for
/// absolute-timestamp queries. Zones with DST may lack a literal midnight or
/// 23:59:59; the nearest valid instant on the correct side is used.
pub fn day_bounds(date: NaiveDate, tz: Tz) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let start = tz
        .from_local_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
        .earliest()
        .with_context(|| format!("no start-of-day instant for {date} in {tz}"))?;
    let end = tz
        .from_local_datetime(&date.and_hms_opt(23, 59, 59).unwrap())
        .latest()
        .with_context(|| format!("no end-of-day instant for {date} in {tz}"))?;
    Ok((start.with_timezone(&Utc), end.with_timezone(&Utc)))
}

/// Every calendar day in the inclusive range, in order. Empty when
/// `from > to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut day = from;
    while day <= to {
        days.push(day);
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Dhaka;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().into()
    }

    #[test]
    fn local_date_rolls_past_utc_midnight() {
        // 19:30 UTC is already 01:30 the next day in Dhaka (+06:00).
        let instant = utc("2025-09-30T19:30:00Z");
        assert_eq!(
            local_date(instant, Dhaka),
            NaiveDate::from_ymd_opt(2025, 10, 1).unwrap()
        );
        assert_eq!(
            local_time(instant, Dhaka),
            NaiveTime::from_hms_opt(1, 30, 0).unwrap()
        );
    }

    #[test]
    fn local_fields_carry_the_weekday_name() {
        let fields = local_fields(utc("2025-10-01T03:05:00Z"), Dhaka);
        assert_eq!(fields.date, NaiveDate::from_ymd_opt(2025, 10, 1).unwrap());
        assert_eq!(fields.day_name, "Wednesday");
    }

    #[test]
    fn day_bounds_cover_the_whole_local_day() {
        let day = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        let (start, end) = day_bounds(day, Dhaka).unwrap();
        assert_eq!(start, utc("2025-09-30T18:00:00Z"));
        assert_eq!(end, utc("2025-10-01T17:59:59Z"));
        assert_eq!(local_date(start, Dhaka), day);
        assert_eq!(local_date(end, Dhaka), day);
    }

    #[test]
    fn days_between_is_inclusive_and_ordered() {
        let from = NaiveDate::from_ymd_opt(2025, 9, 29).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 10, 2).unwrap();
        let days = days_between(from, to);
        assert_eq!(days.len(), 4);
        assert_eq!(days[0], from);
        assert_eq!(days[3], to);
        assert!(days_between(to, from).is_empty());
    }
}
