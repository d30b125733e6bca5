//! Absolute day/hour distances between naive or zoned instants.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};

/// Anything reducible to a civil date for whole-day comparisons.
pub trait AsCivilDate {
    fn civil_date(&self) -> NaiveDate;
}

impl AsCivilDate for NaiveDate {
    fn civil_date(&self) -> NaiveDate {
        *self
    }
}

impl AsCivilDate for NaiveDateTime {
    fn civil_date(&self) -> NaiveDate {
        self.date()
    }
}

impl AsCivilDate for DateTime<FixedOffset> {
    fn civil_date(&self) -> NaiveDate {
        self.naive_local().date()
    }
}

/// Absolute whole-day difference. Any time-of-day component is truncated
/// to its civil date before subtracting.
pub fn days_between<A: AsCivilDate, B: AsCivilDate>(a: &A, b: &B) -> i64 {
    (a.civil_date() - b.civil_date()).num_days().abs()
}

/// Absolute difference in hours (a real number) between two zoned instants.
pub fn hours_between(a: &DateTime<FixedOffset>, b: &DateTime<FixedOffset>) -> f64 {
    (a.timestamp() - b.timestamp()).abs() as f64 / 3600.0
}

/// Lifts a civil date to start-of-day in the given instant's zone, then
/// returns the absolute hour difference against that instant. This is
/// how phases 2 and 4 compare a settlement's civil date against a
/// zoned transaction timestamp.
pub fn hours_between_date_and_instant(date: NaiveDate, instant: &DateTime<FixedOffset>) -> f64 {
    let midnight = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
    let lifted = instant.timezone().from_local_datetime(&midnight).single()
        .unwrap_or_else(|| DateTime::<FixedOffset>::from_naive_utc_and_offset(midnight, *instant.offset()));
    hours_between(&lifted, instant)
}
