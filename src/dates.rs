use crate::models::TimeRange;
use chrono::{
    DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use serde::Serialize;

/// Inclusive range of calendar days making up one goal period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    /// A day belongs to the period when its day-start is not after the period
    /// end and its day-end is not before the period start.
    pub fn contains(&self, day: NaiveDate) -> bool {
        day_start(day) <= self.end_time() && day_end(day) >= self.start_time()
    }

    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn start_time(&self) -> NaiveDateTime {
        day_start(self.start)
    }

    pub fn end_time(&self) -> NaiveDateTime {
        day_end(self.end)
    }
}

pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

pub fn parse_day(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

pub fn day_string(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn local_day<Tz: TimeZone>(instant: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// UTC instant of local noon on `day`. Noon sidesteps DST gaps, which happen
/// around midnight or early morning.
pub fn local_noon<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let noon = day_start(day) + Duration::hours(12);
    tz.from_local_datetime(&noon)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&noon))
}

pub fn period_bounds(range: TimeRange, day: NaiveDate) -> Period {
    match range {
        TimeRange::Day => Period {
            start: day,
            end: day,
        },
        TimeRange::Week => {
            let start = day - Duration::days(i64::from(day.weekday().num_days_from_sunday()));
            Period {
                start,
                end: start + Duration::days(6),
            }
        }
        TimeRange::Month => {
            let start = day - Duration::days(i64::from(day.day0()));
            let len = days_in_month(day.year(), day.month());
            Period {
                start,
                end: start + Duration::days(i64::from(len) - 1),
            }
        }
        TimeRange::Year => {
            let start = day - Duration::days(i64::from(day.ordinal0()));
            let len = if is_leap_year(day.year()) { 366 } else { 365 };
            Period {
                start,
                end: start + Duration::days(len - 1),
            }
        }
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

fn day_start(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

fn day_end(day: NaiveDate) -> NaiveDateTime {
    day_start(day) + Duration::days(1) - Duration::milliseconds(1)
}
