//! Granularity-aware equality.
//!
//! Each predicate compares calendar fields as carried by the instants'
//! own offsets, so both sides should be expressed in the same zone.
//! Every finer predicate requires the coarser one to hold.

use chrono::{Datelike, Timelike};

use crate::granularity::Granularity;
use crate::zone::Instant;

pub fn same_year(a: &Instant, b: &Instant) -> bool {
    a.year() == b.year()
}

pub fn same_month(a: &Instant, b: &Instant) -> bool {
    same_year(a, b) && a.month() == b.month()
}

pub fn same_day(a: &Instant, b: &Instant) -> bool {
    same_month(a, b) && a.day() == b.day()
}

pub fn same_hour(a: &Instant, b: &Instant) -> bool {
    same_day(a, b) && a.hour() == b.hour()
}

pub fn same_minute(a: &Instant, b: &Instant) -> bool {
    same_hour(a, b) && a.minute() == b.minute()
}

/// Same hour and same `step`-minute bucket. A zero step counts as one.
pub fn same_minute_bucket(a: &Instant, b: &Instant, step: u32) -> bool {
    let step = step.max(1);
    same_hour(a, b) && a.minute() / step == b.minute() / step
}

/// Equality at `granularity`, minutes compared exactly.
pub fn same_unit(granularity: Granularity, a: &Instant, b: &Instant) -> bool {
    match granularity {
        Granularity::Year => same_year(a, b),
        Granularity::Month => same_month(a, b),
        Granularity::Date => same_day(a, b),
        Granularity::Hours => same_hour(a, b),
        Granularity::Minutes => same_minute(a, b),
    }
}

/// Whether `a` falls in the grid cell of `b`; minutes use `step` buckets.
pub fn same_cell(granularity: Granularity, a: &Instant, b: &Instant, step: u32) -> bool {
    match granularity {
        Granularity::Minutes => same_minute_bucket(a, b, step),
        other => same_unit(other, a, b),
    }
}
