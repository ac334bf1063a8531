//! Visible cells of each picker view.
//!
//! Every function reads the reference in the configured zone and builds
//! each cell from its wall-clock time through [`Zone::normalize`], so a
//! page never depends on the offset the reference happened to carry.
//!
//! [`Zone::normalize`]: crate::zone::Zone::normalize

use chrono::{
  Datelike,
  Duration,
  NaiveDate,
  Timelike,
  Weekday
};

use crate::granularity::Granularity;
use crate::settings::CalendarSettings;
use crate::zone::Instant;

const YEARS_PER_PAGE: i32 = 12;
const DAYS_PER_WEEK: i64 = 7;
const MAX_WEEKS: usize = 6;

/// Cells of `granularity`'s view around `reference`.
#[must_use]
pub fn visible(
  granularity: Granularity,
  reference: &Instant,
  settings: &CalendarSettings
) -> Vec<Instant> {
  match granularity {
    | Granularity::Year => {
      visible_years(reference, settings)
    }
    | Granularity::Month => {
      visible_months(reference, settings)
    }
    | Granularity::Date => {
      visible_days(reference, settings)
    }
    | Granularity::Hours => {
      visible_hours(reference, settings)
    }
    | Granularity::Minutes => {
      visible_minutes(
        reference,
        settings.minute_step(),
        settings
      )
    }
  }
}

/// First year of the decade containing `year`.
#[must_use]
pub fn decade_start(year: i32) -> i32 {
  year - year.rem_euclid(10)
}

/// January 1st of twelve years starting at the reference's decade.
#[must_use]
pub fn visible_years(
  reference: &Instant,
  settings: &CalendarSettings
) -> Vec<Instant> {
  let local =
    settings.zone.to_zone(reference);
  let first = decade_start(local.year());

  (0..YEARS_PER_PAGE)
    .filter_map(|offset| {
      NaiveDate::from_ymd_opt(
        first + offset,
        1,
        1
      )
    })
    .filter_map(|date| {
      at(date, 0, 0, settings)
    })
    .collect()
}

/// First day of every month of the reference's year.
#[must_use]
pub fn visible_months(
  reference: &Instant,
  settings: &CalendarSettings
) -> Vec<Instant> {
  let year = settings
    .zone
    .to_zone(reference)
    .year();

  (1..=12)
    .filter_map(|month| {
      NaiveDate::from_ymd_opt(
        year, month, 1
      )
    })
    .filter_map(|date| {
      at(date, 0, 0, settings)
    })
    .collect()
}

/// Whole weeks covering the reference's month, each row starting on
/// `settings.first_day`.
///
/// Rows are emitted from the week holding the 1st until a row would
/// start after the month, at most six rows.
#[must_use]
pub fn visible_days(
  reference: &Instant,
  settings: &CalendarSettings
) -> Vec<Instant> {
  let local =
    settings.zone.to_zone(reference);
  let target =
    (local.year(), local.month());
  let Some(first) =
    NaiveDate::from_ymd_opt(
      target.0, target.1, 1
    )
  else {
    return vec![];
  };

  let back = days_since(
    first.weekday(),
    settings.first_day
  );
  let mut week_start = first
    .checked_sub_signed(Duration::days(
      back
    ))
    .unwrap_or(first);

  let mut days = Vec::with_capacity(
    MAX_WEEKS * 7
  );
  for _ in 0..MAX_WEEKS {
    if (
      week_start.year(),
      week_start.month()
    ) > target
    {
      break;
    }
    days.extend(
      days_of_week(week_start, settings)
    );
    match week_start.checked_add_signed(
      Duration::days(DAYS_PER_WEEK)
    ) {
      | Some(next) => week_start = next,
      | None => break
    }
  }

  tracing::trace!(
    year = target.0,
    month = target.1,
    days = days.len(),
    "computed visible days"
  );
  days
}

/// Midnight of seven consecutive days starting at `week_start`.
#[must_use]
pub fn days_of_week(
  week_start: NaiveDate,
  settings: &CalendarSettings
) -> Vec<Instant> {
  (0..DAYS_PER_WEEK)
    .filter_map(|offset| {
      week_start.checked_add_signed(
        Duration::days(offset)
      )
    })
    .filter_map(|date| {
      at(date, 0, 0, settings)
    })
    .collect()
}

/// The seven weekdays in display order.
#[must_use]
pub fn weekday_order(
  settings: &CalendarSettings
) -> Vec<Weekday> {
  std::iter::successors(
    Some(settings.first_day),
    |day| Some(day.succ())
  )
  .take(7)
  .collect()
}

/// Every hour of the reference's day.
#[must_use]
pub fn visible_hours(
  reference: &Instant,
  settings: &CalendarSettings
) -> Vec<Instant> {
  let date = settings
    .zone
    .to_zone(reference)
    .date_naive();

  (0..24)
    .filter_map(|hour| {
      at(date, hour, 0, settings)
    })
    .collect()
}

/// Minutes `0, step, 2*step, ..` of the reference's hour.
#[must_use]
pub fn visible_minutes(
  reference: &Instant,
  step: u32,
  settings: &CalendarSettings
) -> Vec<Instant> {
  let local =
    settings.zone.to_zone(reference);
  let date = local.date_naive();
  let hour = local.hour();
  let step = step.max(1) as usize;

  (0..60)
    .step_by(step)
    .filter_map(|minute| {
      at(date, hour, minute, settings)
    })
    .collect()
}

fn at(
  date: NaiveDate,
  hour: u32,
  minute: u32,
  settings: &CalendarSettings
) -> Option<Instant> {
  date
    .and_hms_opt(hour, minute, 0)
    .map(|local| {
      settings.zone.normalize(local)
    })
}

fn days_since(
  day: Weekday,
  first_day: Weekday
) -> i64 {
  let day =
    i64::from(day.num_days_from_sunday());
  let first = i64::from(
    first_day.num_days_from_sunday()
  );
  (7 + day - first) % 7
}
