use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{
  DateTime,
  Duration,
  FixedOffset,
  Local,
  LocalResult,
  NaiveDateTime,
  TimeZone,
  Utc
};
use chrono_tz::Tz;

/// A point in time carrying the UTC offset that was effective in the
/// configured zone when it was produced.
pub type Instant = DateTime<FixedOffset>;

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub enum Zone {
  /// The host's local zone.
  #[default]
  Local,
  Named(Tz)
}

impl Zone {
  #[must_use]
  pub fn now(&self) -> Instant {
    self.at_utc(Utc::now().naive_utc())
  }

  /// Re-expresses `instant` with the offset effective in this zone.
  #[must_use]
  pub fn to_zone(
    &self,
    instant: &Instant
  ) -> Instant {
    self.at_utc(instant.naive_utc())
  }

  #[must_use]
  pub fn at_utc(
    &self,
    utc: NaiveDateTime
  ) -> Instant {
    match self {
      | Zone::Local => Local
        .from_utc_datetime(&utc)
        .fixed_offset(),
      | Zone::Named(tz) => tz
        .from_utc_datetime(&utc)
        .fixed_offset()
    }
  }

  fn resolve_local(
    &self,
    local: &NaiveDateTime
  ) -> LocalResult<Instant> {
    match self {
      | Zone::Local => Local
        .from_local_datetime(local)
        .map(|dt| dt.fixed_offset()),
      | Zone::Named(tz) => tz
        .from_local_datetime(local)
        .map(|dt| dt.fixed_offset())
    }
  }

  /// Builds the instant for a wall-clock time in this zone.
  ///
  /// Ambiguous times (clocks turned back) resolve to the earliest
  /// instant. Times inside a gap (clocks turned forward) are built with
  /// the offset in effect before the gap and then re-read with the
  /// offset effective at the result, so 02:30 in a one hour gap lands
  /// on 03:30. Normalizing the wall-clock time of a result yields the
  /// same result.
  #[must_use]
  pub fn normalize(
    &self,
    local: NaiveDateTime
  ) -> Instant {
    match self.resolve_local(&local) {
      | LocalResult::Single(dt) => dt,
      | LocalResult::Ambiguous(
        first,
        second
      ) => {
        tracing::trace!(
          local = %local,
          first = %first,
          second = %second,
          "ambiguous local time; using earliest"
        );
        first.min(second)
      }
      | LocalResult::None => {
        let day_before = local
          .checked_sub_signed(
            Duration::days(1)
          )
          .unwrap_or(local);
        let before = self
          .at_utc(day_before)
          .offset()
          .local_minus_utc();
        let utc = local
          .checked_sub_signed(
            Duration::seconds(
              i64::from(before)
            )
          )
          .unwrap_or(local);
        let corrected =
          self.at_utc(utc);
        tracing::trace!(
          local = %local,
          corrected = %corrected,
          "local time falls in a gap; moved forward"
        );
        corrected
      }
    }
  }
}

impl FromStr for Zone {
  type Err = anyhow::Error;

  fn from_str(
    raw: &str
  ) -> Result<Self, Self::Err> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
      || trimmed
        .eq_ignore_ascii_case("local")
    {
      return Ok(Zone::Local);
    }

    trimmed
      .parse::<Tz>()
      .map(Zone::Named)
      .map_err(|err| {
        anyhow!(
          "unknown timezone id \
           {trimmed:?}: {err}"
        )
      })
  }
}

impl fmt::Display for Zone {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | Zone::Local => f.write_str("local"),
      | Zone::Named(tz) => {
        f.write_str(tz.name())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    Timelike
  };

  use super::Zone;

  fn new_york() -> Zone {
    "America/New_York"
      .parse()
      .expect("known zone")
  }

  #[test]
  fn parses_local_and_named_zones() {
    assert_eq!(
      "".parse::<Zone>().expect("empty"),
      Zone::Local
    );
    assert_eq!(
      "LOCAL".parse::<Zone>().expect("local"),
      Zone::Local
    );
    assert_eq!(
      new_york().to_string(),
      "America/New_York"
    );
    assert!("Mars/Olympus".parse::<Zone>().is_err());
  }

  #[test]
  fn gap_moves_forward_by_the_missing_hour() {
    let local = NaiveDate::from_ymd_opt(2024, 3, 10)
      .and_then(|d| d.and_hms_opt(2, 30, 0))
      .expect("valid local");
    let instant = new_york().normalize(local);
    assert_eq!(instant.hour(), 3);
    assert_eq!(instant.minute(), 30);
    assert_eq!(instant.offset().local_minus_utc(), -4 * 3600);
  }

  #[test]
  fn ambiguous_time_resolves_to_earliest() {
    let local = NaiveDate::from_ymd_opt(2024, 11, 3)
      .and_then(|d| d.and_hms_opt(1, 30, 0))
      .expect("valid local");
    let instant = new_york().normalize(local);
    assert_eq!(instant.hour(), 1);
    assert_eq!(instant.offset().local_minus_utc(), -4 * 3600);
  }

  #[test]
  fn normalize_is_idempotent() {
    let zone = new_york();
    for (month, day) in [(3, 10), (11, 3), (6, 1)] {
      for hour in 0..24 {
        let local = NaiveDate::from_ymd_opt(2024, month, day)
          .and_then(|d| d.and_hms_opt(hour, 15, 0))
          .expect("valid local");
        let once = zone.normalize(local);
        let twice = zone.normalize(once.naive_local());
        assert_eq!(once, twice, "{local}");
      }
    }
  }
}
