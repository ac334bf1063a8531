use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  NaiveDate,
  NaiveDateTime,
  Utc
};
use regex::Regex;

use crate::zone::{
  Instant,
  Zone
};

/// Resolves a date expression to an instant in `zone`.
///
/// Local forms (`today`, `2024-03-01`, `2024-03-01 10:30`, ..) are read
/// as wall-clock times of `zone`; absolute forms (RFC 3339, compact UTC)
/// keep their instant and are re-expressed in `zone`.
#[tracing::instrument(skip(zone, now), fields(input = input))]
pub fn parse_instant(
  input: &str,
  zone: &Zone,
  now: &Instant
) -> anyhow::Result<Instant> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();
  let local_now = zone.to_zone(now);

  match lower.as_str() {
    | "now" => return Ok(local_now),
    | "today" => {
      return midnight(
        local_now.date_naive(),
        zone
      );
    }
    | "tomorrow" => {
      return days_from_today(
        &local_now, 1, zone
      );
    }
    | "yesterday" => {
      return days_from_today(
        &local_now, -1, zone
      );
    }
    | _ => {}
  }

  if token.len() == 4
    && token
      .chars()
      .all(|c| c.is_ascii_digit())
  {
    let year: i32 =
      token.parse().context(
        "invalid 4-digit year"
      )?;
    let date = NaiveDate::from_ymd_opt(
      year, 1, 1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid year value: {year}"
      )
    })?;
    return midnight(date, zone);
  }

  if let Some(month) =
    parse_month_name(&lower)
  {
    let date = NaiveDate::from_ymd_opt(
      local_now.year(),
      month,
      1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid month value: {month}"
      )
    })?;
    return midnight(date, zone);
  }

  let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dhm])$")
    .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  if let Some(caps) =
    rel_re.captures(token)
  {
    let sign = caps
      .name("sign")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative sign")
      })?;
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;

    let duration = match unit {
      | "d" => Duration::try_days(num),
      | "h" => Duration::try_hours(num),
      | "m" => Duration::try_minutes(num),
      | _ => None
    }
    .ok_or_else(|| {
      anyhow!(
        "relative offset out of \
         range: {token}"
      )
    })?;
    let duration = if sign == "-" {
      -duration
    } else {
      duration
    };

    return local_now
      .checked_add_signed(duration)
      .ok_or_else(|| {
        anyhow!(
          "relative offset out of \
           range: {token}"
        )
      });
  }

  if let Ok(ndt) =
    NaiveDateTime::parse_from_str(
      token,
      "%Y%m%dT%H%M%SZ"
    )
  {
    return Ok(zone.to_zone(
      &DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc)
        .fixed_offset()
    ));
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(zone.to_zone(&dt));
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return midnight(date, zone);
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      &format!("{token}-01"),
      "%Y-%m-%d"
    )
  {
    return midnight(date, zone);
  }

  for fmt in
    ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
  {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Ok(zone.normalize(ndt));
    }
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     now/today/tomorrow/yesterday, \
     4-digit year, YYYY-MM, month \
     names (e.g. march), +Nd/+Nh/+Nm, \
     RFC3339, YYYY-MM-DD, \
     YYYY-MM-DDTHH:MM, YYYY-MM-DD \
     HH:MM, YYYYMMDDTHHMMSSZ"
  })
}

/// Parses `input` when present; an unusable expression falls back to
/// `now` so a page can always be built.
pub fn reference_or_now(
  input: Option<&str>,
  zone: &Zone,
  now: &Instant
) -> Instant {
  let Some(raw) = input else {
    return zone.to_zone(now);
  };

  match parse_instant(raw, zone, now) {
    | Ok(instant) => instant,
    | Err(err) => {
      tracing::warn!(
        input = raw,
        error = %format!("{err:#}"),
        "invalid reference date; using now"
      );
      zone.to_zone(now)
    }
  }
}

fn midnight(
  date: NaiveDate,
  zone: &Zone
) -> anyhow::Result<Instant> {
  let local = date
    .and_hms_opt(0, 0, 0)
    .ok_or_else(|| {
      anyhow!(
        "failed to construct \
         midnight for {date}"
      )
    })?;
  Ok(zone.normalize(local))
}

fn days_from_today(
  local_now: &Instant,
  days: i64,
  zone: &Zone
) -> anyhow::Result<Instant> {
  let date = local_now
    .date_naive()
    .checked_add_signed(Duration::days(
      days
    ))
    .ok_or_else(|| {
      anyhow!(
        "failed to move {days} days \
         from today"
      )
    })?;
  midnight(date, zone)
}

fn parse_month_name(
  token: &str
) -> Option<u32> {
  match token.trim() {
    | "january" | "jan" => Some(1),
    | "february" | "feb" => Some(2),
    | "march" | "mar" => Some(3),
    | "april" | "apr" => Some(4),
    | "may" => Some(5),
    | "june" | "jun" => Some(6),
    | "july" | "jul" => Some(7),
    | "august" | "aug" => Some(8),
    | "september" | "sep" | "sept" => {
      Some(9)
    }
    | "october" | "oct" => Some(10),
    | "november" | "nov" => Some(11),
    | "december" | "dec" => Some(12),
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    Datelike,
    FixedOffset,
    TimeZone,
    Timelike
  };

  use super::{
    parse_instant,
    reference_or_now
  };
  use crate::zone::{
    Instant,
    Zone
  };

  fn berlin() -> Zone {
    "Europe/Berlin"
      .parse()
      .expect("zone")
  }

  fn now() -> Instant {
    FixedOffset::east_opt(0)
      .and_then(|utc| {
        utc
          .with_ymd_and_hms(
            2026, 2, 17, 23, 30, 0
          )
          .single()
      })
      .expect("valid now")
  }

  #[test]
  fn today_is_local_midnight() {
    // 23:30 UTC is already the 18th in Berlin.
    let parsed =
      parse_instant("today", &berlin(), &now())
        .expect("parse today");
    assert_eq!(
      parsed.format("%Y-%m-%d %H:%M").to_string(),
      "2026-02-18 00:00"
    );
    assert_eq!(parsed.offset().local_minus_utc(), 3600);
  }

  #[test]
  fn parses_year_month_and_month_name() {
    let zone = berlin();
    let year = parse_instant("2028", &zone, &now())
      .expect("parse year");
    assert_eq!((year.year(), year.month(), year.day()), (2028, 1, 1));

    let month = parse_instant("2024-03", &zone, &now())
      .expect("parse year-month");
    assert_eq!((month.year(), month.month(), month.day()), (2024, 3, 1));

    let named = parse_instant("March", &zone, &now())
      .expect("parse month name");
    assert_eq!((named.year(), named.month()), (2026, 3));
  }

  #[test]
  fn parses_local_and_absolute_times() {
    let zone = berlin();
    let local = parse_instant("2024-07-01 10:30", &zone, &now())
      .expect("parse local");
    assert_eq!((local.hour(), local.minute()), (10, 30));
    assert_eq!(local.offset().local_minus_utc(), 7200);

    let absolute = parse_instant("2024-07-01T10:30:00Z", &zone, &now())
      .expect("parse rfc3339");
    assert_eq!(absolute.hour(), 12);

    let compact = parse_instant("20240701T103000Z", &zone, &now())
      .expect("parse compact");
    assert_eq!(compact, absolute);
  }

  #[test]
  fn parses_relative_offsets() {
    let zone = berlin();
    let later = parse_instant("+2h", &zone, &now())
      .expect("parse relative");
    assert_eq!(later - now(), chrono::Duration::hours(2));
    let earlier = parse_instant("-3d", &zone, &now())
      .expect("parse relative");
    assert_eq!(now() - earlier, chrono::Duration::days(3));
  }

  #[test]
  fn invalid_reference_falls_back_to_now() {
    let zone = berlin();
    assert!(parse_instant("someday", &zone, &now()).is_err());
    assert_eq!(
      reference_or_now(Some("someday"), &zone, &now()),
      now()
    );
    assert_eq!(reference_or_now(None, &zone, &now()), now());
  }
}
