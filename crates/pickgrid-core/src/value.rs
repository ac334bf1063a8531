use std::fmt::Write as _;

use anyhow::{
  Context,
  anyhow
};
use chrono::format::{
  Item,
  ParseErrorKind,
  StrftimeItems
};
use chrono::{
  NaiveDate,
  NaiveDateTime
};
use serde::Serialize;
use tracing::debug;

use crate::range::Bounds;
use crate::zone::{
  Instant,
  Zone
};

/// `YYYY-MM-DD HH:mm`.
pub const DEFAULT_FORMAT: &str =
  "%Y-%m-%d %H:%M";

/// A strftime pattern used to show a
/// selected value as text and to read
/// typed text back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueFormat {
  pattern: String
}

impl Default for ValueFormat {
  fn default() -> Self {
    Self {
      pattern: DEFAULT_FORMAT
        .to_string()
    }
  }
}

/// Outcome of checking typed text.
#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
#[serde(
  tag = "status",
  rename_all = "snake_case"
)]
pub enum ValueCheck {
  /// Nothing typed; the value is
  /// cleared.
  Empty,
  Valid {
    value: Instant,
    text:  String
  },
  Invalid {
    reason: String
  },
  OutOfRange {
    value:  Instant,
    bounds: Bounds
  }
}

impl ValueCheck {
  pub fn is_accepted(&self) -> bool {
    matches!(
      self,
      ValueCheck::Empty
        | ValueCheck::Valid { .. }
    )
  }
}

impl ValueFormat {
  pub fn new(
    pattern: &str
  ) -> anyhow::Result<Self> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
      return Err(anyhow!(
        "value format is empty"
      ));
    }
    if StrftimeItems::new(pattern)
      .any(|item| {
        matches!(item, Item::Error)
      })
    {
      return Err(anyhow!(
        "invalid value format: \
         {pattern}"
      ));
    }
    Ok(Self {
      pattern: pattern.to_string()
    })
  }

  pub fn pattern(&self) -> &str {
    &self.pattern
  }

  /// Renders `value` as seen in `zone`.
  pub fn format(
    &self,
    value: &Instant,
    zone: &Zone
  ) -> anyhow::Result<String> {
    let mut out = String::new();
    write!(
      out,
      "{}",
      zone
        .to_zone(value)
        .format(&self.pattern)
    )
    .map_err(|_| {
      anyhow!(
        "cannot format {value} with \
         {}",
        self.pattern
      )
    })?;
    Ok(out)
  }

  /// Strict parse: the text must
  /// follow the pattern exactly and
  /// read back to the same text. Empty
  /// text is `Ok(None)`.
  pub fn parse(
    &self,
    text: &str,
    zone: &Zone
  ) -> anyhow::Result<Option<Instant>>
  {
    if text.is_empty() {
      return Ok(None);
    }

    let local =
      match NaiveDateTime::parse_from_str(
        text,
        &self.pattern
      ) {
        | Ok(local) => local,
        | Err(err)
          if err.kind()
            == ParseErrorKind::NotEnough =>
        {
          NaiveDate::parse_from_str(
            text,
            &self.pattern
          )
          .map(|date| {
            date.and_time(
              chrono::NaiveTime::MIN
            )
          })
          .with_context(|| {
            format!(
              "'{text}' does not match \
               {}",
              self.pattern
            )
          })?
        }
        | Err(err) => {
          return Err(anyhow!(
            "'{text}' does not match \
             {}: {err}",
            self.pattern
          ));
        }
      };

    let value = zone.normalize(local);
    let echoed =
      self.format(&value, zone)?;
    if echoed != text {
      return Err(anyhow!(
        "'{text}' is not in the exact \
         form {} (reads as '{echoed}')",
        self.pattern
      ));
    }
    Ok(Some(value))
  }

  /// Parses `text` and checks it
  /// against `bounds` at full
  /// precision.
  #[tracing::instrument(skip(
    self, zone, bounds
  ))]
  pub fn check(
    &self,
    text: &str,
    zone: &Zone,
    bounds: &Bounds
  ) -> ValueCheck {
    let value =
      match self.parse(text, zone) {
        | Ok(Some(value)) => value,
        | Ok(None) => {
          return ValueCheck::Empty;
        }
        | Err(err) => {
          debug!(error = %format!("{err:#}"), "value rejected");
          return ValueCheck::Invalid {
            reason: format!("{err:#}")
          };
        }
      };

    if !bounds.admits(&value) {
      debug!(value = %value, "value outside limits");
      return ValueCheck::OutOfRange {
        value,
        bounds: bounds.in_zone(zone)
      };
    }

    ValueCheck::Valid {
      value,
      text: text.to_string()
    }
  }
}
