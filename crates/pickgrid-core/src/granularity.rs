use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Calendar precision of a picker view, ordered coarse to fine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Year,
    Month,
    Date,
    Hours,
    Minutes,
}

impl Granularity {
    pub const ALL: [Granularity; 5] = [
        Granularity::Year,
        Granularity::Month,
        Granularity::Date,
        Granularity::Hours,
        Granularity::Minutes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Year => "year",
            Granularity::Month => "month",
            Granularity::Date => "date",
            Granularity::Hours => "hours",
            Granularity::Minutes => "minutes",
        }
    }

    /// strftime pattern for one cell label.
    pub fn item_format(self) -> &'static str {
        match self {
            Granularity::Year => "%Y",
            Granularity::Month => "%b",
            Granularity::Date => "%d",
            Granularity::Hours | Granularity::Minutes => "%H:%M",
        }
    }

    /// strftime pattern for the page title. The year view titles itself
    /// with the first and last year of its grid instead.
    pub fn title_format(self) -> Option<&'static str> {
        match self {
            Granularity::Year => None,
            Granularity::Month => Some("%Y"),
            Granularity::Date => Some("%Y %B"),
            Granularity::Hours | Granularity::Minutes => Some("%B %-d, %Y"),
        }
    }

    pub fn default_delta(self) -> i32 {
        match self {
            Granularity::Year => 10,
            _ => 1,
        }
    }
}

impl FromStr for Granularity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "year" | "years" => Ok(Granularity::Year),
            "month" | "months" => Ok(Granularity::Month),
            "date" | "day" | "days" => Ok(Granularity::Date),
            "hour" | "hours" => Ok(Granularity::Hours),
            "minute" | "minutes" => Ok(Granularity::Minutes),
            other => Err(anyhow!(
                "unknown view {other:?}; expected year, month, date, hours or minutes"
            )),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
