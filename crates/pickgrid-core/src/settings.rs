use anyhow::anyhow;
use chrono::Weekday;

use crate::zone::Zone;

pub const DEFAULT_STEP: u32 = 5;
/// Used when neither the config nor the host locale names a first day.
pub const DEFAULT_FIRST_DAY: Weekday = Weekday::Sun;

/// Locale variables in the order they take effect for time formatting.
pub const LOCALE_ENV_VARS: [&str; 3] = ["LC_ALL", "LC_TIME", "LANG"];

// Territories whose week does not start on Monday (CLDR week data).
const SUNDAY_TERRITORIES: &[&str] = &[
    "AG", "AS", "BD", "BR", "BS", "BT", "BW", "BZ", "CA", "CN", "CO", "DM", "DO", "ET", "GT", "GU",
    "HK", "HN", "ID", "IL", "IN", "JM", "JP", "KE", "KH", "KR", "LA", "MH", "MM", "MO", "MT", "MX",
    "MZ", "NI", "NP", "PA", "PE", "PH", "PK", "PR", "PT", "PY", "SA", "SG", "SV", "TH", "TT", "TW",
    "UM", "US", "VE", "VI", "WS", "YE", "ZA", "ZW",
];
const SATURDAY_TERRITORIES: &[&str] = &[
    "AE", "AF", "BH", "DJ", "DZ", "EG", "IQ", "IR", "JO", "KW", "LY", "OM", "QA", "SD", "SY",
];
const FRIDAY_TERRITORIES: &[&str] = &["MV"];

/// Calendar parameters passed to every grid and comparison call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarSettings {
    pub zone: Zone,
    pub first_day: Weekday,
    /// Minute step for the minutes view.
    pub step: u32,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            zone: Zone::Local,
            first_day: DEFAULT_FIRST_DAY,
            step: DEFAULT_STEP,
        }
    }
}

impl CalendarSettings {
    pub fn new(zone: Zone) -> Self {
        Self {
            zone,
            ..Self::default()
        }
    }

    pub fn with_first_day(mut self, first_day: Weekday) -> Self {
        self.first_day = first_day;
        self
    }

    pub fn with_step(mut self, step: u32) -> anyhow::Result<Self> {
        if step == 0 || step > 60 {
            return Err(anyhow!("minute step must be between 1 and 60, got {step}"));
        }
        self.step = step;
        Ok(self)
    }

    /// Step as used for grids and buckets; never zero.
    pub fn minute_step(&self) -> u32 {
        self.step.max(1)
    }
}

/// Maps 0=Sunday .. 6=Saturday to a weekday.
pub fn weekday_from_index(index: u8) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

/// First day of the week for a POSIX locale name such as `de_DE.UTF-8`
/// or a tag such as `en-GB`. `None` when the name carries no territory.
pub fn first_day_for_locale(locale: &str) -> Option<Weekday> {
    let name = locale.split(['.', '@']).next().unwrap_or_default();
    let territory = name.split(['_', '-']).nth(1)?.to_ascii_uppercase();
    if territory.len() != 2 || !territory.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let territory = territory.as_str();
    let day = if SUNDAY_TERRITORIES.contains(&territory) {
        Weekday::Sun
    } else if SATURDAY_TERRITORIES.contains(&territory) {
        Weekday::Sat
    } else if FRIDAY_TERRITORIES.contains(&territory) {
        Weekday::Fri
    } else {
        Weekday::Mon
    };
    Some(day)
}
