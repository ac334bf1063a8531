use anyhow::anyhow;
use serde::Serialize;

use crate::compare::same_unit;
use crate::granularity::Granularity;
use crate::zone::{Instant, Zone};

/// Optional lower and upper limits on selectable instants.
///
/// Fields may be set directly; `min <= max` is then the caller's
/// responsibility. [`Bounds::new`] checks it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Bounds {
    pub min: Option<Instant>,
    pub max: Option<Instant>,
}

impl Bounds {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn new(min: Option<Instant>, max: Option<Instant>) -> anyhow::Result<Self> {
        if let (Some(lo), Some(hi)) = (min, max)
            && lo > hi
        {
            return Err(anyhow!("min date {lo} is after max date {hi}"));
        }
        Ok(Self { min, max })
    }

    pub fn with_min(mut self, min: Instant) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: Instant) -> Self {
        self.max = Some(max);
        self
    }

    /// Full-precision check: `min <= value <= max`.
    pub fn admits(&self, value: &Instant) -> bool {
        self.min.is_none_or(|min| min <= *value) && self.max.is_none_or(|max| *value <= max)
    }

    /// Both limits re-expressed in `zone`.
    pub fn in_zone(&self, zone: &Zone) -> Self {
        Self {
            min: self.min.map(|min| zone.to_zone(&min)),
            max: self.max.map(|max| zone.to_zone(&max)),
        }
    }
}

/// Whether `candidate` is selectable at `granularity`.
///
/// A candidate strictly before `min` still counts when it is the same
/// unit as `min` (the day holding `min` in the date view, for example),
/// and likewise for `max`.
pub fn in_range(candidate: &Instant, bounds: &Bounds, granularity: Granularity) -> bool {
    let above_min = match &bounds.min {
        Some(min) if candidate < min => same_unit(granularity, min, candidate),
        _ => true,
    };
    let below_max = match &bounds.max {
        Some(max) if candidate > max => same_unit(granularity, max, candidate),
        _ => true,
    };
    above_min && below_max
}

/// Snaps `candidate` onto the nearest limit it crosses.
pub fn clip(candidate: &Instant, bounds: &Bounds) -> Instant {
    match (&bounds.min, &bounds.max) {
        (Some(min), _) if candidate < min => *min,
        (_, Some(max)) if candidate > max => *max,
        _ => *candidate,
    }
}
