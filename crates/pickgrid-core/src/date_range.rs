use tracing::debug;

use crate::granularity::Granularity;
use crate::picker::{GridItem, Page, Picker, Selection, ViewChain};
use crate::range::Bounds;
use crate::settings::CalendarSettings;
use crate::zone::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSide {
    Start,
    End,
}

/// Two pickers editing the ends of one interval. The start picker is
/// capped at the end value and the end picker starts at the start value.
/// Both stay inside the outer limits, whichever is tighter.
#[derive(Debug, Clone)]
pub struct DateRangePicker {
    start: Picker,
    end: Picker,
    limits: Bounds,
}

impl DateRangePicker {
    /// Missing ends default to `now`.
    pub fn new(
        settings: CalendarSettings,
        chain: ViewChain,
        view: Granularity,
        start: Option<Instant>,
        end: Option<Instant>,
        limits: Bounds,
        now: &Instant,
    ) -> Self {
        let start_value = start.unwrap_or(*now);
        let end_value = end.unwrap_or(*now);

        let start = Picker::new(
            settings,
            chain.clone(),
            view,
            Some(start_value),
            start_bounds(&limits, end_value),
            now,
        );
        let end = Picker::new(
            settings,
            chain,
            view,
            Some(end_value),
            end_bounds(&limits, start_value),
            now,
        );
        Self { start, end, limits }
    }

    pub fn picker(&self, side: RangeSide) -> &Picker {
        match side {
            RangeSide::Start => &self.start,
            RangeSide::End => &self.end,
        }
    }

    pub fn start(&self) -> Option<Instant> {
        self.start.selected()
    }

    pub fn end(&self) -> Option<Instant> {
        self.end.selected()
    }

    pub fn page(&self, side: RangeSide, now: &Instant) -> Page {
        self.picker(side).page(now)
    }

    pub fn next(&mut self, side: RangeSide, delta: Option<i32>) {
        self.picker_mut(side).next(delta);
    }

    pub fn prev(&mut self, side: RangeSide, delta: Option<i32>) {
        self.picker_mut(side).prev(delta);
    }

    pub fn select(&mut self, side: RangeSide, item: &GridItem) -> Selection {
        let selection = self.picker_mut(side).select(item);
        if let Selection::Committed(value) = selection {
            self.sync(side, value);
        }
        selection
    }

    /// Sets one end from outside and moves the other picker's limit.
    pub fn set_value(&mut self, side: RangeSide, value: Instant) {
        if self.picker_mut(side).set_model(value) {
            self.sync(side, value);
        }
    }

    fn picker_mut(&mut self, side: RangeSide) -> &mut Picker {
        match side {
            RangeSide::Start => &mut self.start,
            RangeSide::End => &mut self.end,
        }
    }

    fn sync(&mut self, changed: RangeSide, value: Instant) {
        match changed {
            RangeSide::Start => {
                let bounds = end_bounds(&self.limits, value);
                self.end.set_bounds(bounds);
            }
            RangeSide::End => {
                let bounds = start_bounds(&self.limits, value);
                self.start.set_bounds(bounds);
            }
        }
        debug!(?changed, value = %value, "synced range limits");
    }
}

fn start_bounds(limits: &Bounds, end: Instant) -> Bounds {
    Bounds {
        min: limits.min,
        max: Some(limits.max.map_or(end, |max| max.min(end))),
    }
}

fn end_bounds(limits: &Bounds, start: Instant) -> Bounds {
    Bounds {
        min: Some(limits.min.map_or(start, |min| min.max(start))),
        max: limits.max,
    }
}
