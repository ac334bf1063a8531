use anyhow::anyhow;
use chrono::{Datelike, Duration, Months, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, trace};

use crate::compare;
use crate::granularity::Granularity;
use crate::grid;
use crate::range::{self, Bounds};
use crate::settings::CalendarSettings;
use crate::zone::{Instant, Zone};

/// The views a picker may move between, coarsest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewChain {
    views: Vec<Granularity>,
}

impl Default for ViewChain {
    fn default() -> Self {
        Self {
            views: Granularity::ALL.to_vec(),
        }
    }
}

impl ViewChain {
    pub fn new(max_view: Granularity, min_view: Granularity) -> anyhow::Result<Self> {
        if max_view > min_view {
            return Err(anyhow!(
                "max view {max_view} is finer than min view {min_view}"
            ));
        }
        Ok(Self {
            views: Granularity::ALL
                .into_iter()
                .filter(|view| *view >= max_view && *view <= min_view)
                .collect(),
        })
    }

    pub fn views(&self) -> &[Granularity] {
        &self.views
    }

    pub fn contains(&self, view: Granularity) -> bool {
        self.views.contains(&view)
    }

    pub fn first(&self) -> Granularity {
        self.views[0]
    }

    pub fn finer(&self, view: Granularity) -> Option<Granularity> {
        let idx = self.views.iter().position(|v| *v == view)?;
        self.views.get(idx + 1).copied()
    }

    pub fn coarser(&self, view: Granularity) -> Option<Granularity> {
        let idx = self.views.iter().position(|v| *v == view)?;
        idx.checked_sub(1).and_then(|prev| self.views.get(prev).copied())
    }

    /// The view to open: `requested` when the chain offers a choice and
    /// contains it, otherwise the coarsest view.
    pub fn resolve(&self, requested: Granularity) -> Granularity {
        if self.views.len() == 1 || !self.contains(requested) {
            self.first()
        } else {
            requested
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridItem {
    pub instant: Instant,
    pub label: String,
    /// Holds the current selection.
    pub active: bool,
    /// Holds the current time.
    pub now: bool,
    /// A date-view day outside the displayed month.
    pub disabled: bool,
    pub selectable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub view: Granularity,
    pub title: String,
    /// Weekday header, date view only.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub weekdays: Vec<String>,
    pub items: Vec<GridItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The cell is out of range or the picker is disabled.
    Rejected,
    /// The picker moved to a finer view.
    Drilled(Granularity),
    /// The finest view was reached and the value was set.
    Committed(Instant),
}

/// Headless state of one date picker: the cursor date, the open view,
/// the selected value and the limits.
#[derive(Debug, Clone)]
pub struct Picker {
    settings: CalendarSettings,
    chain: ViewChain,
    view: Granularity,
    date: Instant,
    selected: Option<Instant>,
    bounds: Bounds,
    disabled: bool,
}

impl Picker {
    pub fn new(
        settings: CalendarSettings,
        chain: ViewChain,
        view: Granularity,
        selected: Option<Instant>,
        bounds: Bounds,
        now: &Instant,
    ) -> Self {
        let zone = settings.zone;
        let selected = selected.map(|value| zone.to_zone(&value));
        let date = selected.unwrap_or_else(|| zone.to_zone(now));
        let view = chain.resolve(view);
        debug!(%view, zone = %zone, date = %date, "created picker");

        Self {
            settings,
            chain,
            view,
            date,
            selected,
            bounds: bounds.in_zone(&zone),
            disabled: false,
        }
    }

    pub fn view(&self) -> Granularity {
        self.view
    }

    /// The instant the open page is built around.
    pub fn date(&self) -> Instant {
        self.date
    }

    pub fn selected(&self) -> Option<Instant> {
        self.selected
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds.in_zone(&self.settings.zone);
        debug!(bounds = ?self.bounds, "updated picker bounds");
    }

    /// Replaces the view chain. The open view is kept when the new chain
    /// still offers it, otherwise the coarsest view opens.
    pub fn set_views(&mut self, chain: ViewChain) {
        self.view = chain.resolve(self.view);
        self.chain = chain;
    }

    pub fn set_view(&mut self, view: Granularity) -> bool {
        if self.chain.contains(view) {
            self.view = view;
            true
        } else {
            false
        }
    }

    /// Moves one view up, if there is a coarser one.
    pub fn change_view(&mut self) -> bool {
        match self.chain.coarser(self.view) {
            Some(view) => {
                self.view = view;
                true
            }
            None => false,
        }
    }

    /// Moves the cursor without touching the selection.
    pub fn set_date(&mut self, date: &Instant) {
        self.date = self.settings.zone.to_zone(date);
    }

    pub fn go_to_now(&mut self, now: &Instant) {
        self.set_date(now);
    }

    /// Takes a value set from outside. Returns false when it matches the
    /// current selection and nothing changed.
    pub fn set_model(&mut self, value: Instant) -> bool {
        let value = self.settings.zone.to_zone(&value);
        if self.selected == Some(value) {
            return false;
        }
        self.date = value;
        self.selected = Some(value);
        true
    }

    /// Pages forward by `delta` units of the open view; `None` uses the
    /// view's default. The result is clipped to the bounds.
    pub fn next(&mut self, delta: Option<i32>) {
        let delta = delta.unwrap_or_else(|| self.view.default_delta());
        let moved = shift(&self.date, self.view, delta, &self.settings.zone);
        self.date = range::clip(&moved, &self.bounds);
        debug!(view = %self.view, delta, date = %self.date, "paged picker");
    }

    pub fn prev(&mut self, delta: Option<i32>) {
        let delta = delta.unwrap_or_else(|| self.view.default_delta());
        self.next(Some(-delta));
    }

    pub fn select(&mut self, item: &GridItem) -> Selection {
        if self.disabled || !item.selectable {
            trace!(instant = %item.instant, "rejected selection");
            return Selection::Rejected;
        }

        // Re-selecting the cursor's own cell keeps its finer fields.
        let target = if compare::same_unit(self.view, &self.date, &item.instant) {
            self.date
        } else {
            self.settings.zone.to_zone(&item.instant)
        };
        self.date = range::clip(&target, &self.bounds);

        match self.chain.finer(self.view) {
            Some(next) => {
                self.view = next;
                Selection::Drilled(next)
            }
            None => {
                self.selected = Some(self.date);
                debug!(value = %self.date, "committed selection");
                Selection::Committed(self.date)
            }
        }
    }

    /// Computes the open page. `now` is read once for every cell.
    pub fn page(&self, now: &Instant) -> Page {
        let now = self.settings.zone.to_zone(now);
        let instants = grid::visible(self.view, &self.date, &self.settings);
        let title = self.title(&instants);
        let weekdays = if self.view == Granularity::Date {
            grid::weekday_order(&self.settings)
                .iter()
                .map(|day| day.to_string())
                .collect()
        } else {
            vec![]
        };
        let items: Vec<GridItem> = instants
            .iter()
            .map(|instant| self.classify(instant, &now))
            .collect();

        debug!(view = %self.view, items = items.len(), %title, "computed page");
        Page {
            view: self.view,
            title,
            weekdays,
            items,
        }
    }

    fn title(&self, instants: &[Instant]) -> String {
        match self.view.title_format() {
            Some(format) => self.date.format(format).to_string(),
            None => match (instants.first(), instants.last()) {
                (Some(first), Some(last)) => format!("{} - {}", first.year(), last.year()),
                _ => String::new(),
            },
        }
    }

    fn classify(&self, instant: &Instant, now: &Instant) -> GridItem {
        let step = self.settings.minute_step();
        GridItem {
            instant: *instant,
            label: instant.format(self.view.item_format()).to_string(),
            active: self
                .selected
                .as_ref()
                .is_some_and(|selected| compare::same_cell(self.view, selected, instant, step)),
            now: compare::same_cell(self.view, now, instant, step),
            disabled: self.view == Granularity::Date && instant.month() != self.date.month(),
            selectable: range::in_range(instant, &self.bounds, self.view),
        }
    }
}

fn shift(date: &Instant, view: Granularity, delta: i32, zone: &Zone) -> Instant {
    let local = date.naive_local();
    let moved = match view {
        Granularity::Year | Granularity::Month => add_months(local, delta.saturating_mul(12)),
        Granularity::Date => add_months(local, delta),
        Granularity::Hours => local.checked_add_signed(Duration::days(i64::from(delta))),
        Granularity::Minutes => local.checked_add_signed(Duration::hours(i64::from(delta))),
    };
    moved.map(|local| zone.normalize(local)).unwrap_or(*date)
}

/// Calendar month arithmetic; the day of month is clamped to the
/// target month's length.
fn add_months(local: NaiveDateTime, delta: i32) -> Option<NaiveDateTime> {
    let months = Months::new(delta.unsigned_abs());
    if delta >= 0 {
        local.checked_add_months(months)
    } else {
        local.checked_sub_months(months)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, NaiveDate, Timelike, Weekday};

    use super::*;

    fn settings() -> CalendarSettings {
        CalendarSettings::new("UTC".parse().expect("zone")).with_first_day(Weekday::Mon)
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> Instant {
        let local = NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, min, 0))
            .expect("valid local");
        settings().zone.normalize(local)
    }

    fn picker(view: Granularity, selected: Option<Instant>, bounds: Bounds) -> Picker {
        Picker::new(
            settings(),
            ViewChain::default(),
            view,
            selected,
            bounds,
            &at(2024, 3, 15, 10, 12),
        )
    }

    #[test]
    fn view_chain_slices_between_limits() {
        let chain = ViewChain::new(Granularity::Month, Granularity::Hours).expect("chain");
        assert_eq!(
            chain.views(),
            &[Granularity::Month, Granularity::Date, Granularity::Hours]
        );
        assert_eq!(chain.finer(Granularity::Hours), None);
        assert_eq!(chain.coarser(Granularity::Month), None);
        assert_eq!(chain.resolve(Granularity::Minutes), Granularity::Month);
        assert_eq!(chain.resolve(Granularity::Date), Granularity::Date);
        assert!(ViewChain::new(Granularity::Minutes, Granularity::Year).is_err());

        let single = ViewChain::new(Granularity::Date, Granularity::Date).expect("chain");
        assert_eq!(single.resolve(Granularity::Year), Granularity::Date);
    }

    #[test]
    fn cursor_defaults_to_now_without_selection() {
        let p = picker(Granularity::Date, None, Bounds::unbounded());
        assert_eq!(p.date(), at(2024, 3, 15, 10, 12));
        assert_eq!(p.selected(), None);
    }

    #[test]
    fn date_page_classifies_cells() {
        let selected = at(2024, 3, 20, 8, 0);
        let bounds = Bounds::unbounded().with_max(at(2024, 3, 28, 12, 0));
        let p = picker(Granularity::Date, Some(selected), bounds);
        let page = p.page(&at(2024, 3, 15, 10, 12));

        assert_eq!(page.title, "2024 March");
        assert_eq!(page.weekdays.first().map(String::as_str), Some("Mon"));
        assert_eq!(page.items.len() % 7, 0);

        let find = |m: u32, d: u32| {
            page.items
                .iter()
                .find(|item| item.instant.month() == m && item.instant.day() == d)
                .expect("day on page")
        };
        assert!(find(3, 20).active);
        assert!(!find(3, 21).active);
        assert!(find(3, 15).now);
        assert!(find(2, 26).disabled);
        assert!(!find(3, 1).disabled);
        assert!(find(3, 28).selectable);
        assert!(!find(3, 29).selectable);
        assert_eq!(find(3, 5).label, "05");
    }

    #[test]
    fn year_page_title_spans_the_grid() {
        let p = picker(Granularity::Year, None, Bounds::unbounded());
        let page = p.page(&at(2024, 3, 15, 10, 12));
        assert_eq!(page.title, "2020 - 2031");
        assert!(page.weekdays.is_empty());
        assert_eq!(page.items[4].label, "2024");
        assert!(page.items[4].now);
    }

    #[test]
    fn minutes_page_marks_the_bucket_of_now() {
        let p = picker(Granularity::Minutes, None, Bounds::unbounded());
        let page = p.page(&at(2024, 3, 15, 10, 12));
        assert_eq!(page.title, "March 15, 2024");
        let now_cells: Vec<&str> = page
            .items
            .iter()
            .filter(|item| item.now)
            .map(|item| item.label.as_str())
            .collect();
        assert_eq!(now_cells, vec!["10:10"]);
    }

    #[test]
    fn paging_uses_view_units_and_clamps_days() {
        let mut p = picker(Granularity::Date, Some(at(2024, 1, 31, 9, 0)), Bounds::unbounded());
        p.next(None);
        assert_eq!((p.date().month(), p.date().day()), (2, 29));
        p.prev(Some(2));
        assert_eq!((p.date().year(), p.date().month()), (2023, 12));

        let mut years = picker(Granularity::Year, Some(at(2024, 2, 29, 0, 0)), Bounds::unbounded());
        years.next(None);
        assert_eq!((years.date().year(), years.date().day()), (2034, 28));

        let mut hours = picker(Granularity::Hours, Some(at(2024, 3, 31, 0, 0)), Bounds::unbounded());
        hours.next(None);
        assert_eq!((hours.date().month(), hours.date().day()), (4, 1));

        let mut minutes = picker(Granularity::Minutes, Some(at(2024, 3, 31, 23, 0)), Bounds::unbounded());
        minutes.next(None);
        assert_eq!((minutes.date().day(), minutes.date().hour()), (1, 0));
    }

    #[test]
    fn paging_snaps_to_bounds() {
        let bounds = Bounds::new(Some(at(2024, 2, 10, 0, 0)), Some(at(2024, 4, 20, 0, 0)))
            .expect("bounds");
        let mut p = picker(Granularity::Date, Some(at(2024, 3, 15, 0, 0)), bounds);
        p.next(Some(5));
        assert_eq!(p.date(), at(2024, 4, 20, 0, 0));
        p.prev(Some(12));
        assert_eq!(p.date(), at(2024, 2, 10, 0, 0));
    }

    #[test]
    fn selection_drills_down_then_commits() {
        let chain = ViewChain::new(Granularity::Month, Granularity::Date).expect("chain");
        let mut p = Picker::new(
            settings(),
            chain,
            Granularity::Month,
            None,
            Bounds::unbounded(),
            &at(2024, 3, 15, 10, 12),
        );

        let now = at(2024, 3, 15, 10, 12);
        let june = p.page(&now).items[5].clone();
        assert_eq!(p.select(&june), Selection::Drilled(Granularity::Date));
        assert_eq!(p.date().month(), 6);

        let page = p.page(&now);
        let tenth = page
            .items
            .iter()
            .find(|item| item.instant.month() == 6 && item.instant.day() == 10)
            .expect("june 10th")
            .clone();
        assert_eq!(p.select(&tenth), Selection::Committed(at(2024, 6, 10, 0, 0)));
        assert_eq!(p.selected(), Some(at(2024, 6, 10, 0, 0)));
        assert_eq!(p.view(), Granularity::Date);
    }

    #[test]
    fn reselecting_the_cursor_cell_keeps_time_of_day() {
        let mut p = picker(Granularity::Month, Some(at(2024, 3, 15, 10, 12)), Bounds::unbounded());
        let march = p.page(&at(2024, 3, 15, 10, 12)).items[2].clone();
        assert_eq!(p.select(&march), Selection::Drilled(Granularity::Date));
        assert_eq!(p.date(), at(2024, 3, 15, 10, 12));
    }

    #[test]
    fn selection_is_clipped_and_rejected_outside_range() {
        let bounds = Bounds::unbounded().with_min(at(2024, 3, 10, 14, 0));
        let chain = ViewChain::new(Granularity::Date, Granularity::Date).expect("chain");
        let mut p = Picker::new(
            settings(),
            chain,
            Granularity::Date,
            None,
            bounds,
            &at(2024, 3, 15, 10, 12),
        );
        let page = p.page(&at(2024, 3, 15, 10, 12));
        let ninth = page.items.iter().find(|i| i.instant.day() == 9 && i.instant.month() == 3);
        let tenth = page.items.iter().find(|i| i.instant.day() == 10 && i.instant.month() == 3);

        assert_eq!(p.select(ninth.expect("9th")), Selection::Rejected);
        assert_eq!(
            p.select(tenth.expect("10th")),
            Selection::Committed(at(2024, 3, 10, 14, 0))
        );

        p.set_disabled(true);
        let any = p.page(&at(2024, 3, 15, 10, 12)).items[20].clone();
        assert_eq!(p.select(&any), Selection::Rejected);
    }

    #[test]
    fn view_changes_stay_within_the_chain() {
        let chain = ViewChain::new(Granularity::Month, Granularity::Hours).expect("chain");
        let mut p = Picker::new(
            settings(),
            chain,
            Granularity::Date,
            None,
            Bounds::unbounded(),
            &at(2024, 3, 15, 10, 12),
        );
        assert!(p.change_view());
        assert_eq!(p.view(), Granularity::Month);
        assert!(!p.change_view());
        assert!(!p.set_view(Granularity::Year));
        assert!(p.set_view(Granularity::Hours));

        p.set_views(ViewChain::default());
        assert_eq!(p.view(), Granularity::Hours);
        p.set_views(ViewChain::new(Granularity::Year, Granularity::Month).expect("chain"));
        assert_eq!(p.view(), Granularity::Year);
    }

    #[test]
    fn external_value_updates_cursor_once() {
        let mut p = picker(Granularity::Date, None, Bounds::unbounded());
        let value = at(2025, 7, 4, 12, 0);
        assert!(p.set_model(value));
        assert_eq!(p.date(), value);
        assert!(!p.set_model(value));

        p.go_to_now(&at(2024, 3, 15, 10, 12));
        assert_eq!(p.date(), at(2024, 3, 15, 10, 12));
        assert_eq!(p.selected(), Some(value));
    }
}
