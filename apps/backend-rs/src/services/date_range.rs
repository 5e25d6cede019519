//! Check-in/check-out selection for the two-month date picker.
//!
//! The selection is plain data so the picker can live on the client: the
//! client echoes `start`/`end` back and the server answers with the next state
//! and the month grids to render. Dates cross the boundary as `YYYY-MM-DD`.

use std::cmp::Ordering;

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionState {
    Empty,
    StartOnly,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickOutcome {
    /// Past day; nothing changed.
    Ignored,
    Started,
    Restarted,
    Cancelled,
    Completed,
}

impl ClickOutcome {
    pub fn closes_picker(self) -> bool {
        self == Self::Completed
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateRangeSelection {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl DateRangeSelection {
    /// Builds a selection from client-supplied values. Unparseable dates are
    /// dropped, and an end that is not after the start is discarded.
    pub fn from_iso(start: Option<&str>, end: Option<&str>) -> Self {
        let start = start.and_then(parse_iso_date);
        let end = match (start, end.and_then(parse_iso_date)) {
            (Some(start), Some(end)) if end > start => Some(end),
            _ => None,
        };
        Self { start, end }
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    pub fn state(&self) -> SelectionState {
        match (self.start, self.end) {
            (None, _) => SelectionState::Empty,
            (Some(_), None) => SelectionState::StartOnly,
            (Some(_), Some(_)) => SelectionState::Complete,
        }
    }

    pub fn click(&mut self, day: NaiveDate, today: NaiveDate) -> ClickOutcome {
        if !is_selectable(day, today) {
            return ClickOutcome::Ignored;
        }

        match (self.start, self.end) {
            (None, _) => {
                self.start = Some(day);
                self.end = None;
                ClickOutcome::Started
            }
            (Some(_), Some(_)) => {
                self.start = Some(day);
                self.end = None;
                ClickOutcome::Restarted
            }
            (Some(start), None) => match day.cmp(&start) {
                Ordering::Less => {
                    self.start = Some(day);
                    ClickOutcome::Started
                }
                Ordering::Equal => {
                    self.clear();
                    ClickOutcome::Cancelled
                }
                Ordering::Greater => {
                    self.end = Some(day);
                    ClickOutcome::Completed
                }
            },
        }
    }

    pub fn clear(&mut self) {
        self.start = None;
        self.end = None;
    }

    pub fn day_status(
        &self,
        day: NaiveDate,
        today: NaiveDate,
        hover: Option<NaiveDate>,
    ) -> DayStatus {
        let selected = Some(day) == self.start || Some(day) == self.end;
        let in_range = match (self.start, self.end, hover) {
            (Some(start), Some(end), _) => start < day && day < end,
            (Some(start), None, Some(hover)) if hover > start => start < day && day <= hover,
            _ => false,
        };

        DayStatus {
            disabled: !is_selectable(day, today),
            selected,
            in_range,
            today: day == today,
        }
    }
}

pub fn is_selectable(day: NaiveDate, today: NaiveDate) -> bool {
    day >= today
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayStatus {
    pub disabled: bool,
    pub selected: bool,
    pub in_range: bool,
    pub today: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub status: DayStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub label: String,
    /// Empty cells before the 1st in a Sunday-first week.
    pub leading_blanks: u32,
    pub days: Vec<CalendarDay>,
}

/// The first of the two months on display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarView {
    first: NaiveDate,
}

impl CalendarView {
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            first: month_start(date),
        }
    }

    /// Accepts `YYYY-MM` or `YYYY-MM-DD`. Anything else shows the current month.
    pub fn from_iso(text: Option<&str>, today: NaiveDate) -> Self {
        text.and_then(parse_year_month)
            .and_then(|(year, month)| NaiveDate::from_ymd_opt(year, month, 1))
            .map(Self::containing)
            .unwrap_or_else(|| Self::containing(today))
    }

    pub fn first_month(&self) -> NaiveDate {
        self.first
    }

    pub fn advance(&mut self) {
        if let Some(next) = self.first.checked_add_months(Months::new(1)) {
            self.first = next;
        }
    }

    pub fn retreat(&mut self) {
        if let Some(previous) = self.first.checked_sub_months(Months::new(1)) {
            self.first = previous;
        }
    }

    /// Moves the view to the month of `date` unless it is already shown first.
    pub fn anchor_to(&mut self, date: NaiveDate) -> bool {
        let target = month_start(date);
        if target == self.first {
            return false;
        }
        self.first = target;
        true
    }

    pub fn months(
        &self,
        selection: &DateRangeSelection,
        today: NaiveDate,
        hover: Option<NaiveDate>,
    ) -> Vec<MonthGrid> {
        let second = self
            .first
            .checked_add_months(Months::new(1))
            .unwrap_or(self.first);
        [self.first, second]
            .into_iter()
            .map(|first| month_grid(first, selection, today, hover))
            .collect()
    }
}

fn month_grid(
    first: NaiveDate,
    selection: &DateRangeSelection,
    today: NaiveDate,
    hover: Option<NaiveDate>,
) -> MonthGrid {
    let days = first
        .iter_days()
        .take_while(|day| day.month() == first.month())
        .map(|date| CalendarDay {
            date,
            status: selection.day_status(date, today, hover),
        })
        .collect();

    MonthGrid {
        year: first.year(),
        month: first.month(),
        label: first.format("%B %Y").to_string(),
        leading_blanks: first.weekday().num_days_from_sunday(),
        days,
    }
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn parse_year_month(text: &str) -> Option<(i32, u32)> {
    let mut parts = text.trim().split('-');
    let year = parts.next()?.parse::<i32>().ok()?;
    let month = parts.next()?.parse::<u32>().ok()?;
    Some((year, month))
}

pub fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok()
}

/// `DD/MM` or `DD/MM/YYYY`.
pub fn format_display_date(date: NaiveDate, with_year: bool) -> String {
    if with_year {
        date.format("%d/%m/%Y").to_string()
    } else {
        date.format("%d/%m").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(text: &str) -> NaiveDate {
        parse_iso_date(text).expect("valid test date")
    }

    const TODAY: &str = "2026-10-17";

    #[test]
    fn first_click_starts_selection() {
        let mut selection = DateRangeSelection::default();
        assert_eq!(selection.state(), SelectionState::Empty);
        let outcome = selection.click(date("2026-10-20"), date(TODAY));
        assert_eq!(outcome, ClickOutcome::Started);
        assert_eq!(selection.state(), SelectionState::StartOnly);
        assert_eq!(selection.start(), Some(date("2026-10-20")));
    }

    #[test]
    fn clicking_start_again_cancels() {
        let mut selection = DateRangeSelection::default();
        selection.click(date("2026-10-20"), date(TODAY));
        let outcome = selection.click(date("2026-10-20"), date(TODAY));
        assert_eq!(outcome, ClickOutcome::Cancelled);
        assert_eq!(selection.state(), SelectionState::Empty);
        assert_eq!(selection.start(), None);
    }

    #[test]
    fn earlier_click_moves_start_instead_of_inverting() {
        let mut selection = DateRangeSelection::default();
        selection.click(date("2026-10-25"), date(TODAY));
        let outcome = selection.click(date("2026-10-21"), date(TODAY));
        assert_eq!(outcome, ClickOutcome::Started);
        assert_eq!(selection.start(), Some(date("2026-10-21")));
        assert_eq!(selection.end(), None);
    }

    #[test]
    fn later_click_completes_and_closes() {
        let mut selection = DateRangeSelection::default();
        selection.click(date("2026-10-21"), date(TODAY));
        let outcome = selection.click(date("2026-10-24"), date(TODAY));
        assert_eq!(outcome, ClickOutcome::Completed);
        assert!(outcome.closes_picker());
        assert_eq!(selection.state(), SelectionState::Complete);
        assert_eq!(selection.end(), Some(date("2026-10-24")));
    }

    #[test]
    fn click_after_complete_restarts() {
        let mut selection = DateRangeSelection::from_iso(Some("2026-10-21"), Some("2026-10-24"));
        let outcome = selection.click(date("2026-10-30"), date(TODAY));
        assert_eq!(outcome, ClickOutcome::Restarted);
        assert_eq!(selection.start(), Some(date("2026-10-30")));
        assert_eq!(selection.end(), None);
    }

    #[test]
    fn past_days_are_inert() {
        let mut selection = DateRangeSelection::from_iso(Some("2026-10-21"), None);
        let outcome = selection.click(date("2026-10-16"), date(TODAY));
        assert_eq!(outcome, ClickOutcome::Ignored);
        assert_eq!(selection.start(), Some(date("2026-10-21")));
        assert!(is_selectable(date(TODAY), date(TODAY)));
    }

    #[test]
    fn clear_resets_from_any_state() {
        let mut selection = DateRangeSelection::from_iso(Some("2026-10-21"), Some("2026-10-24"));
        selection.clear();
        assert_eq!(selection.state(), SelectionState::Empty);
    }

    #[test]
    fn from_iso_drops_inverted_and_malformed_values() {
        let inverted = DateRangeSelection::from_iso(Some("2026-10-24"), Some("2026-10-21"));
        assert_eq!(inverted.state(), SelectionState::StartOnly);
        let malformed = DateRangeSelection::from_iso(Some("soon"), Some("2026-10-21"));
        assert_eq!(malformed.state(), SelectionState::Empty);
    }

    #[test]
    fn hover_previews_range_up_to_and_including_hover() {
        let selection = DateRangeSelection::from_iso(Some("2026-10-20"), None);
        let hover = Some(date("2026-10-23"));
        let today = date(TODAY);
        assert!(!selection.day_status(date("2026-10-20"), today, hover).in_range);
        assert!(selection.day_status(date("2026-10-20"), today, hover).selected);
        assert!(selection.day_status(date("2026-10-21"), today, hover).in_range);
        assert!(selection.day_status(date("2026-10-23"), today, hover).in_range);
        assert!(!selection.day_status(date("2026-10-24"), today, hover).in_range);

        let backwards = Some(date("2026-10-19"));
        assert!(!selection.day_status(date("2026-10-19"), today, backwards).in_range);
    }

    #[test]
    fn complete_range_highlights_interior_only() {
        let selection = DateRangeSelection::from_iso(Some("2026-10-20"), Some("2026-10-23"));
        let today = date(TODAY);
        let hover = Some(date("2026-10-30"));
        let start = selection.day_status(date("2026-10-20"), today, hover);
        assert!(start.selected && !start.in_range);
        assert!(selection.day_status(date("2026-10-22"), today, hover).in_range);
        let end = selection.day_status(date("2026-10-23"), today, hover);
        assert!(end.selected && !end.in_range);
        assert!(!selection.day_status(date("2026-10-25"), today, hover).in_range);
    }

    #[test]
    fn view_falls_back_to_current_month_on_bad_input() {
        let today = date(TODAY);
        assert_eq!(
            CalendarView::from_iso(Some("20x6-1o"), today).first_month(),
            date("2026-10-01")
        );
        assert_eq!(
            CalendarView::from_iso(Some("2026-13"), today).first_month(),
            date("2026-10-01")
        );
        assert_eq!(
            CalendarView::from_iso(None, today).first_month(),
            date("2026-10-01")
        );
        assert_eq!(
            CalendarView::from_iso(Some("2027-02-14"), today).first_month(),
            date("2027-02-01")
        );
    }

    #[test]
    fn view_navigation_is_independent_of_selection() {
        let mut view = CalendarView::containing(date("2026-12-05"));
        view.advance();
        assert_eq!(view.first_month(), date("2027-01-01"));
        view.retreat();
        view.retreat();
        assert_eq!(view.first_month(), date("2026-11-01"));
    }

    #[test]
    fn anchor_only_moves_when_month_differs() {
        let mut view = CalendarView::containing(date("2026-10-01"));
        assert!(!view.anchor_to(date("2026-10-28")));
        assert!(view.anchor_to(date("2026-11-03")));
        assert_eq!(view.first_month(), date("2026-11-01"));
    }

    #[test]
    fn months_render_two_consecutive_grids() {
        let view = CalendarView::containing(date("2026-10-01"));
        let selection = DateRangeSelection::default();
        let grids = view.months(&selection, date(TODAY), None);
        assert_eq!(grids.len(), 2);
        assert_eq!(grids[0].label, "October 2026");
        assert_eq!(grids[0].days.len(), 31);
        // 1 October 2026 is a Thursday.
        assert_eq!(grids[0].leading_blanks, 4);
        assert_eq!(grids[1].month, 11);
        assert_eq!(grids[1].days.len(), 30);
        assert!(grids[0].days[0].status.disabled);
        assert!(grids[0].days[16].status.today);
        assert!(!grids[0].days[16].status.disabled);
    }

    #[test]
    fn display_formats() {
        assert_eq!(format_display_date(date("2026-03-07"), false), "07/03");
        assert_eq!(format_display_date(date("2026-03-07"), true), "07/03/2026");
    }
}
