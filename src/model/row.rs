use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::date::opt_date_serde;
use super::dependency::{dependency_serde, Dependency};

/// Deepest separator nesting level.
pub const MAX_LEVEL: u8 = 4;

/// The three kinds of row a project can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Chart,
    Separator,
    Event,
}

/// A schedulable task with planned/actual dates and an optional dependency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartRow {
    pub id: String,
    pub no: usize,
    pub display_name: String,
    /// Color alias, resolved against the project's color list.
    pub color: String,
    #[serde(with = "opt_date_serde")]
    pub planned_start_date: Option<NaiveDate>,
    #[serde(with = "opt_date_serde")]
    pub planned_end_date: Option<NaiveDate>,
    pub planned_days: Option<i64>,
    #[serde(with = "opt_date_serde")]
    pub actual_start_date: Option<NaiveDate>,
    #[serde(with = "opt_date_serde")]
    pub actual_end_date: Option<NaiveDate>,
    /// Percentage as typed, e.g. `"40"`.
    pub progress: String,
    #[serde(with = "dependency_serde")]
    pub dependency: Option<Dependency>,
    /// Id of the row `dependency` currently resolves to. Derived.
    pub dependent_id: String,
    /// Count non-working days toward `planned_days`.
    pub is_include_holidays: bool,
    pub text_column1: String,
    pub text_column2: String,
    pub text_column3: String,
}

impl ChartRow {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Builder used heavily by tests and the CSV importer.
    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.planned_start_date = Some(start);
        self.planned_end_date = Some(end);
        self
    }

    /// True when only the display name has been filled in.
    pub fn is_display_name_only(&self) -> bool {
        !self.display_name.trim().is_empty()
            && self.color.is_empty()
            && self.planned_start_date.is_none()
            && self.planned_end_date.is_none()
            && self.planned_days.is_none()
            && self.actual_start_date.is_none()
            && self.actual_end_date.is_none()
            && self.progress.is_empty()
            && self.dependency.is_none()
            && self.text_column1.is_empty()
            && self.text_column2.is_empty()
            && self.text_column3.is_empty()
    }
}

/// A grouping header. Rows below it, up to the next separator, belong to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeparatorRow {
    pub id: String,
    pub no: usize,
    pub display_name: String,
    pub is_collapsed: bool,
    /// Indent depth, 0 to [`MAX_LEVEL`].
    pub level: u8,
    #[serde(with = "opt_date_serde")]
    pub min_start_date: Option<NaiveDate>,
    #[serde(with = "opt_date_serde")]
    pub max_end_date: Option<NaiveDate>,
}

/// One dated entry on an event row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventData {
    pub is_planned: bool,
    pub label: String,
    #[serde(with = "opt_date_serde")]
    pub start_date: Option<NaiveDate>,
    #[serde(with = "opt_date_serde")]
    pub end_date: Option<NaiveDate>,
}

/// A row carrying several discrete events instead of one date range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventRow {
    pub id: String,
    pub no: usize,
    pub display_name: String,
    pub color: String,
    pub progress: String,
    pub is_include_holidays: bool,
    pub event_data: Vec<EventData>,
    pub text_column1: String,
    pub text_column2: String,
    pub text_column3: String,
}

/// A single line of the work-breakdown table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rowType")]
pub enum Row {
    Chart(ChartRow),
    Separator(SeparatorRow),
    Event(EventRow),
}

impl Row {
    /// An empty row of the given kind.
    pub fn empty(kind: RowKind) -> Self {
        match kind {
            RowKind::Chart => Row::Chart(ChartRow::default()),
            RowKind::Separator => Row::Separator(SeparatorRow::default()),
            RowKind::Event => Row::Event(EventRow::default()),
        }
    }

    pub fn kind(&self) -> RowKind {
        match self {
            Row::Chart(_) => RowKind::Chart,
            Row::Separator(_) => RowKind::Separator,
            Row::Event(_) => RowKind::Event,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Row::Chart(r) => &r.id,
            Row::Separator(r) => &r.id,
            Row::Event(r) => &r.id,
        }
    }

    pub fn set_id(&mut self, id: String) {
        match self {
            Row::Chart(r) => r.id = id,
            Row::Separator(r) => r.id = id,
            Row::Event(r) => r.id = id,
        }
    }

    pub fn no(&self) -> usize {
        match self {
            Row::Chart(r) => r.no,
            Row::Separator(r) => r.no,
            Row::Event(r) => r.no,
        }
    }

    pub fn set_no(&mut self, no: usize) {
        match self {
            Row::Chart(r) => r.no = no,
            Row::Separator(r) => r.no = no,
            Row::Event(r) => r.no = no,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Row::Chart(r) => &r.display_name,
            Row::Separator(r) => &r.display_name,
            Row::Event(r) => &r.display_name,
        }
    }

    pub fn set_display_name(&mut self, name: String) {
        match self {
            Row::Chart(r) => r.display_name = name,
            Row::Separator(r) => r.display_name = name,
            Row::Event(r) => r.display_name = name,
        }
    }

    pub fn is_chart(&self) -> bool {
        matches!(self, Row::Chart(_))
    }

    pub fn is_separator(&self) -> bool {
        matches!(self, Row::Separator(_))
    }

    pub fn as_chart(&self) -> Option<&ChartRow> {
        match self {
            Row::Chart(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_chart_mut(&mut self) -> Option<&mut ChartRow> {
        match self {
            Row::Chart(r) => Some(r),
            _ => None,
        }
    }

    /// Earliest start and latest end this row puts on the timeline.
    /// Separators contribute nothing.
    pub fn date_span(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        match self {
            Row::Chart(r) => (r.planned_start_date, r.planned_end_date),
            Row::Event(r) => r.event_data.iter().fold((None, None), |(min, max), ev| {
                (
                    earliest(earliest(min, ev.start_date), ev.end_date),
                    latest(latest(max, ev.start_date), ev.end_date),
                )
            }),
            Row::Separator(_) => (None, None),
        }
    }
}

pub(crate) fn earliest(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Option<NaiveDate> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

pub(crate) fn latest(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Option<NaiveDate> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, None) => x,
        (None, y) => y,
    }
}
