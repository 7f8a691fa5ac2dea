//! Cell edits and calendar changes.

use std::collections::HashSet;

use chrono::NaiveDate;

use super::AppState;
use crate::model::{ChartRow, ColorInfo, Dependency, EventData, Row, RowMap};
use crate::schedule::resolver::{link_dependencies, resolve_in_place};
use crate::schedule::{
    add_planned_days, calculate_planned_days, subtract_planned_days, update_dependent_rows,
    update_separator_row_dates, Calendar,
};
use crate::{Error, Result};

fn row_mut<'a>(data: &'a mut RowMap, id: &str) -> Result<&'a mut Row> {
    data.get_mut(id)
        .ok_or_else(|| Error::RowNotFound(id.to_string()))
}

fn chart_mut<'a>(data: &'a mut RowMap, id: &str) -> Result<&'a mut ChartRow> {
    match row_mut(data, id)? {
        Row::Chart(chart) => Ok(chart),
        _ => Err(Error::NotAChartRow(id.to_string())),
    }
}

/// Keep `planned_days` equal to the day count of the planned range.
fn sync_planned_days(chart: &mut ChartRow, calendar: &Calendar) {
    if let (Some(start), Some(end)) = (chart.planned_start_date, chart.planned_end_date) {
        chart.planned_days = Some(calculate_planned_days(
            start,
            end,
            calendar,
            chart.is_include_holidays,
        ));
    }
}

/// Duration to preserve when one end moves past the other.
fn kept_duration(chart: &ChartRow) -> i64 {
    chart.planned_days.filter(|d| *d > 0).unwrap_or(1)
}

/// Recompute each chart row's end from its start and `planned_days`, so the
/// duration stays the same number of counted days under a new calendar.
fn reset_end_dates(data: &mut RowMap, calendar: &Calendar) {
    for id in data.chart_ids() {
        let Some(chart) = data.get_mut(&id).and_then(Row::as_chart_mut) else {
            continue;
        };
        match (chart.planned_start_date, chart.planned_days) {
            (Some(start), Some(days)) if days > 0 => {
                chart.planned_end_date = add_planned_days(
                    Some(start),
                    Some(days),
                    calendar,
                    chart.is_include_holidays,
                    true,
                );
            }
            _ => sync_planned_days(chart, calendar),
        }
    }
}

impl AppState {
    /// Carry the edited row's dates to everything linked to it, then refresh
    /// the rollups.
    fn propagate_from(&self, data: &mut RowMap, id: &str) {
        let (start, end) = data
            .get(id)
            .and_then(Row::as_chart)
            .map(|c| (c.planned_start_date, c.planned_end_date))
            .unwrap_or_default();
        let mut visited = HashSet::new();
        update_dependent_rows(
            data,
            &self.dependency_map,
            &self.calendar,
            id,
            start,
            end,
            &mut visited,
        );
        update_separator_row_dates(data);
    }

    /// Apply `edit` to a chart row's dates, then propagate and commit.
    fn edit_dates<F>(&mut self, id: &str, edit: F) -> Result<()>
    where
        F: FnOnce(&mut ChartRow, &Calendar),
    {
        let mut data = self.working_copy();
        edit(chart_mut(&mut data, id)?, &self.calendar);
        self.propagate_from(&mut data, id);
        self.commit(data);
        Ok(())
    }

    pub(super) fn set_display_name(&mut self, id: &str, name: String) -> Result<()> {
        Self::check_length(&name, "displayName", self.settings.max_display_name_length)?;
        let mut data = self.working_copy();
        let row = row_mut(&mut data, id)?;
        if row.display_name() == name {
            return Ok(());
        }
        row.set_display_name(name);
        self.commit(data);
        Ok(())
    }

    pub(super) fn set_color(&mut self, id: &str, alias: String) -> Result<()> {
        let mut data = self.working_copy();
        match row_mut(&mut data, id)? {
            Row::Chart(chart) => chart.color = alias,
            Row::Event(event) => event.color = alias,
            Row::Separator(_) => return Err(Error::NotAChartRow(id.to_string())),
        }
        self.commit(data);
        Ok(())
    }

    pub(super) fn set_planned_start(&mut self, id: &str, date: Option<NaiveDate>) -> Result<()> {
        self.edit_dates(id, |chart, calendar| {
            chart.planned_start_date = date;
            let Some(start) = date else {
                return;
            };
            match chart.planned_end_date {
                Some(end) if start <= end => {}
                _ => {
                    chart.planned_end_date = add_planned_days(
                        Some(start),
                        Some(kept_duration(chart)),
                        calendar,
                        chart.is_include_holidays,
                        true,
                    );
                }
            }
            sync_planned_days(chart, calendar);
        })
    }

    pub(super) fn set_planned_end(&mut self, id: &str, date: Option<NaiveDate>) -> Result<()> {
        self.edit_dates(id, |chart, calendar| {
            chart.planned_end_date = date;
            let Some(end) = date else {
                return;
            };
            match chart.planned_start_date {
                Some(start) if start <= end => {}
                _ => {
                    chart.planned_start_date = subtract_planned_days(
                        Some(end),
                        Some(kept_duration(chart)),
                        calendar,
                        chart.is_include_holidays,
                        true,
                    );
                }
            }
            sync_planned_days(chart, calendar);
        })
    }

    pub(super) fn set_planned_dates(
        &mut self,
        id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<()> {
        self.edit_dates(id, |chart, calendar| {
            chart.planned_start_date = Some(start.min(end));
            chart.planned_end_date = Some(start.max(end));
            sync_planned_days(chart, calendar);
        })
    }

    /// A positive count moves the end date; zero clears it.
    pub(super) fn set_planned_days(&mut self, id: &str, days: Option<i64>) -> Result<()> {
        self.edit_dates(id, |chart, calendar| {
            chart.planned_days = days.map(|d| d.max(0));
            match (chart.planned_start_date, chart.planned_days) {
                (Some(start), Some(d)) if d > 0 => {
                    chart.planned_end_date = add_planned_days(
                        Some(start),
                        Some(d),
                        calendar,
                        chart.is_include_holidays,
                        true,
                    );
                }
                (Some(_), Some(_)) => chart.planned_end_date = None,
                _ => {}
            }
        })
    }

    pub(super) fn set_actual_dates(
        &mut self,
        id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<()> {
        let mut data = self.working_copy();
        let chart = chart_mut(&mut data, id)?;
        chart.actual_start_date = start;
        chart.actual_end_date = end;
        self.commit(data);
        Ok(())
    }

    pub(super) fn set_progress(&mut self, id: &str, progress: String) -> Result<()> {
        let mut data = self.working_copy();
        match row_mut(&mut data, id)? {
            Row::Chart(chart) => chart.progress = progress,
            Row::Event(event) => event.progress = progress,
            Row::Separator(_) => return Err(Error::NotAChartRow(id.to_string())),
        }
        self.commit(data);
        Ok(())
    }

    pub(super) fn set_text_column(&mut self, id: &str, column: u8, text: String) -> Result<()> {
        let mut data = self.working_copy();
        let slot = match (row_mut(&mut data, id)?, column) {
            (Row::Chart(r), 1) => &mut r.text_column1,
            (Row::Chart(r), 2) => &mut r.text_column2,
            (Row::Chart(r), 3) => &mut r.text_column3,
            (Row::Event(r), 1) => &mut r.text_column1,
            (Row::Event(r), 2) => &mut r.text_column2,
            (Row::Event(r), 3) => &mut r.text_column3,
            _ => {
                tracing::warn!(row = id, column, "no such text column");
                return Ok(());
            }
        };
        *slot = text;
        self.commit(data);
        Ok(())
    }

    /// Toggling the flag keeps the duration and moves the end date.
    pub(super) fn set_include_holidays(&mut self, id: &str, include: bool) -> Result<()> {
        let mut data = self.working_copy();
        match row_mut(&mut data, id)? {
            Row::Chart(chart) => {
                chart.is_include_holidays = include;
                match (chart.planned_start_date, chart.planned_days) {
                    (Some(start), Some(days)) if days > 0 => {
                        chart.planned_end_date = add_planned_days(
                            Some(start),
                            Some(days),
                            &self.calendar,
                            include,
                            true,
                        );
                    }
                    _ => sync_planned_days(chart, &self.calendar),
                }
            }
            Row::Event(event) => event.is_include_holidays = include,
            Row::Separator(_) => return Err(Error::NotAChartRow(id.to_string())),
        }
        self.propagate_from(&mut data, id);
        self.commit(data);
        Ok(())
    }

    /// Replace a row's rule with typed text. The new target's dates win:
    /// the edited row moves to follow it.
    pub(super) fn set_dependency(&mut self, id: &str, rule: &str) -> Result<()> {
        let mut dependency = Dependency::parse(rule)?;
        if let Some(dep) = dependency.as_mut() {
            dep.user_entered = true;
        }

        let mut data = self.working_copy();
        let chart = chart_mut(&mut data, id)?;
        chart.dependency = dependency;
        chart.dependent_id.clear();

        link_dependencies(&mut data);
        let seeds: Vec<String> = data
            .get(id)
            .and_then(Row::as_chart)
            .map(|c| c.dependent_id.clone())
            .filter(|target| !target.is_empty())
            .into_iter()
            .collect();
        resolve_in_place(&mut data, &self.calendar, &seeds);
        self.commit(data);
        Ok(())
    }

    pub(super) fn set_events(&mut self, id: &str, events: Vec<EventData>) -> Result<()> {
        let mut data = self.working_copy();
        match row_mut(&mut data, id)? {
            Row::Event(event) => event.event_data = events,
            _ => {
                tracing::warn!(row = id, "events can only be set on event rows");
                return Ok(());
            }
        }
        update_separator_row_dates(&mut data);
        self.commit(data);
        Ok(())
    }

    /// Swap in a new calendar, keep every row's counted duration and
    /// repropagate.
    pub(super) fn set_calendar(&mut self, calendar: Calendar) -> Result<()> {
        if calendar == self.calendar {
            return Ok(());
        }
        self.calendar = calendar;
        let mut data = self.working_copy();
        reset_end_dates(&mut data, &self.calendar);
        resolve_in_place(&mut data, &self.calendar, &[]);
        self.commit(data);
        Ok(())
    }

    pub(super) fn set_colors(&mut self, colors: Vec<ColorInfo>) -> Result<()> {
        for color in &colors {
            Self::check_length(&color.alias, "alias", self.settings.max_alias_length)?;
        }
        self.colors = colors;
        self.is_saved = false;
        Ok(())
    }

    pub(super) fn set_color_alias(&mut self, index: usize, alias: String) -> Result<()> {
        Self::check_length(&alias, "alias", self.settings.max_alias_length)?;
        match self.colors.get_mut(index) {
            Some(color) => {
                color.alias = alias;
                self.is_saved = false;
            }
            None => tracing::warn!(index, "no such color"),
        }
        Ok(())
    }
}
