//! Structural edits: adding, removing, reordering and regrouping rows.

use std::collections::HashSet;

use super::{AppState, MessageInfo, Severity};
use crate::model::row::MAX_LEVEL;
use crate::model::{Row, RowKind, RowMap, SeparatorRow};
use crate::schedule::resolver::resolve_in_place;
use crate::schedule::create_task_chain;
use crate::Result;

fn id_set(ids: &[String]) -> HashSet<String> {
    ids.iter().cloned().collect()
}

impl AppState {
    /// Renumber, relink and commit after rows were added, removed or moved.
    fn restructure(&mut self, mut data: RowMap, seeds: &[String]) {
        data.assign_ids();
        resolve_in_place(&mut data, &self.calendar, seeds);
        self.commit(data);
    }

    pub(super) fn add_rows(&mut self, kind: RowKind, at: usize, count: usize) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        self.ensure_room(count)?;
        let mut data = self.working_copy();
        data.insert_many(at, (0..count).map(|_| Row::empty(kind)).collect());
        self.restructure(data, &[]);
        Ok(())
    }

    /// Paste rows at `at`. Pasted rows get fresh ids and their rules are
    /// re-read relative to where they land.
    pub(super) fn insert_copied_rows(&mut self, at: usize, rows: Vec<Row>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        self.ensure_room(rows.len())?;
        let pasted: Vec<Row> = rows
            .into_iter()
            .map(|mut row| {
                row.set_id(String::new());
                if let Row::Chart(chart) = &mut row {
                    chart.dependent_id.clear();
                    if let Some(dep) = chart.dependency.as_mut() {
                        dep.user_entered = true;
                    }
                }
                row
            })
            .collect();

        let mut data = self.working_copy();
        data.insert_many(at, pasted);
        self.restructure(data, &[]);
        Ok(())
    }

    /// Rules pointing at deleted rows are dropped.
    pub(super) fn delete_rows(&mut self, ids: &[String]) -> Result<()> {
        let mut data = self.working_copy();
        let removed = data.remove_ids(&id_set(ids));
        if removed.is_empty() {
            return Ok(());
        }
        tracing::debug!(count = removed.len(), "deleted rows");
        self.restructure(data, &[]);
        Ok(())
    }

    pub(super) fn move_rows(&mut self, ids: &[String], to: usize) -> Result<()> {
        let selected = id_set(ids);
        let mut data = self.working_copy();
        let to = to.min(data.len());
        let insert_at = data.rows()[..to]
            .iter()
            .filter(|row| !selected.contains(row.id()))
            .count();
        let moved = data.remove_ids(&selected);
        if moved.is_empty() {
            return Ok(());
        }
        data.insert_many(insert_at, moved);
        if data == *self.data {
            return Ok(());
        }
        self.restructure(data, &[]);
        Ok(())
    }

    /// Chart rows holding nothing but a name become separators.
    pub(super) fn convert_display_name_only_rows(&mut self, ids: &[String]) -> Result<()> {
        let mut data = self.working_copy();
        let mut converted = 0;
        for id in ids {
            let Some(row) = data.get_mut(id) else {
                continue;
            };
            let separator = match &*row {
                Row::Chart(chart) if chart.is_display_name_only() => SeparatorRow {
                    id: chart.id.clone(),
                    no: chart.no,
                    display_name: chart.display_name.clone(),
                    ..Default::default()
                },
                _ => continue,
            };
            *row = Row::Separator(separator);
            converted += 1;
        }
        if converted == 0 {
            return Ok(());
        }
        self.restructure(data, &[]);
        Ok(())
    }

    /// Shift separator levels by `delta`, clamped to `0..=MAX_LEVEL`.
    pub(super) fn change_level(&mut self, ids: &[String], delta: i8) -> Result<()> {
        let mut data = self.working_copy();
        let mut changed = false;
        for id in ids {
            if let Some(Row::Separator(sep)) = data.get_mut(id) {
                let level = (sep.level as i16 + delta as i16).clamp(0, MAX_LEVEL as i16) as u8;
                if level != sep.level {
                    sep.level = level;
                    changed = true;
                }
            }
        }
        if changed {
            self.commit(data);
        }
        Ok(())
    }

    pub(super) fn toggle_collapse(&mut self, id: &str) -> Result<()> {
        let mut data = self.working_copy();
        match data.get_mut(id) {
            Some(Row::Separator(sep)) => sep.is_collapsed = !sep.is_collapsed,
            _ => return Ok(()),
        }
        self.commit(data);
        Ok(())
    }

    pub(super) fn set_all_collapsed(&mut self, collapsed: bool) -> Result<()> {
        let mut data = self.working_copy();
        let mut changed = false;
        for id in data.iter().map(|r| r.id().to_string()).collect::<Vec<_>>() {
            if let Some(Row::Separator(sep)) = data.get_mut(&id) {
                changed |= sep.is_collapsed != collapsed;
                sep.is_collapsed = collapsed;
            }
        }
        if changed {
            self.commit(data);
        }
        Ok(())
    }

    pub(super) fn create_task_chain(&mut self, ids: &[String]) -> Result<()> {
        let mut data = self.working_copy();
        let linked = create_task_chain(&mut data, ids, &self.calendar);
        if linked == 0 {
            self.message_info = Some(MessageInfo::new(
                "Select at least two chart rows with dates to chain",
                Severity::Info,
            ));
            return Ok(());
        }
        resolve_in_place(&mut data, &self.calendar, ids);
        self.commit(data);
        Ok(())
    }
}
