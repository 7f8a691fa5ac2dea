//! Dependency resolution and date propagation.
//!
//! A chart row's `dependency` names another chart row. The resolver links
//! each rule to a row id, builds the reverse map (`target -> dependents`) and
//! pushes date changes along it. Every propagation pass carries a `visited`
//! set so each row is recomputed at most once, which keeps cyclic rules from
//! looping.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use super::calendar::{add_planned_days, calculate_planned_days, subtract_planned_days, Calendar};
use super::rollup::update_separator_row_dates;
use crate::model::{ChartRow, Dependency, DependencyKind, Row, RowMap, TargetRef};

/// `target id -> ids of the rows depending on it`, dependents in row order.
pub type DependencyMap = HashMap<String, Vec<String>>;

/// Which way dates are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// A dependent row's dates from its target's.
    Forward,
    /// A target row's dates from its dependent's start.
    Back,
}

/// Build the reverse dependency map from resolved `dependent_id`s.
pub fn build_dependency_map(data: &RowMap) -> DependencyMap {
    let mut map = DependencyMap::new();
    for row in data {
        if let Row::Chart(chart) = row {
            if chart.dependency.is_some() && !chart.dependent_id.is_empty() {
                map.entry(chart.dependent_id.clone())
                    .or_default()
                    .push(chart.id.clone());
            }
        }
    }
    map
}

/// Dates for one row under a dependency rule.
///
/// `base` is the target's end (`after`) or start (`sameas`) going forward,
/// and the dependent's start going back. `planned_days` and
/// `include_holidays` belong to the row being computed. Returns `None` when a
/// date cannot be produced.
pub fn calculate_dependencies(
    kind: DependencyKind,
    offset: i64,
    base: NaiveDate,
    planned_days: i64,
    calendar: &Calendar,
    include_holidays: bool,
    direction: Direction,
) -> Option<(NaiveDate, NaiveDate)> {
    let add = |from: NaiveDate, days: i64, with_start: bool| {
        add_planned_days(Some(from), Some(days), calendar, include_holidays, with_start)
    };
    let subtract = |from: NaiveDate, days: i64, with_start: bool| {
        subtract_planned_days(Some(from), Some(days), calendar, include_holidays, with_start)
    };

    match (kind, direction) {
        (DependencyKind::After, Direction::Forward) => {
            let start = if offset >= 0 {
                add(base, offset, false)?
            } else {
                subtract(base, -offset, false)?
            };
            Some((start, add(start, planned_days, true)?))
        }
        (DependencyKind::After, Direction::Back) => {
            let end = if offset >= 0 {
                subtract(base, offset, false)?
            } else {
                add(base, -offset, false)?
            };
            Some((subtract(end, planned_days, true)?, end))
        }
        (DependencyKind::SameAs, _) => Some((base, add(base, planned_days, true)?)),
    }
}

/// Re-link every dependency, rebuild the dependency map, propagate dates
/// from every row that has dependents and refresh separator rollups.
pub fn resolve_dependencies(data: &RowMap, calendar: &Calendar) -> (RowMap, DependencyMap) {
    let mut updated = data.clone();
    let map = resolve_in_place(&mut updated, calendar, &[]);
    (updated, map)
}

/// In-place form of [`resolve_dependencies`]. Rows in `seeds` propagate
/// first, so their dates win over rows reached later in the pass.
pub(crate) fn resolve_in_place(
    data: &mut RowMap,
    calendar: &Calendar,
    seeds: &[String],
) -> DependencyMap {
    let map = link_dependencies(data);

    let mut visited = HashSet::new();
    let roots: Vec<String> = data
        .iter()
        .map(|r| r.id().to_string())
        .filter(|id| map.contains_key(id))
        .collect();
    for id in seeds.iter().chain(roots.iter()) {
        let Some(chart) = data.get(id).and_then(Row::as_chart) else {
            continue;
        };
        let (start, end) = (chart.planned_start_date, chart.planned_end_date);
        update_dependent_rows(data, &map, calendar, id, start, end, &mut visited);
    }
    tracing::debug!(
        rows = data.len(),
        links = map.values().map(Vec::len).sum::<usize>(),
        visited = visited.len(),
        "resolved dependencies"
    );

    update_separator_row_dates(data);
    map
}

/// Link every chart row's rule to its target and return the resulting map.
/// Dates are not touched.
pub(crate) fn link_dependencies(data: &mut RowMap) -> DependencyMap {
    let chart_ids = data.chart_ids();
    let chart_pos: HashMap<String, usize> = chart_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.clone(), i))
        .collect();
    for id in &chart_ids {
        update_dependency(data, &chart_ids, &chart_pos, id);
    }
    build_dependency_map(data)
}

/// Link one chart row's rule to a target row.
///
/// User-typed rules (and rules with no link yet) resolve by their text on
/// every pass: a relative reference counts chart rows from this row, an
/// absolute one matches a row number. Their text and marker are never
/// touched. Linked system rules follow their target id and have their text
/// rewritten to the target's current position. A rule that cannot be resolved
/// is dropped together with its link.
fn update_dependency(
    data: &mut RowMap,
    chart_ids: &[String],
    chart_pos: &HashMap<String, usize>,
    id: &str,
) {
    let Some(row) = data.get(id).and_then(Row::as_chart) else {
        return;
    };
    let Some(mut dep) = row.dependency.clone() else {
        if !row.dependent_id.is_empty() {
            set_link(data, id, None, String::new());
        }
        return;
    };
    let Some(&self_pos) = chart_pos.get(id) else {
        return;
    };

    let by_id = !dep.user_entered && !row.dependent_id.is_empty();
    let target_id = if by_id {
        data.get(&row.dependent_id)
            .filter(|r| r.is_chart())
            .map(|r| r.id().to_string())
    } else {
        match dep.target {
            TargetRef::Relative(n) => {
                let pos = self_pos as i64 + n as i64;
                usize::try_from(pos).ok().and_then(|p| chart_ids.get(p)).cloned()
            }
            TargetRef::Absolute(no) => data
                .by_no(no as usize)
                .filter(|r| r.is_chart())
                .map(|r| r.id().to_string()),
        }
    }
    .filter(|target| target != id);

    let Some(target_id) = target_id else {
        tracing::debug!(row = id, "dropping dependency {} with missing target", dep);
        set_link(data, id, None, String::new());
        return;
    };

    if by_id {
        dep.target = match dep.target {
            TargetRef::Relative(_) => {
                let target_pos = chart_pos.get(&target_id).copied().unwrap_or(self_pos);
                TargetRef::Relative(target_pos as i32 - self_pos as i32)
            }
            TargetRef::Absolute(_) => {
                let no = data.get(&target_id).map(Row::no).unwrap_or_default();
                TargetRef::Absolute(no as u32)
            }
        };
    }
    set_link(data, id, Some(dep), target_id);
}

fn set_link(data: &mut RowMap, id: &str, dependency: Option<Dependency>, dependent_id: String) {
    if let Some(chart) = data.get_mut(id).and_then(Row::as_chart_mut) {
        chart.dependency = dependency;
        chart.dependent_id = dependent_id;
    }
}

/// Stored `planned_days`, or the count derived from the row's dates.
fn planned_days_of(row: &ChartRow, calendar: &Calendar) -> Option<i64> {
    row.planned_days.or_else(|| match (row.planned_start_date, row.planned_end_date) {
        (Some(s), Some(e)) => Some(calculate_planned_days(s, e, calendar, row.is_include_holidays)),
        _ => None,
    })
}

/// Give `current_id` the new dates and carry the change to every row linked
/// to it, in depth-first order.
///
/// For each row reached: its own target (if unvisited) is moved back to fit
/// the row's new start, then each unvisited dependent is moved forward from
/// the row's new dates. Rows already in `visited`, and rows without both
/// dates, are left alone.
pub fn update_dependent_rows(
    data: &mut RowMap,
    map: &DependencyMap,
    calendar: &Calendar,
    current_id: &str,
    new_start: Option<NaiveDate>,
    new_end: Option<NaiveDate>,
    visited: &mut HashSet<String>,
) {
    let mut stack = vec![(current_id.to_string(), new_start, new_end)];

    while let Some((id, start, end)) = stack.pop() {
        if visited.contains(&id) {
            continue;
        }
        let (Some(start), Some(end)) = (start, end) else {
            continue;
        };
        let Some(row) = data.get_mut(&id).and_then(Row::as_chart_mut) else {
            continue;
        };
        visited.insert(id.clone());
        row.planned_start_date = Some(start);
        row.planned_end_date = Some(end);

        let upstream = row
            .dependency
            .as_ref()
            .filter(|_| !row.dependent_id.is_empty())
            .map(|dep| (dep.kind, dep.effective_offset(), row.dependent_id.clone()));

        let mut next = Vec::new();

        if let Some((kind, offset, target_id)) = upstream {
            if !visited.contains(&target_id) {
                if let Some(target) = data.get(&target_id).and_then(Row::as_chart) {
                    let dates = planned_days_of(target, calendar).and_then(|days| {
                        calculate_dependencies(
                            kind,
                            offset,
                            start,
                            days,
                            calendar,
                            target.is_include_holidays,
                            Direction::Back,
                        )
                    });
                    if let Some((s, e)) = dates {
                        next.push((target_id, Some(s), Some(e)));
                    }
                }
            }
        }

        for dependent_id in map.get(&id).into_iter().flatten() {
            if visited.contains(dependent_id) {
                continue;
            }
            let Some(dependent) = data.get(dependent_id).and_then(Row::as_chart) else {
                continue;
            };
            let Some(dep) = dependent.dependency.as_ref() else {
                continue;
            };
            let base = match dep.kind {
                DependencyKind::After => end,
                DependencyKind::SameAs => start,
            };
            let dates = planned_days_of(dependent, calendar).and_then(|days| {
                calculate_dependencies(
                    dep.kind,
                    dep.effective_offset(),
                    base,
                    days,
                    calendar,
                    dependent.is_include_holidays,
                    Direction::Forward,
                )
            });
            if let Some((s, e)) = dates {
                next.push((dependent_id.clone(), Some(s), Some(e)));
            }
        }

        // Reverse so the upstream target is popped first, then dependents in order.
        stack.extend(next.into_iter().rev());
    }
}
