use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use super::calendar::{calculate_planned_days, Calendar};
use crate::model::{Dependency, DependencyKind, Row, RowMap, TargetRef};

/// Link the selected rows into a chain, each depending on the one before it
/// in selection order, with rules that reproduce their current dates.
///
/// Non-chart rows are ignored. Pairs missing a date are skipped. Returns the
/// number of rules written; zero when fewer than two chart rows are selected.
pub fn create_task_chain(data: &mut RowMap, ids: &[String], calendar: &Calendar) -> usize {
    let mut seen = HashSet::new();
    let selected: Vec<&String> = ids
        .iter()
        .filter(|id| data.get(id.as_str()).is_some_and(Row::is_chart))
        .filter(|id| seen.insert(id.as_str()))
        .collect();
    if selected.len() < 2 {
        return 0;
    }

    let chart_pos: HashMap<String, usize> = data
        .chart_ids()
        .into_iter()
        .enumerate()
        .map(|(i, id)| (id, i))
        .collect();

    let mut linked = 0;
    for pair in selected.windows(2) {
        let (prev_id, cur_id) = (pair[0], pair[1]);
        let Some(prev) = data.get(prev_id).and_then(Row::as_chart) else {
            continue;
        };
        let (Some(prev_start), Some(prev_end)) = (prev.planned_start_date, prev.planned_end_date)
        else {
            continue;
        };
        let Some(cur) = data.get_mut(cur_id).and_then(Row::as_chart_mut) else {
            continue;
        };
        let (Some(cur_start), Some(cur_end)) = (cur.planned_start_date, cur.planned_end_date) else {
            continue;
        };

        let distance = chart_pos[prev_id] as i32 - chart_pos[cur_id] as i32;
        let include = cur.is_include_holidays
            || calendar.is_day_off(prev_end)
            || calendar.is_day_off(cur_start);

        let dependency = if cur_start == prev_start {
            Dependency::new(DependencyKind::SameAs, TargetRef::Relative(distance), None)
        } else {
            let offset = gap_days(prev_end, cur_start, calendar, include);
            Dependency::new(DependencyKind::After, TargetRef::Relative(distance), Some(offset))
        };

        cur.is_include_holidays = include;
        cur.planned_days = Some(calculate_planned_days(cur_start, cur_end, calendar, include));
        cur.dependency = Some(dependency);
        cur.dependent_id = prev_id.clone();
        linked += 1;
    }
    tracing::debug!(selected = selected.len(), linked, "created task chain");
    linked
}

/// Signed counted days from `prev_end` (not counted) to `next_start`, such
/// that walking that many days from `prev_end` lands on `next_start`.
fn gap_days(prev_end: NaiveDate, next_start: NaiveDate, calendar: &Calendar, include: bool) -> i64 {
    if next_start > prev_end {
        let from = prev_end.succ_opt().unwrap_or(prev_end);
        calculate_planned_days(from, next_start, calendar, include)
    } else if next_start < prev_end {
        let to = prev_end.pred_opt().unwrap_or(prev_end);
        -calculate_planned_days(next_start, to, calendar, include)
    } else {
        0
    }
}
