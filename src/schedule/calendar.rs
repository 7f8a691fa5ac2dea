//! Working-day rules: which days count, and walking date ranges by counted days.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::model::date::{date_set_serde, parse_date};

/// Holidays plus weekly days off (0 = Sunday … 6 = Saturday).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Calendar {
    #[serde(with = "date_set_serde")]
    pub holidays: BTreeSet<NaiveDate>,
    pub regular_days_off: BTreeSet<u32>,
}

impl Default for Calendar {
    /// Saturdays and Sundays off, no holidays.
    fn default() -> Self {
        Self {
            holidays: BTreeSet::new(),
            regular_days_off: BTreeSet::from([0, 6]),
        }
    }
}

impl Calendar {
    pub fn new(
        holidays: impl IntoIterator<Item = NaiveDate>,
        regular_days_off: impl IntoIterator<Item = u32>,
    ) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
            regular_days_off: regular_days_off.into_iter().filter(|d| *d < 7).collect(),
        }
    }

    /// True for holidays and regular days off.
    pub fn is_day_off(&self, date: NaiveDate) -> bool {
        is_holiday(date, &self.holidays)
            || is_regular_day_off(date.weekday().num_days_from_sunday(), &self.regular_days_off)
    }

    /// Whether `date` counts toward a planned-day total.
    pub fn counts(&self, date: NaiveDate, include_holidays: bool) -> bool {
        include_holidays || !self.is_day_off(date)
    }

    /// A walk that skips days off can only finish if some weekday is worked.
    fn has_working_weekday(&self) -> bool {
        (0..7).any(|d| !self.regular_days_off.contains(&d))
    }
}

pub fn is_regular_day_off(day_of_week: u32, regular_days_off: &BTreeSet<u32>) -> bool {
    regular_days_off.contains(&day_of_week)
}

pub fn is_holiday(date: NaiveDate, holidays: &BTreeSet<NaiveDate>) -> bool {
    holidays.contains(&date)
}

/// Counted days in `[start, end]`, both ends included. Zero when `start > end`.
pub fn calculate_planned_days(
    start: NaiveDate,
    end: NaiveDate,
    calendar: &Calendar,
    include_holidays: bool,
) -> i64 {
    if start > end {
        return 0;
    }
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| calendar.counts(*d, include_holidays))
        .count() as i64
}

/// Walk forward from `start` until `days` counted days have passed.
///
/// With `include_start_day` the walk begins on the day before `start`, so
/// `start` itself can be day 1; `days == 0` then lands on that previous day.
/// Without it `start` is never counted and `days == 0` returns `start`.
pub fn add_planned_days(
    start: Option<NaiveDate>,
    days: Option<i64>,
    calendar: &Calendar,
    include_holidays: bool,
    include_start_day: bool,
) -> Option<NaiveDate> {
    walk(start?, days?, calendar, include_holidays, include_start_day, Direction::Forward)
}

/// Mirror image of [`add_planned_days`], walking backward from `start`.
pub fn subtract_planned_days(
    start: Option<NaiveDate>,
    days: Option<i64>,
    calendar: &Calendar,
    include_holidays: bool,
    include_start_day: bool,
) -> Option<NaiveDate> {
    walk(start?, days?, calendar, include_holidays, include_start_day, Direction::Backward)
}

#[derive(Clone, Copy)]
enum Direction {
    Forward,
    Backward,
}

fn walk(
    start: NaiveDate,
    days: i64,
    calendar: &Calendar,
    include_holidays: bool,
    include_start_day: bool,
    direction: Direction,
) -> Option<NaiveDate> {
    if days < 0 {
        return None;
    }
    if days > 0 && !include_holidays && !calendar.has_working_weekday() {
        tracing::warn!("every weekday is a regular day off; cannot count {} days", days);
        return None;
    }

    let step = |d: NaiveDate| match direction {
        Direction::Forward => d.succ_opt(),
        Direction::Backward => d.pred_opt(),
    };
    let back = |d: NaiveDate| match direction {
        Direction::Forward => d.pred_opt(),
        Direction::Backward => d.succ_opt(),
    };

    let mut date = if include_start_day { back(start)? } else { start };
    let mut count = 0;
    while count < days {
        date = step(date)?;
        if calendar.counts(date, include_holidays) {
            count += 1;
        }
    }
    Some(date)
}

/// Read holidays from free text: one entry per line or comma-separated,
/// each a date optionally followed by a label (`2024/01/01 New Year`).
pub fn parse_holidays(text: &str) -> Vec<NaiveDate> {
    text.split(['\n', ','])
        .filter_map(|entry| {
            let token = entry.split_whitespace().next()?;
            let date = parse_date(token);
            if date.is_none() {
                tracing::warn!("ignoring holiday entry {:?}", entry.trim());
            }
            date
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn weekends() -> Calendar {
        Calendar::default()
    }

    #[test]
    fn test_regular_day_off_and_holiday() {
        let cal = Calendar::new([d(2024, 1, 3)], [0, 6]);
        assert!(is_regular_day_off(0, &cal.regular_days_off));
        assert!(!is_regular_day_off(1, &cal.regular_days_off));
        assert!(is_holiday(d(2024, 1, 3), &cal.holidays));
        assert!(cal.is_day_off(d(2024, 1, 6))); // Saturday
        assert!(cal.is_day_off(d(2024, 1, 3)));
        assert!(!cal.is_day_off(d(2024, 1, 4)));
    }

    #[test]
    fn test_calendar_new_ignores_out_of_range_weekdays() {
        let cal = Calendar::new([], [1, 7, 9]);
        assert_eq!(cal.regular_days_off, BTreeSet::from([1]));
    }

    #[test]
    fn test_calculate_planned_days_working_week() {
        let cal = weekends();
        assert_eq!(calculate_planned_days(d(2024, 1, 1), d(2024, 1, 5), &cal, false), 5);
        assert_eq!(calculate_planned_days(d(2024, 1, 1), d(2024, 1, 7), &cal, false), 5);
        assert_eq!(calculate_planned_days(d(2024, 1, 1), d(2024, 1, 7), &cal, true), 7);
        assert_eq!(calculate_planned_days(d(2024, 1, 6), d(2024, 1, 7), &cal, false), 0);
    }

    #[test]
    fn test_calculate_planned_days_reversed_range() {
        let cal = weekends();
        assert_eq!(calculate_planned_days(d(2024, 1, 5), d(2024, 1, 1), &cal, true), 0);
    }

    #[test]
    fn test_working_day_count_invariant() {
        let cal = Calendar::new([d(2024, 2, 14), d(2024, 2, 17), d(2024, 3, 1)], [0, 3, 6]);
        let start = d(2024, 2, 1);
        for span in 0..60 {
            let end = start + chrono::Duration::days(span);
            let off = start
                .iter_days()
                .take_while(|x| *x <= end)
                .filter(|x| {
                    cal.holidays.contains(x)
                        || cal.regular_days_off.contains(&x.weekday().num_days_from_sunday())
                })
                .count() as i64;
            assert_eq!(calculate_planned_days(start, end, &cal, false), span + 1 - off);
            assert_eq!(calculate_planned_days(start, end, &cal, true), span + 1);
        }
    }

    #[test]
    fn test_add_planned_days_round_trip() {
        let cal = Calendar::new([d(2024, 1, 10)], [0, 6]);
        let start = d(2024, 1, 1);
        for include in [false, true] {
            for span in 0..40 {
                let end = start + chrono::Duration::days(span);
                if !cal.counts(end, include) {
                    continue;
                }
                let days = calculate_planned_days(start, end, &cal, include);
                assert_eq!(
                    add_planned_days(Some(start), Some(days), &cal, include, true),
                    Some(end),
                    "span {} include {}",
                    span,
                    include
                );
            }
        }
    }

    #[test]
    fn test_add_planned_days_skips_weekend() {
        let cal = weekends();
        // Friday + 1 working day, start not counted -> Monday
        assert_eq!(
            add_planned_days(Some(d(2024, 1, 5)), Some(1), &cal, false, false),
            Some(d(2024, 1, 8))
        );
        // Monday, 3 days inclusive -> Wednesday
        assert_eq!(
            add_planned_days(Some(d(2024, 1, 8)), Some(3), &cal, false, true),
            Some(d(2024, 1, 10))
        );
        // Including holidays the weekend counts.
        assert_eq!(
            add_planned_days(Some(d(2024, 1, 5)), Some(1), &cal, true, false),
            Some(d(2024, 1, 6))
        );
    }

    #[test]
    fn test_add_planned_days_zero() {
        let cal = weekends();
        let start = d(2024, 1, 3);
        assert_eq!(add_planned_days(Some(start), Some(0), &cal, false, false), Some(start));
        assert_eq!(
            add_planned_days(Some(start), Some(0), &cal, false, true),
            Some(d(2024, 1, 2))
        );
    }

    #[test]
    fn test_add_planned_days_rejects_bad_input() {
        let cal = weekends();
        assert_eq!(add_planned_days(None, Some(3), &cal, false, true), None);
        assert_eq!(add_planned_days(Some(d(2024, 1, 1)), None, &cal, false, true), None);
        assert_eq!(add_planned_days(Some(d(2024, 1, 1)), Some(-1), &cal, false, true), None);
    }

    #[test]
    fn test_add_planned_days_without_working_weekday() {
        let cal = Calendar::new([], 0..7);
        assert_eq!(add_planned_days(Some(d(2024, 1, 1)), Some(2), &cal, false, true), None);
        assert_eq!(
            add_planned_days(Some(d(2024, 1, 1)), Some(2), &cal, true, true),
            Some(d(2024, 1, 2))
        );
    }

    #[test]
    fn test_subtract_planned_days() {
        let cal = weekends();
        // Monday - 1 working day, start not counted -> previous Friday
        assert_eq!(
            subtract_planned_days(Some(d(2024, 1, 8)), Some(1), &cal, false, false),
            Some(d(2024, 1, 5))
        );
        // Friday, 5 days inclusive -> Monday
        assert_eq!(
            subtract_planned_days(Some(d(2024, 1, 5)), Some(5), &cal, false, true),
            Some(d(2024, 1, 1))
        );
        assert_eq!(
            subtract_planned_days(Some(d(2024, 1, 5)), Some(0), &cal, false, true),
            Some(d(2024, 1, 6))
        );
    }

    #[test]
    fn test_parse_holidays() {
        let text = "2024/01/01 New Year\n2024-05-03, 2024/05/04\nnot a date\n\n";
        assert_eq!(
            parse_holidays(text),
            vec![d(2024, 1, 1), d(2024, 5, 3), d(2024, 5, 4)]
        );
    }
}
