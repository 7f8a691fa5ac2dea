//! Scheduling rules: working-day calendars, dependency propagation,
//! separator rollups and task chains.

pub mod calendar;
pub mod chain;
pub mod resolver;
pub mod rollup;

pub use calendar::{
    add_planned_days, calculate_planned_days, is_holiday, is_regular_day_off, parse_holidays,
    subtract_planned_days, Calendar,
};
pub use chain::create_task_chain;
pub use resolver::{
    build_dependency_map, calculate_dependencies, resolve_dependencies, update_dependent_rows,
    DependencyMap, Direction,
};
pub use rollup::update_separator_row_dates;
