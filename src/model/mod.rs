pub mod date;
pub mod dependency;
pub mod history;
pub mod project;
pub mod row;
pub mod row_map;

pub use dependency::{Dependency, DependencyKind, TargetRef};
pub use history::{Frame, UndoHistory};
pub use project::{ColorInfo, Column, ProjectData};
pub use row::{ChartRow, EventData, EventRow, Row, RowKind, SeparatorRow};
pub use row_map::RowMap;
