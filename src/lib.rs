//! wbs-gantt - the scheduling core of a Gantt chart editor.
//!
//! Rows of a work-breakdown structure carry planned dates, working-day
//! counts and `after`/`sameas` dependency rules. Every edit goes through
//! [`app::AppState::apply`], which repropagates dependent dates, refreshes
//! separator rollups and records an undo frame.

pub mod app;
pub mod config;
pub mod io;
pub mod model;
pub mod schedule;
pub mod snapshot;

pub use app::{reduce, Action, AppState, MessageInfo, Severity};
pub use config::EngineSettings;
pub use model::{ProjectData, Row, RowMap};
pub use schedule::Calendar;

/// Library-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unsupported dependency type: {0}")]
    UnsupportedDependencyType(String),

    #[error("CSV format error: {0}")]
    CsvFormat(String),

    #[error("Row not found: {0}")]
    RowNotFound(String),

    #[error("Row is not a chart row: {0}")]
    NotAChartRow(String),

    #[error("The number of rows must stay below {limit}")]
    RowLimitExceeded { limit: usize },

    #[error("{field} must be at most {limit} characters")]
    TextTooLong { field: &'static str, limit: usize },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("Editing is disabled while viewing a past snapshot")]
    ViewingPast,
}

impl Error {
    /// Errors the user caused and can correct; these surface as a message
    /// instead of an error log.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::RowLimitExceeded { .. }
                | Error::TextTooLong { .. }
                | Error::InvalidDate(_)
                | Error::ViewingPast
        )
    }
}

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, Error>;
