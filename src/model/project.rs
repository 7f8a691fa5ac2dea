use serde::{Deserialize, Serialize};

use super::row_map::RowMap;
use crate::schedule::Calendar;

/// A table column as the spreadsheet view lays it out.
///
/// The engine never interprets columns; it only carries them through undo
/// frames and files. Unknown keys are preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub column_id: String,
    #[serde(default)]
    pub column_name: Option<String>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_true() -> bool {
    true
}

impl Column {
    pub fn new(column_id: impl Into<String>, column_name: impl Into<String>, width: f64) -> Self {
        Self {
            column_id: column_id.into(),
            column_name: Some(column_name.into()),
            width: Some(width),
            visible: true,
            extra: serde_json::Map::new(),
        }
    }
}

/// The stock column layout of a new project.
pub fn default_columns() -> Vec<Column> {
    vec![
        Column::new("no", "No", 30.0),
        Column::new("displayName", "Name", 200.0),
        Column::new("color", "Color", 50.0),
        Column::new("plannedStartDate", "Plan Start", 90.0),
        Column::new("plannedEndDate", "Plan End", 90.0),
        Column::new("plannedDays", "Days", 50.0),
        Column::new("actualStartDate", "Actual Start", 90.0),
        Column::new("actualEndDate", "Actual End", 90.0),
        Column::new("dependency", "Dependency", 90.0),
        Column::new("progress", "Progress", 60.0),
        Column::new("textColumn1", "Text1", 80.0),
        Column::new("textColumn2", "Text2", 80.0),
        Column::new("textColumn3", "Text3", 80.0),
    ]
}

/// A named bar color; chart rows refer to it by alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorInfo {
    pub alias: String,
    /// CSS color, e.g. `#4682b4`.
    pub color: String,
}

/// Default palette, adapted from the steel-blue/green/orchid task colors.
pub fn default_colors() -> Vec<ColorInfo> {
    [
        "#4682b4", "#3cb371", "#da70d6", "#6a5acd", "#dc143c", "#ffa500", "#b4643c", "#708090",
    ]
    .into_iter()
    .map(|color| ColorInfo {
        alias: String::new(),
        color: color.to_string(),
    })
    .collect()
}

/// Everything a project file holds. This is also the payload of snapshots
/// and the backup taken while previewing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub data: RowMap,
    #[serde(default = "default_columns")]
    pub columns: Vec<Column>,
    #[serde(flatten)]
    pub calendar: Calendar,
    #[serde(default = "default_colors")]
    pub colors: Vec<ColorInfo>,
    /// Note tree, owned by the note editor.
    #[serde(default)]
    pub notes: serde_json::Value,
}

impl Default for ProjectData {
    fn default() -> Self {
        Self {
            title: "Untitled Project".to_string(),
            data: RowMap::new(),
            columns: default_columns(),
            calendar: Calendar::default(),
            colors: default_colors(),
            notes: serde_json::Value::Null,
        }
    }
}

impl ProjectData {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}
