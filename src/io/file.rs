use std::path::Path;

use crate::model::ProjectData;
use crate::Result;

/// Save a project to a JSON file.
pub fn save_project(project: &ProjectData, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(project)?;
    std::fs::write(path, json)?;
    tracing::debug!(rows = project.data.len(), "saved project to {:?}", path);
    Ok(())
}

/// Load a project from a JSON file.
pub fn load_project(path: &Path) -> Result<ProjectData> {
    let json = std::fs::read_to_string(path)?;
    let project: ProjectData = serde_json::from_str(&json)?;
    tracing::debug!(rows = project.data.len(), "loaded project from {:?}", path);
    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChartRow, Row, RowMap};
    use crate::Error;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plan.json");

        let mut project = ProjectData::new("Release");
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let mut row = ChartRow::new("a").with_dates(start, end);
        row.no = 1;
        row.planned_days = Some(5);
        project.data = RowMap::from_rows(vec![Row::Chart(row)]);
        project.calendar.holidays.insert(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());

        save_project(&project, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"plannedStartDate\": \"2024/01/01\""));
        assert_eq!(load_project(&path).unwrap(), project);
    }

    #[test]
    fn test_load_errors() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_project(&dir.path().join("missing.json")),
            Err(Error::Io(_))
        ));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(load_project(&bad), Err(Error::Json(_))));
    }
}
