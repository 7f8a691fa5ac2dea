use std::path::Path;

use crate::model::date::format_date;
use crate::model::{Row, RowMap};
use crate::Result;

/// Column headers, in the order [`export_csv`] writes them.
pub const HEADERS: [&str; 16] = [
    "No",
    "Type",
    "Level",
    "Name",
    "Color",
    "Plan Start",
    "Plan End",
    "Days",
    "Actual Start",
    "Actual End",
    "Progress",
    "Dependency",
    "Include Holidays",
    "Text1",
    "Text2",
    "Text3",
];

fn date_cell(date: Option<chrono::NaiveDate>) -> String {
    date.map(format_date).unwrap_or_default()
}

fn record(row: &Row) -> Vec<String> {
    match row {
        Row::Chart(r) => vec![
            r.no.to_string(),
            "chart".into(),
            String::new(),
            r.display_name.clone(),
            r.color.clone(),
            date_cell(r.planned_start_date),
            date_cell(r.planned_end_date),
            r.planned_days.map(|d| d.to_string()).unwrap_or_default(),
            date_cell(r.actual_start_date),
            date_cell(r.actual_end_date),
            r.progress.clone(),
            r.dependency.as_ref().map(|d| d.to_string()).unwrap_or_default(),
            r.is_include_holidays.to_string(),
            r.text_column1.clone(),
            r.text_column2.clone(),
            r.text_column3.clone(),
        ],
        Row::Separator(r) => {
            let mut cells = vec![String::new(); HEADERS.len()];
            cells[0] = r.no.to_string();
            cells[1] = "separator".into();
            cells[2] = r.level.to_string();
            cells[3] = r.display_name.clone();
            cells[5] = date_cell(r.min_start_date);
            cells[6] = date_cell(r.max_end_date);
            cells
        }
        Row::Event(r) => {
            // Event rows export their overall span.
            let (start, end) = row.date_span();
            let mut cells = vec![String::new(); HEADERS.len()];
            cells[0] = r.no.to_string();
            cells[1] = "event".into();
            cells[3] = r.display_name.clone();
            cells[4] = r.color.clone();
            cells[5] = date_cell(start);
            cells[6] = date_cell(end);
            cells[10] = r.progress.clone();
            cells[12] = r.is_include_holidays.to_string();
            cells[13] = r.text_column1.clone();
            cells[14] = r.text_column2.clone();
            cells[15] = r.text_column3.clone();
            cells
        }
    }
}

/// Export rows to a semicolon-delimited CSV file that [`super::import_csv`]
/// reads back. Dates are written as `YYYY/MM/DD`.
/// Returns the number of rows written.
pub fn export_csv(data: &RowMap, path: &Path) -> Result<usize> {
    let mut wtr = csv::WriterBuilder::new().delimiter(b';').from_path(path)?;
    wtr.write_record(HEADERS)?;
    for row in data {
        wtr.write_record(record(row))?;
    }
    wtr.flush()?;
    tracing::debug!(rows = data.len(), "exported CSV to {:?}", path);
    Ok(data.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChartRow, Dependency, SeparatorRow};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_export_writes_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rows.csv");

        let start = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let mut chart = ChartRow::new("b").with_dates(start, end);
        chart.no = 2;
        chart.display_name = "Build".into();
        chart.planned_days = Some(3);
        chart.dependency = Dependency::parse("after,-1,1").unwrap();
        let data = RowMap::from_rows(vec![
            Row::Separator(SeparatorRow {
                id: "s".into(),
                no: 1,
                display_name: "Phase".into(),
                level: 2,
                ..Default::default()
            }),
            Row::Chart(chart),
        ]);

        assert_eq!(export_csv(&data, &path).unwrap(), 2);
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("No;Type;Level;Name"));
        assert!(lines[1].starts_with("1;separator;2;Phase"));
        assert!(lines[2].contains("2;chart;;Build;;2024/01/08;2024/01/10;3"));
        assert!(lines[2].contains("after,-1,1"));
    }
}
