use std::path::Path;

use chrono::NaiveDate;

use crate::model::date::parse_date;
use crate::model::row::MAX_LEVEL;
use crate::model::{ChartRow, Dependency, EventData, EventRow, Row, SeparatorRow};
use crate::schedule::{add_planned_days, calculate_planned_days, Calendar};
use crate::{Error, Result};

/// Columns the importer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Type,
    Level,
    Name,
    Color,
    Start,
    End,
    Days,
    ActualStart,
    ActualEnd,
    Progress,
    Dependency,
    IncludeHolidays,
    Text1,
    Text2,
    Text3,
}

/// Accepts the stored format plus common day-first spellings.
fn parse_cell_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    parse_date(s).or_else(|| {
        ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"]
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    })
}

/// Detect delimiter by checking the first line for common separators.
fn detect_delimiter(first_line: &str) -> u8 {
    let semicolons = first_line.matches(';').count();
    let commas = first_line.matches(',').count();
    let tabs = first_line.matches('\t').count();

    if semicolons >= commas && semicolons >= tabs {
        b';'
    } else if tabs >= commas {
        b'\t'
    } else {
        b','
    }
}

fn normalize_header(h: &str) -> String {
    h.trim().to_lowercase().replace([' ', '-', '_'], "")
}

fn header_to_field(normalized: &str) -> Option<Field> {
    let field = match normalized {
        "type" | "rowtype" | "kind" => Field::Type,
        "level" | "indent" | "depth" => Field::Level,
        "name" | "displayname" | "task" | "tasklabel" | "taskname" | "label" | "title"
        | "activity" => Field::Name,
        "color" | "colour" => Field::Color,
        "planstart" | "plannedstart" | "plannedstartdate" | "start" | "startdate" | "begin" => {
            Field::Start
        }
        "planend" | "plannedend" | "plannedenddate" | "end" | "enddate" | "finish" | "due" => {
            Field::End
        }
        "days" | "planneddays" | "duration" => Field::Days,
        "actualstart" | "actualstartdate" => Field::ActualStart,
        "actualend" | "actualenddate" => Field::ActualEnd,
        "progress" | "status" | "percent" => Field::Progress,
        "dependency" | "dependson" | "predecessor" => Field::Dependency,
        "includeholidays" | "isincludeholidays" => Field::IncludeHolidays,
        "text1" | "textcolumn1" => Field::Text1,
        "text2" | "textcolumn2" => Field::Text2,
        "text3" | "textcolumn3" => Field::Text3,
        _ => return None,
    };
    Some(field)
}

fn truthy(s: &str) -> bool {
    matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1" | "y")
}

/// One parsed line, before it becomes a row.
#[derive(Default)]
struct Cells {
    kind: String,
    level: String,
    name: String,
    color: String,
    start: String,
    end: String,
    days: String,
    actual_start: String,
    actual_end: String,
    progress: String,
    dependency: String,
    include_holidays: String,
    text: [String; 3],
}

impl Cells {
    fn set(&mut self, field: Field, value: &str) {
        let value = value.trim().to_string();
        match field {
            Field::Type => self.kind = value,
            Field::Level => self.level = value,
            Field::Name => self.name = value,
            Field::Color => self.color = value,
            Field::Start => self.start = value,
            Field::End => self.end = value,
            Field::Days => self.days = value,
            Field::ActualStart => self.actual_start = value,
            Field::ActualEnd => self.actual_end = value,
            Field::Progress => self.progress = value,
            Field::Dependency => self.dependency = value,
            Field::IncludeHolidays => self.include_holidays = value,
            Field::Text1 => self.text[0] = value,
            Field::Text2 => self.text[1] = value,
            Field::Text3 => self.text[2] = value,
        }
    }

    fn is_blank(&self) -> bool {
        self.name.is_empty() && self.start.is_empty() && self.end.is_empty()
    }
}

/// Parse a date cell, warning about unreadable values.
fn date_of(line: usize, column: &str, value: &str) -> Option<NaiveDate> {
    if value.is_empty() {
        return None;
    }
    let date = parse_cell_date(value);
    if date.is_none() {
        tracing::warn!(line, "ignoring invalid {} {:?}", column, value);
    }
    date
}

fn to_row(line: usize, cells: Cells, calendar: &Calendar) -> Row {
    let start = date_of(line, "start date", &cells.start);
    let end = date_of(line, "end date", &cells.end);
    let [text1, text2, text3] = cells.text;

    match cells.kind.to_lowercase().as_str() {
        "separator" | "section" | "group" | "phase" => Row::Separator(SeparatorRow {
            display_name: cells.name,
            level: cells.level.parse::<u8>().unwrap_or(0).min(MAX_LEVEL),
            ..Default::default()
        }),
        "event" => Row::Event(EventRow {
            display_name: cells.name,
            color: cells.color,
            progress: cells.progress,
            is_include_holidays: truthy(&cells.include_holidays),
            event_data: if start.is_some() || end.is_some() {
                vec![EventData {
                    is_planned: true,
                    start_date: start,
                    end_date: end.or(start),
                    ..Default::default()
                }]
            } else {
                Vec::new()
            },
            text_column1: text1,
            text_column2: text2,
            text_column3: text3,
            ..Default::default()
        }),
        _ => {
            let mut chart = ChartRow {
                display_name: cells.name,
                color: cells.color,
                planned_start_date: start,
                planned_end_date: end,
                actual_start_date: date_of(line, "actual start", &cells.actual_start),
                actual_end_date: date_of(line, "actual end", &cells.actual_end),
                progress: cells.progress,
                is_include_holidays: truthy(&cells.include_holidays),
                text_column1: text1,
                text_column2: text2,
                text_column3: text3,
                ..Default::default()
            };
            let days = cells.days.parse::<i64>().ok().filter(|d| *d >= 0);
            match (start, end) {
                (Some(s), Some(e)) if s <= e => {
                    chart.planned_days =
                        Some(calculate_planned_days(s, e, calendar, chart.is_include_holidays));
                }
                (Some(s), _) => {
                    chart.planned_days = days;
                    chart.planned_end_date =
                        add_planned_days(Some(s), days, calendar, chart.is_include_holidays, true)
                            .filter(|_| days.is_some_and(|d| d > 0));
                }
                _ => chart.planned_days = days,
            }
            chart.dependency = match Dependency::parse(&cells.dependency) {
                Ok(Some(mut dep)) => {
                    dep.user_entered = true;
                    Some(dep)
                }
                Ok(None) => None,
                Err(e) => {
                    tracing::warn!(line, "dropping dependency: {}", e);
                    None
                }
            };
            Row::Chart(chart)
        }
    }
}

/// Import rows from a CSV file.
///
/// Auto-detects the delimiter (comma, semicolon, tab) and matches headers
/// loosely ("Plan Start", "start_date", ...). A name column is required.
/// Imported rules are read relative to the imported order. Returns
/// `(rows, skipped_count)`; rows carry no ids yet.
pub fn import_csv(path: &Path, calendar: &Calendar) -> Result<(Vec<Row>, usize)> {
    let content = std::fs::read_to_string(path)?;

    let first_line = content.lines().next().unwrap_or("");
    let delimiter = detect_delimiter(first_line);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let fields: Vec<Option<Field>> = headers
        .iter()
        .map(|h| header_to_field(&normalize_header(h)))
        .collect();

    if !fields.contains(&Some(Field::Name)) {
        let found: Vec<&str> = headers.iter().collect();
        return Err(Error::CsvFormat(format!(
            "missing a name column; found headers {:?}",
            found
        )));
    }

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (i, result) in reader.records().enumerate() {
        let line = i + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(line, "skipping CSV row: {}", e);
                skipped += 1;
                continue;
            }
        };

        let mut cells = Cells::default();
        for (value, field) in record.iter().zip(&fields) {
            if let Some(field) = field {
                cells.set(*field, value);
            }
        }
        if cells.is_blank() {
            skipped += 1;
            continue;
        }
        rows.push(to_row(line, cells, calendar));
    }

    if rows.is_empty() {
        return Err(Error::CsvFormat(format!(
            "no usable rows ({} skipped)",
            skipped
        )));
    }
    tracing::debug!(rows = rows.len(), skipped, "imported CSV from {:?}", path);
    Ok((rows, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::csv_export::export_csv;
    use crate::model::RowMap;
    use tempfile::TempDir;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn write(dir: &TempDir, text: &str) -> std::path::PathBuf {
        let path = dir.path().join("in.csv");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c"), b';');
        assert_eq!(detect_delimiter("a,b,c"), b',');
        assert_eq!(detect_delimiter("a\tb\tc"), b'\t');
    }

    #[test]
    fn test_import_flexible_headers() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "Task Name,Start Date,End Date,Status\n\
             Design,01/01/2024,05/01/2024,40\n\
             Review,2024-01-08,,\n\
             ,,,\n",
        );
        let (rows, skipped) = import_csv(&path, &Calendar::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(skipped, 1);

        let design = rows[0].as_chart().unwrap();
        assert_eq!(design.display_name, "Design");
        assert_eq!(design.planned_start_date, Some(d(2024, 1, 1)));
        assert_eq!(design.planned_end_date, Some(d(2024, 1, 5)));
        assert_eq!(design.planned_days, Some(5));
        assert_eq!(design.progress, "40");

        let review = rows[1].as_chart().unwrap();
        assert_eq!(review.planned_end_date, None);
    }

    #[test]
    fn test_import_days_without_end() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "Name;Start;Days\nBuild;2024/01/08;3\n");
        let (rows, _) = import_csv(&path, &Calendar::default()).unwrap();
        let build = rows[0].as_chart().unwrap();
        assert_eq!(build.planned_end_date, Some(d(2024, 1, 10)));
        assert_eq!(build.planned_days, Some(3));
    }

    #[test]
    fn test_missing_name_column() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "Start;End\n2024/01/01;2024/01/02\n");
        assert!(matches!(
            import_csv(&path, &Calendar::default()),
            Err(Error::CsvFormat(_))
        ));
    }

    #[test]
    fn test_unknown_dependency_type_is_dropped() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "Name;Dependency\nA;\nB;before,-1\nC;after,-2\n");
        let (rows, _) = import_csv(&path, &Calendar::default()).unwrap();
        assert!(rows[1].as_chart().unwrap().dependency.is_none());
        let dep = rows[2].as_chart().unwrap().dependency.as_ref().unwrap();
        assert!(dep.user_entered);
    }

    #[test]
    fn test_export_then_import() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rows.csv");
        let mut chart = ChartRow::new("a").with_dates(d(2024, 1, 1), d(2024, 1, 5));
        chart.no = 2;
        chart.display_name = "Design".into();
        chart.planned_days = Some(5);
        chart.text_column3 = "note".into();
        let data = RowMap::from_rows(vec![
            Row::Separator(SeparatorRow {
                id: "s".into(),
                no: 1,
                display_name: "Phase 1".into(),
                level: 1,
                ..Default::default()
            }),
            Row::Chart(chart),
            Row::Event(EventRow {
                id: "e".into(),
                no: 3,
                display_name: "Launch".into(),
                event_data: vec![EventData {
                    start_date: Some(d(2024, 2, 1)),
                    end_date: Some(d(2024, 2, 1)),
                    ..Default::default()
                }],
                ..Default::default()
            }),
        ]);
        export_csv(&data, &path).unwrap();

        let (rows, skipped) = import_csv(&path, &Calendar::default()).unwrap();
        assert_eq!(skipped, 0);
        match &rows[0] {
            Row::Separator(s) => {
                assert_eq!(s.display_name, "Phase 1");
                assert_eq!(s.level, 1);
            }
            other => panic!("unexpected {:?}", other),
        }
        let design = rows[1].as_chart().unwrap();
        assert_eq!(design.planned_end_date, Some(d(2024, 1, 5)));
        assert_eq!(design.text_column3, "note");
        assert_eq!(rows[2].date_span(), (Some(d(2024, 2, 1)), Some(d(2024, 2, 1))));
    }
}
