use chrono::NaiveDate;

use crate::model::row::{earliest, latest};
use crate::model::{Row, RowMap};

/// Refresh every separator's `min_start_date`/`max_end_date` from the dated
/// rows between it and the next separator.
pub fn update_separator_row_dates(data: &mut RowMap) {
    let mut spans: Vec<(String, Option<NaiveDate>, Option<NaiveDate>)> = Vec::new();
    for row in data.iter() {
        match row {
            Row::Separator(sep) => spans.push((sep.id.clone(), None, None)),
            other => {
                if let Some((_, min, max)) = spans.last_mut() {
                    let (start, end) = other.date_span();
                    *min = earliest(*min, start);
                    *max = latest(*max, end);
                }
            }
        }
    }

    for (id, min, max) in spans {
        if let Some(Row::Separator(sep)) = data.get_mut(&id) {
            sep.min_start_date = min;
            sep.max_end_date = max;
        }
    }
}
