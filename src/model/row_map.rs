use std::collections::{HashMap, HashSet};

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use uuid::Uuid;

use super::row::Row;

/// Rows in display order, addressable by id.
///
/// Serialized as a JSON object keyed by row id; on load the rows are ordered
/// by their `no` field.
#[derive(Debug, Clone, Default)]
pub struct RowMap {
    rows: Vec<Row>,
    index: HashMap<String, usize>,
}

impl PartialEq for RowMap {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
    }
}

impl RowMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap rows as given, without renumbering.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut map = Self {
            rows,
            index: HashMap::new(),
        };
        map.reindex();
        map
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn get(&self, id: &str) -> Option<&Row> {
        self.index.get(id).map(|&i| &self.rows[i])
    }

    /// Mutable access to a row. Changing the row's id through this handle is
    /// not supported; use [`RowMap::assign_ids`] for that.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Row> {
        match self.index.get(id) {
            Some(&i) => self.rows.get_mut(i),
            None => None,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Display position (0-based) of a row.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Row occupying a 1-based row number.
    pub fn by_no(&self, no: usize) -> Option<&Row> {
        self.rows.iter().find(|r| r.no() == no)
    }

    /// Ids of chart rows in display order.
    pub fn chart_ids(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter(|r| r.is_chart())
            .map(|r| r.id().to_string())
            .collect()
    }

    pub fn insert(&mut self, at: usize, row: Row) {
        let at = at.min(self.rows.len());
        self.rows.insert(at, row);
        self.reindex();
    }

    /// Insert several rows at one position, keeping their order.
    pub fn insert_many(&mut self, at: usize, rows: Vec<Row>) {
        let at = at.min(self.rows.len());
        self.rows.splice(at..at, rows);
        self.reindex();
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
        self.reindex();
    }

    /// Remove every row whose id is in `ids`, returning the removed rows.
    pub fn remove_ids(&mut self, ids: &HashSet<String>) -> Vec<Row> {
        let (removed, kept): (Vec<Row>, Vec<Row>) =
            std::mem::take(&mut self.rows).into_iter().partition(|r| ids.contains(r.id()));
        self.rows = kept;
        self.reindex();
        removed
    }

    /// Renumber rows 1..N in display order and give a fresh id to any row
    /// whose id is empty or already taken by an earlier row.
    pub fn assign_ids(&mut self) {
        let mut seen: HashSet<String> = HashSet::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.set_no(i + 1);
            if row.id().is_empty() || seen.contains(row.id()) {
                row.set_id(Uuid::new_v4().to_string());
            }
            seen.insert(row.id().to_string());
        }
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id().to_string(), i))
            .collect();
    }
}

impl<'a> IntoIterator for &'a RowMap {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl Serialize for RowMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(self.rows.iter().map(|r| (r.id(), r)))
    }
}

impl<'de> Deserialize<'de> for RowMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: HashMap<String, Row> = HashMap::deserialize(deserializer)?;
        let mut rows: Vec<Row> = raw
            .into_iter()
            .map(|(key, mut row)| {
                if row.id().is_empty() {
                    row.set_id(key);
                }
                row
            })
            .collect();
        rows.sort_by(|a, b| a.no().cmp(&b.no()).then_with(|| a.id().cmp(b.id())));
        Ok(Self::from_rows(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::row::{ChartRow, SeparatorRow};

    fn chart(id: &str) -> Row {
        Row::Chart(ChartRow::new(id))
    }

    #[test]
    fn test_assign_ids_renumbers_and_dedupes() {
        let mut map = RowMap::from_rows(vec![chart("a"), chart(""), chart("a")]);
        map.assign_ids();

        let nos: Vec<usize> = map.iter().map(|r| r.no()).collect();
        assert_eq!(nos, vec![1, 2, 3]);
        assert_eq!(map.rows()[0].id(), "a");
        assert!(!map.rows()[1].id().is_empty());
        assert_ne!(map.rows()[2].id(), "a");
        assert_eq!(map.position(map.rows()[2].id()), Some(2));
    }

    #[test]
    fn test_remove_and_insert_keep_index() {
        let mut map = RowMap::from_rows(vec![chart("a"), chart("b"), chart("c")]);
        let removed = map.remove_ids(&HashSet::from(["b".to_string()]));
        assert_eq!(removed.len(), 1);
        assert_eq!(map.position("c"), Some(1));

        map.insert_many(1, vec![chart("x"), chart("y")]);
        let ids: Vec<&str> = map.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["a", "x", "y", "c"]);
        assert!(map.get("y").is_some());
    }

    #[test]
    fn test_chart_ids_skip_other_rows() {
        let map = RowMap::from_rows(vec![
            Row::Separator(SeparatorRow {
                id: "s".into(),
                ..Default::default()
            }),
            chart("a"),
            chart("b"),
        ]);
        assert_eq!(map.chart_ids(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_json_map_orders_by_no() {
        let json = r#"{
            "z": {"rowType": "Chart", "id": "z", "no": 1},
            "a": {"rowType": "Chart", "id": "a", "no": 2}
        }"#;
        let map: RowMap = serde_json::from_str(json).unwrap();
        let ids: Vec<&str> = map.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["z", "a"]);

        let back = serde_json::to_value(&map).unwrap();
        assert_eq!(back["a"]["no"], 2);
    }
}
