//! Named, timestamped captures of the whole project, kept apart from undo.
//!
//! A snapshot stores the project JSON gzip-compressed and base64-encoded.
//! Viewing one installs a read-only preview and keeps a JSON backup of the
//! live project so that returning restores it exactly.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::ProjectData;
use crate::{Error, Result};

/// Default number of snapshots kept.
pub const MAX_SNAPSHOTS: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub commit_message: String,
    /// Base64 gzip of the project JSON, or the plain JSON when
    /// `is_compressed` is false.
    pub project_data_snapshot: String,
    #[serde(default = "default_compressed")]
    pub is_compressed: bool,
}

fn default_compressed() -> bool {
    true
}

impl HistorySnapshot {
    /// The project stored in this snapshot.
    pub fn project(&self) -> Result<ProjectData> {
        let json = if self.is_compressed {
            decompress(&self.project_data_snapshot)?
        } else {
            self.project_data_snapshot.clone()
        };
        Ok(serde_json::from_str(&json)?)
    }
}

/// Gzip then base64-encode a string.
pub fn compress(text: &str) -> Result<String> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes())?;
    let bytes = encoder.finish()?;
    Ok(STANDARD.encode(bytes))
}

/// Reverse of [`compress`].
pub fn decompress(payload: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::Snapshot(format!("invalid base64: {}", e)))?;
    let mut decoder = GzDecoder::new(&bytes[..]);
    let mut text = String::new();
    decoder
        .read_to_string(&mut text)
        .map_err(|e| Error::Snapshot(format!("invalid gzip data: {}", e)))?;
    Ok(text)
}

/// The preview installed while a past snapshot is being viewed.
#[derive(Debug, Clone)]
pub struct Preview {
    pub snapshot_id: String,
    pub data: ProjectData,
    /// Live project as JSON, restored verbatim on return.
    backup: String,
}

/// The snapshot list plus preview state.
#[derive(Debug, Clone)]
pub struct SnapshotHistory {
    snapshots: Vec<HistorySnapshot>,
    max_snapshots: usize,
    preview: Option<Preview>,
}

impl Default for SnapshotHistory {
    fn default() -> Self {
        Self::new(MAX_SNAPSHOTS)
    }
}

impl SnapshotHistory {
    pub fn new(max_snapshots: usize) -> Self {
        Self {
            snapshots: Vec::new(),
            max_snapshots: max_snapshots.max(1),
            preview: None,
        }
    }

    /// Start from a previously saved list, newest first.
    pub fn with_snapshots(mut snapshots: Vec<HistorySnapshot>, max_snapshots: usize) -> Self {
        snapshots.truncate(max_snapshots.max(1));
        Self {
            snapshots,
            ..Self::new(max_snapshots)
        }
    }

    /// Newest first.
    pub fn snapshots(&self) -> &[HistorySnapshot] {
        &self.snapshots
    }

    pub fn get(&self, id: &str) -> Option<&HistorySnapshot> {
        self.snapshots.iter().find(|s| s.id == id)
    }

    pub fn is_viewing_past(&self) -> bool {
        self.preview.is_some()
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    /// Capture `project` under `message`. The oldest snapshot is evicted when
    /// the list is full.
    pub fn create_snapshot(
        &mut self,
        message: &str,
        project: &ProjectData,
    ) -> Result<&HistorySnapshot> {
        let json = serde_json::to_string(project)?;
        let (payload, is_compressed) = match compress(&json) {
            Ok(packed) => (packed, true),
            Err(e) => {
                tracing::warn!("storing snapshot uncompressed: {}", e);
                (json, false)
            }
        };

        self.snapshots.insert(
            0,
            HistorySnapshot {
                id: Uuid::new_v4().to_string(),
                timestamp: Utc::now(),
                commit_message: message.to_string(),
                project_data_snapshot: payload,
                is_compressed,
            },
        );
        self.snapshots.truncate(self.max_snapshots);
        tracing::debug!(count = self.snapshots.len(), "created snapshot {:?}", message);
        Ok(&self.snapshots[0])
    }

    /// Show snapshot `id` as a preview, backing up `live` first. On failure
    /// nothing changes.
    pub fn start_viewing_past(&mut self, id: &str, live: &ProjectData) -> Result<()> {
        let snapshot = self
            .get(id)
            .ok_or_else(|| Error::SnapshotNotFound(id.to_string()))?;
        let data = snapshot.project()?;

        // Switching between snapshots keeps the original live backup.
        let backup = match self.preview.take() {
            Some(existing) => existing.backup,
            None => serde_json::to_string(live)?,
        };
        self.preview = Some(Preview {
            snapshot_id: id.to_string(),
            data,
            backup,
        });
        Ok(())
    }

    /// Leave preview mode, returning the backed-up live project. Returns
    /// `Ok(None)` when not previewing. A corrupt backup leaves the preview
    /// installed.
    pub fn return_to_present(&mut self) -> Result<Option<ProjectData>> {
        let Some(preview) = self.preview.as_ref() else {
            return Ok(None);
        };
        let live: ProjectData = serde_json::from_str(&preview.backup)
            .map_err(|e| Error::Snapshot(format!("corrupt backup: {}", e)))?;
        self.preview = None;
        Ok(Some(live))
    }

    /// Whether snapshot `id` is the one being previewed.
    pub fn is_viewing(&self, id: &str) -> bool {
        self.preview.as_ref().is_some_and(|p| p.snapshot_id == id)
    }

    /// Remove snapshot `id`. Returns false when it does not exist.
    pub fn delete_snapshot(&mut self, id: &str) -> bool {
        let before = self.snapshots.len();
        self.snapshots.retain(|s| s.id != id);
        self.snapshots.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChartRow, Row, RowMap};

    fn project(title: &str) -> ProjectData {
        let mut p = ProjectData::new(title);
        let mut row = ChartRow::new("r1");
        row.no = 1;
        row.display_name = format!("{} task", title);
        p.data = RowMap::from_rows(vec![Row::Chart(row)]);
        p
    }

    #[test]
    fn test_compress_round_trip() {
        let text = "{\"hello\": \"world\"}".repeat(20);
        let packed = compress(&text).unwrap();
        assert_ne!(packed, text);
        assert_eq!(decompress(&packed).unwrap(), text);
    }

    #[test]
    fn test_decompress_rejects_garbage() {
        assert!(matches!(decompress("!!!"), Err(Error::Snapshot(_))));
        let not_gzip = STANDARD.encode(b"plain bytes");
        assert!(matches!(decompress(&not_gzip), Err(Error::Snapshot(_))));
    }

    #[test]
    fn test_create_snapshot_newest_first_and_bounded() {
        let mut history = SnapshotHistory::new(3);
        for i in 0..5 {
            history
                .create_snapshot(&format!("v{}", i), &project("p"))
                .unwrap();
        }
        let messages: Vec<&str> = history
            .snapshots()
            .iter()
            .map(|s| s.commit_message.as_str())
            .collect();
        assert_eq!(messages, vec!["v4", "v3", "v2"]);
        assert!(history.snapshots()[0].is_compressed);
    }

    #[test]
    fn test_snapshot_restores_project() {
        let mut history = SnapshotHistory::default();
        let original = project("before");
        let id = history.create_snapshot("first", &original).unwrap().id.clone();
        assert_eq!(history.get(&id).unwrap().project().unwrap(), original);
    }

    #[test]
    fn test_uncompressed_payload_is_readable() {
        let original = project("plain");
        let snapshot = HistorySnapshot {
            id: "s".into(),
            timestamp: Utc::now(),
            commit_message: String::new(),
            project_data_snapshot: serde_json::to_string(&original).unwrap(),
            is_compressed: false,
        };
        assert_eq!(snapshot.project().unwrap(), original);
    }

    #[test]
    fn test_preview_and_return() {
        let mut history = SnapshotHistory::default();
        let old = project("old");
        let id = history.create_snapshot("old", &old).unwrap().id.clone();
        let live = project("live");

        history.start_viewing_past(&id, &live).unwrap();
        assert_eq!(history.preview().unwrap().data, old);
        assert!(history.is_viewing_past());
        assert!(history.is_viewing(&id));

        let restored = history.return_to_present().unwrap().unwrap();
        assert_eq!(restored, live);
        assert!(!history.is_viewing_past());
        assert!(history.return_to_present().unwrap().is_none());
    }

    #[test]
    fn test_switching_previews_keeps_first_backup() {
        let mut history = SnapshotHistory::default();
        let a = history.create_snapshot("a", &project("a")).unwrap().id.clone();
        let b = history.create_snapshot("b", &project("b")).unwrap().id.clone();
        let live = project("live");

        history.start_viewing_past(&a, &live).unwrap();
        history.start_viewing_past(&b, &project("a")).unwrap();
        assert_eq!(history.return_to_present().unwrap().unwrap(), live);
    }

    #[test]
    fn test_view_corrupt_snapshot_leaves_state() {
        let mut history = SnapshotHistory::with_snapshots(
            vec![HistorySnapshot {
                id: "bad".into(),
                timestamp: Utc::now(),
                commit_message: "broken".into(),
                project_data_snapshot: "not base64 at all".into(),
                is_compressed: true,
            }],
            MAX_SNAPSHOTS,
        );
        assert!(history.start_viewing_past("bad", &project("live")).is_err());
        assert!(!history.is_viewing_past());
        assert!(matches!(
            history.start_viewing_past("missing", &project("live")),
            Err(Error::SnapshotNotFound(_))
        ));
    }

    #[test]
    fn test_delete_snapshot() {
        let mut history = SnapshotHistory::default();
        let id = history.create_snapshot("x", &project("x")).unwrap().id.clone();
        assert!(history.delete_snapshot(&id));
        assert!(!history.delete_snapshot(&id));
        assert!(history.snapshots().is_empty());
    }
}
