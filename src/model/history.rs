//! Bounded linear undo/redo history.
//!
//! Frames hold `Arc`s, so a frame and the live state share the same row map
//! until one of them is rewritten.

use std::sync::Arc;

use super::project::Column;
use super::row_map::RowMap;

/// Default number of frames kept in `past`.
pub const MAX_UNDO_FRAMES: usize = 30;

/// One restorable state: the rows and the column layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub data: Arc<RowMap>,
    pub columns: Arc<Vec<Column>>,
}

impl Frame {
    pub fn new(data: Arc<RowMap>, columns: Arc<Vec<Column>>) -> Self {
        Self { data, columns }
    }
}

/// Past/future stacks. `past[0]` is a sentinel that undo never pops.
#[derive(Debug, Clone)]
pub struct UndoHistory {
    past: Vec<Frame>,
    future: Vec<Frame>,
    max_frames: usize,
}

impl UndoHistory {
    pub fn new(initial: Frame) -> Self {
        Self::with_limit(initial, MAX_UNDO_FRAMES)
    }

    pub fn with_limit(initial: Frame, max_frames: usize) -> Self {
        Self {
            past: vec![initial],
            future: Vec::new(),
            max_frames: max_frames.max(1),
        }
    }

    /// Forget everything and start over from `initial`.
    pub fn reset(&mut self, initial: Frame) {
        self.past = vec![initial];
        self.future.clear();
    }

    /// Record the state a mutation is about to replace.
    pub fn record(&mut self, previous: Frame) {
        self.past.push(previous);
        self.future.clear();
        if self.past.len() > self.max_frames {
            self.past.remove(0);
        }
    }

    /// Drop the `n` most recent frames without restoring anything.
    /// The sentinel frame is kept.
    pub fn remove_recent(&mut self, n: usize) {
        let keep = self.past.len().saturating_sub(n).max(1);
        self.past.truncate(keep);
    }

    /// Step back. Returns the frame to restore, or `None` at the boundary.
    pub fn undo(&mut self, current: Frame) -> Option<Frame> {
        if self.past.len() <= 1 {
            return None;
        }
        let frame = self.past.pop()?;
        self.future.push(current);
        Some(frame)
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, current: Frame) -> Option<Frame> {
        let frame = self.future.pop()?;
        self.past.push(current);
        Some(frame)
    }

    pub fn can_undo(&self) -> bool {
        self.past.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::row::{ChartRow, Row};

    fn frame(tag: &str) -> Frame {
        let rows = RowMap::from_rows(vec![Row::Chart(ChartRow::new(tag))]);
        Frame::new(Arc::new(rows), Arc::new(Vec::new()))
    }

    fn tag(frame: &Frame) -> String {
        frame.data.rows()[0].id().to_string()
    }

    #[test]
    fn test_undo_at_sentinel_is_noop() {
        let mut history = UndoHistory::new(frame("init"));
        assert!(!history.can_undo());
        assert!(history.undo(frame("now")).is_none());
        assert_eq!(history.past_len(), 1);
        assert_eq!(history.future_len(), 0);
    }

    #[test]
    fn test_redo_with_empty_future_is_noop() {
        let mut history = UndoHistory::new(frame("init"));
        assert!(history.redo(frame("now")).is_none());
        assert_eq!(history.past_len(), 1);
    }

    #[test]
    fn test_undo_redo_cycle() {
        let mut history = UndoHistory::new(frame("init"));
        history.record(frame("a"));
        history.record(frame("b"));

        let restored = history.undo(frame("c")).unwrap();
        assert_eq!(tag(&restored), "b");
        assert!(history.can_redo());

        let again = history.redo(restored).unwrap();
        assert_eq!(tag(&again), "c");
        assert_eq!(history.future_len(), 0);
    }

    #[test]
    fn test_record_clears_future() {
        let mut history = UndoHistory::new(frame("init"));
        history.record(frame("a"));
        history.undo(frame("b"));
        assert_eq!(history.future_len(), 1);
        history.record(frame("a2"));
        assert_eq!(history.future_len(), 0);
    }

    #[test]
    fn test_past_is_bounded() {
        let mut history = UndoHistory::new(frame("init"));
        for i in 0..50 {
            history.record(frame(&format!("f{}", i)));
        }
        assert_eq!(history.past_len(), MAX_UNDO_FRAMES);
    }

    #[test]
    fn test_remove_recent_keeps_sentinel() {
        let mut history = UndoHistory::new(frame("init"));
        history.record(frame("a"));
        history.record(frame("b"));
        history.remove_recent(1);
        assert_eq!(history.past_len(), 2);
        history.remove_recent(10);
        assert_eq!(history.past_len(), 1);
        assert!(!history.can_undo());
    }
}
