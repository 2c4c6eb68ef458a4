// ============================================================================
// History manager — bounded linear undo/redo over frame-set snapshots
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::canvas::Frame;

/// Maximum retained snapshots. The oldest entry is dropped on overflow.
pub const MAX_HISTORY: usize = 30;

/// One history entry: a deep, structurally independent copy of the frame
/// set and the frame the user was on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub frames: Vec<Frame>,
    pub current_frame_index: usize,
}

/// Classic linear undo/redo: a bounded snapshot list with a cursor.
/// Any new snapshot discards everything after the cursor (redo history is
/// lost on a new edit).
#[derive(Clone, Debug)]
pub struct HistoryManager {
    entries: Vec<HistorySnapshot>,
    cursor: usize,
}

impl HistoryManager {
    /// Seed the history with the project's initial state (entry 0).
    pub fn new(frames: &[Frame], current_frame_index: usize) -> Self {
        HistoryManager {
            entries: vec![HistorySnapshot {
                frames: frames.to_vec(),
                current_frame_index,
            }],
            cursor: 0,
        }
    }

    /// Record the state after a committed mutation.
    ///
    /// Transient states (live drags, marquee previews, slider previews)
    /// must not be snapshotted — callers snapshot exactly once per
    /// committed edit.
    pub fn snapshot(&mut self, frames: &[Frame], current_frame_index: usize) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(HistorySnapshot {
            frames: frames.to_vec(),
            current_frame_index,
        });
        if self.entries.len() > MAX_HISTORY {
            let overflow = self.entries.len() - MAX_HISTORY;
            self.entries.drain(0..overflow);
        }
        self.cursor = self.entries.len() - 1;
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Step back one entry. Returns the state to restore, or `None` at the
    /// start of history.
    pub fn undo(&mut self) -> Option<HistorySnapshot> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(self.entries[self.cursor].clone())
    }

    /// Step forward one entry. Returns the state to restore, or `None` at
    /// the tip.
    pub fn redo(&mut self) -> Option<HistorySnapshot> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.entries[self.cursor].clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{LayerNode, PixelStore, Rgb};
    use crate::components::layers::replace_pixels;

    fn paint_marker(frames: &[Frame], n: u8) -> Vec<Frame> {
        // Distinct single-pixel edit so snapshots differ
        let mut pixels = PixelStore::new();
        pixels.set((0, 0), Rgb::new(n, n, n));
        let id = frames[0].layers[0].id();
        let mut out = frames.to_vec();
        out[0].layers = replace_pixels(&frames[0].layers, id, pixels);
        out
    }

    fn marker_of(frames: &[Frame]) -> Option<Rgb> {
        match &frames[0].layers[0] {
            LayerNode::Layer(l) => l.pixels.get((0, 0)),
            LayerNode::Group(_) => None,
        }
    }

    #[test]
    fn forty_edits_leave_thirty_entries() {
        let mut frames = vec![Frame::new()];
        let mut history = HistoryManager::new(&frames, 0);
        for n in 1..=40u8 {
            frames = paint_marker(&frames, n);
            history.snapshot(&frames, 0);
        }
        assert_eq!(history.len(), MAX_HISTORY);

        // Exactly 29 undos reachable from the tip
        let mut undos = 0;
        while history.undo().is_some() {
            undos += 1;
        }
        assert_eq!(undos, 29);

        // The oldest surviving entry is edit #11 (1..=10 were discarded)
        assert_eq!(history.cursor(), 0);
    }

    #[test]
    fn undo_then_redo_round_trips() {
        let frames = vec![Frame::new()];
        let mut history = HistoryManager::new(&frames, 0);
        let edited = paint_marker(&frames, 42);
        history.snapshot(&edited, 0);

        let undone = history.undo().unwrap();
        assert_eq!(undone.frames, frames);

        let redone = history.redo().unwrap();
        assert_eq!(redone.frames, edited);
        assert_eq!(marker_of(&redone.frames), Some(Rgb::new(42, 42, 42)));
    }

    #[test]
    fn undo_at_start_and_redo_at_tip_are_noops() {
        let frames = vec![Frame::new()];
        let mut history = HistoryManager::new(&frames, 0);
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
    }

    #[test]
    fn new_edit_discards_redo_history() {
        let mut frames = vec![Frame::new()];
        let mut history = HistoryManager::new(&frames, 0);
        for n in 1..=3u8 {
            frames = paint_marker(&frames, n);
            history.snapshot(&frames, 0);
        }
        history.undo();
        history.undo();
        assert!(history.can_redo());

        let branched = paint_marker(&frames, 99);
        history.snapshot(&branched, 0);
        assert!(!history.can_redo());
        assert_eq!(marker_of(&history.undo().unwrap().frames), Some(Rgb::new(1, 1, 1)));
    }

    #[test]
    fn snapshot_preserves_frame_index() {
        let frames = vec![Frame::new(), Frame::new()];
        let mut history = HistoryManager::new(&frames, 0);
        history.snapshot(&frames, 1);
        let undone = history.undo().unwrap();
        assert_eq!(undone.current_frame_index, 0);
        let redone = history.redo().unwrap();
        assert_eq!(redone.current_frame_index, 1);
    }
}
