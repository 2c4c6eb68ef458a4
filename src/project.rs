use std::path::PathBuf;
use uuid::Uuid;

use crate::canvas::CanvasState;
use crate::components::history::HistoryManager;
use crate::io::{self, ProjectRecord, PxfError};

/// Single open document.
pub struct Project {
    pub id: Uuid,
    pub canvas_state: CanvasState,
    pub history: HistoryManager,
    /// `None` for unsaved/untitled projects.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,

    /// Display name (derived from path or "Untitled-X")
    pub name: String,
}

impl Project {
    pub fn new_untitled(untitled_counter: usize, width: u32, height: u32) -> Self {
        let canvas_state = CanvasState::new(width, height);
        let history = HistoryManager::new(&canvas_state.frames, 0);
        Self {
            id: Uuid::new_v4(),
            canvas_state,
            history,
            path: None,
            is_dirty: false,
            name: format!("Untitled-{}", untitled_counter),
        }
    }

    /// Open a project from a loaded record.
    pub fn from_record(record: &ProjectRecord, path: PathBuf) -> Self {
        let canvas_state = io::record_to_state(record);
        let history = HistoryManager::new(&canvas_state.frames, canvas_state.current_frame_index);
        Self {
            id: record.id,
            canvas_state,
            history,
            path: Some(path),
            is_dirty: false,
            name: record.name.clone(),
        }
    }

    /// Record the current state in history after a committed edit.
    /// Call exactly once per committed mutation, never for transients.
    pub fn commit(&mut self) {
        self.history.snapshot(
            &self.canvas_state.frames,
            self.canvas_state.current_frame_index,
        );
        self.is_dirty = true;
    }

    pub fn undo(&mut self) {
        if let Some(snapshot) = self.history.undo() {
            self.canvas_state.frames = snapshot.frames;
            self.canvas_state.current_frame_index = snapshot.current_frame_index;
            self.is_dirty = true;
        }
    }

    pub fn redo(&mut self) {
        if let Some(snapshot) = self.history.redo() {
            self.canvas_state.frames = snapshot.frames;
            self.canvas_state.current_frame_index = snapshot.current_frame_index;
            self.is_dirty = true;
        }
    }

    /// Write the project to its path (or the given one), refreshing the
    /// record's timestamp and thumbnail.
    pub fn save(&mut self, path: Option<PathBuf>) -> Result<(), PxfError> {
        if let Some(p) = path {
            self.path = Some(p);
        }
        let path = self
            .path
            .clone()
            .ok_or_else(|| PxfError::InvalidFormat("No save path set".into()))?;
        let record = io::build_record(&self.canvas_state, self.id, &self.name);
        io::save_pxf(&record, &path)?;
        self.is_dirty = false;
        Ok(())
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }
}
