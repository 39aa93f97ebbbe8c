//! Snapshot undo/redo.
//!
//! Committed states share unchanged nodes, so keeping whole snapshots is cheap. Each entry on
//! the undo stack is the state *before* a commit; normalizer passes triggered by that commit
//! are folded into the same entry.

use crate::state::EditorState;
use std::sync::Arc;

#[derive(Debug)]
pub(crate) struct History {
    undo_stack: Vec<Arc<EditorState>>,
    redo_stack: Vec<Arc<EditorState>>,
    max_undo: usize,
}

impl History {
    pub(crate) fn new(max_undo: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_undo,
        }
    }

    pub(crate) fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub(crate) fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub(crate) fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub(crate) fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Record `before` as the state to return to. Clears the redo stack.
    pub(crate) fn push(&mut self, before: Arc<EditorState>) {
        self.redo_stack.clear();
        if self.max_undo == 0 {
            return;
        }
        if self.undo_stack.len() >= self.max_undo {
            self.undo_stack.remove(0);
        }
        self.undo_stack.push(before);
    }

    /// Step back from `current`, returning the state to restore.
    pub(crate) fn undo(&mut self, current: Arc<EditorState>) -> Option<Arc<EditorState>> {
        let previous = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        Some(previous)
    }

    /// Step forward from `current`, returning the state to restore.
    pub(crate) fn redo(&mut self, current: Arc<EditorState>) -> Option<Arc<EditorState>> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        Some(next)
    }
}
