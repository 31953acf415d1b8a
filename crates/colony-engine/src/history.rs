//! Bounded undo/redo over deep copies of the world.
//!
//! [`SnapshotHistory`] keeps a bounded sequence of [`WorldState`]
//! backups. Each entry carries grid, cells, and models together, so the
//! three histories can never drift apart. The tail of the undo sequence
//! mirrors the live world as of the last [`backup_state`] call.
//!
//! [`backup_state`]: SnapshotHistory::backup_state

use std::collections::VecDeque;
use std::error::Error;
use std::fmt;

use colony_core::Backup;

use crate::world::WorldState;

/// Errors from undo and redo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HistoryError {
    /// History is disabled (batch runs).
    Disabled,
    /// Fewer than two snapshots are held.
    NothingToUndo,
    /// The redo stack is empty.
    NothingToRedo,
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "undo history is disabled"),
            Self::NothingToUndo => write!(f, "nothing to undo"),
            Self::NothingToRedo => write!(f, "nothing to redo"),
        }
    }
}

impl Error for HistoryError {}

/// Bounded-depth undo/redo manager.
#[derive(Debug)]
pub struct SnapshotHistory {
    depth: usize,
    undo: VecDeque<WorldState>,
    redo: Vec<WorldState>,
    enabled: bool,
}

impl SnapshotHistory {
    /// An enabled history retaining at most `depth` snapshots.
    ///
    /// # Panics
    ///
    /// Panics if `depth` is zero.
    pub fn new(depth: usize) -> Self {
        assert!(depth >= 1, "SnapshotHistory depth must be >= 1, got {depth}");
        Self {
            depth,
            undo: VecDeque::with_capacity(depth),
            redo: Vec::new(),
            enabled: true,
        }
    }

    /// A history that records nothing, for unattended batch runs.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(1)
        }
    }

    /// Whether snapshots are being recorded.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turn recording on or off. Turning it off drops every snapshot.
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.clear();
        }
        self.enabled = enabled;
    }

    /// Maximum snapshots retained.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Snapshots in the undo sequence, including the current tail.
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    /// Snapshots on the redo stack.
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Whether [`undo`](Self::undo) would succeed.
    pub fn can_undo(&self) -> bool {
        self.enabled && self.undo.len() > 1
    }

    /// Whether [`redo`](Self::redo) would succeed.
    pub fn can_redo(&self) -> bool {
        self.enabled && !self.redo.is_empty()
    }

    /// Drop every snapshot.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// Record the live world as the new tail.
    ///
    /// Evicts the oldest snapshots so that at most `depth` remain, then
    /// appends an independent copy of `world`. With `clear_redo` the redo
    /// stack is emptied, as after any fresh edit. Does nothing while
    /// disabled.
    pub fn backup_state(&mut self, world: &WorldState, clear_redo: bool) {
        if !self.enabled {
            return;
        }
        self.push_bounded(world.backup());
        if clear_redo {
            self.redo.clear();
        }
    }

    /// Step back one snapshot, restoring `world` from the new tail.
    pub fn undo(&mut self, world: &mut WorldState) -> Result<(), HistoryError> {
        if !self.enabled {
            return Err(HistoryError::Disabled);
        }
        if self.undo.len() < 2 {
            return Err(HistoryError::NothingToUndo);
        }
        if let Some(tail) = self.undo.pop_back() {
            self.redo.push(tail);
        }
        match self.undo.back() {
            Some(restored) => {
                *world = restored.backup();
                Ok(())
            }
            None => Err(HistoryError::NothingToUndo),
        }
    }

    /// Reapply the most recently undone snapshot.
    pub fn redo(&mut self, world: &mut WorldState) -> Result<(), HistoryError> {
        if !self.enabled {
            return Err(HistoryError::Disabled);
        }
        let next = self.redo.pop().ok_or(HistoryError::NothingToRedo)?;
        *world = next.backup();
        self.push_bounded(next);
        Ok(())
    }

    fn push_bounded(&mut self, entry: WorldState) {
        while self.undo.len() >= self.depth {
            self.undo.pop_front();
        }
        self.undo.push_back(entry);
    }
}
