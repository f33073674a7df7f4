use std::collections::VecDeque;

use crate::model::TaskFields;

pub const UNDO_STACK_LIMIT: usize = 100;

/// One primitive mutation, with the data needed to apply it in either direction
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryStep {
    Move {
        task_id: String,
        from_column: String,
        from_position: i64,
        to_column: String,
        to_position: i64,
    },
    /// Undone by archiving the created task, redone by restoring it
    Create { task_id: String },
    Archive { task_id: String },
    Restore { task_id: String },
    /// Permanent; a set containing one cannot be undone
    HardDelete { task_id: String },
    Update {
        task_id: String,
        before: Box<TaskFields>,
        after: Box<TaskFields>,
    },
    Rename {
        task_id: String,
        from: String,
        to: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// A service call derived from a step
#[derive(Debug, Clone, PartialEq)]
pub enum StepCall {
    Move {
        task_id: String,
        column_id: String,
        position: i64,
    },
    Archive { task_id: String },
    Restore { task_id: String },
    HardDelete { task_id: String },
    Update { task_id: String, fields: TaskFields },
    Rename { task_id: String, title: String },
}

impl HistoryStep {
    pub fn task_id(&self) -> &str {
        match self {
            HistoryStep::Move { task_id, .. }
            | HistoryStep::Create { task_id }
            | HistoryStep::Archive { task_id }
            | HistoryStep::Restore { task_id }
            | HistoryStep::HardDelete { task_id }
            | HistoryStep::Update { task_id, .. }
            | HistoryStep::Rename { task_id, .. } => task_id,
        }
    }

    pub fn is_reversible(&self) -> bool {
        !matches!(self, HistoryStep::HardDelete { .. })
    }

    /// The call that applies this step in `dir`. `None` when there is nothing
    /// to send (undoing a hard delete).
    pub fn call(&self, dir: Direction) -> Option<StepCall> {
        use Direction::*;
        let id = self.task_id().to_string();
        let call = match (self, dir) {
            (
                HistoryStep::Move {
                    to_column,
                    to_position,
                    ..
                },
                Forward,
            ) => StepCall::Move {
                task_id: id,
                column_id: to_column.clone(),
                position: *to_position,
            },
            (
                HistoryStep::Move {
                    from_column,
                    from_position,
                    ..
                },
                Backward,
            ) => StepCall::Move {
                task_id: id,
                column_id: from_column.clone(),
                position: *from_position,
            },
            (HistoryStep::Create { .. }, Forward)
            | (HistoryStep::Restore { .. }, Forward)
            | (HistoryStep::Archive { .. }, Backward) => StepCall::Restore { task_id: id },
            (HistoryStep::Create { .. }, Backward)
            | (HistoryStep::Archive { .. }, Forward)
            | (HistoryStep::Restore { .. }, Backward) => StepCall::Archive { task_id: id },
            (HistoryStep::HardDelete { .. }, Forward) => StepCall::HardDelete { task_id: id },
            (HistoryStep::HardDelete { .. }, Backward) => return None,
            (HistoryStep::Update { after, .. }, Forward) => StepCall::Update {
                task_id: id,
                fields: (**after).clone(),
            },
            (HistoryStep::Update { before, .. }, Backward) => StepCall::Update {
                task_id: id,
                fields: (**before).clone(),
            },
            (HistoryStep::Rename { to, .. }, Forward) => StepCall::Rename {
                task_id: id,
                title: to.clone(),
            },
            (HistoryStep::Rename { from, .. }, Backward) => StepCall::Rename {
                task_id: id,
                title: from.clone(),
            },
        };
        Some(call)
    }
}

/// All steps produced by one user gesture; one undo/redo entry
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSet {
    pub label: String,
    pub steps: Vec<HistoryStep>,
    pub undoable: bool,
}

impl ActionSet {
    pub fn new(label: impl Into<String>, steps: Vec<HistoryStep>) -> Self {
        let undoable = steps.iter().all(HistoryStep::is_reversible);
        ActionSet {
            label: label.into(),
            steps,
            undoable,
        }
    }

    pub fn single(label: impl Into<String>, step: HistoryStep) -> Self {
        ActionSet::new(label, vec![step])
    }

    /// Calls in application order: original order forward, reversed backward.
    pub fn calls(&self, dir: Direction) -> Vec<StepCall> {
        match dir {
            Direction::Forward => self.steps.iter().filter_map(|s| s.call(dir)).collect(),
            Direction::Backward => self
                .steps
                .iter()
                .rev()
                .filter_map(|s| s.call(dir))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
    #[error("another change is still being saved")]
    Busy,
}

/// Result of popping the undo stack
#[derive(Debug, Clone, PartialEq)]
pub enum UndoOutcome {
    /// Send the set's backward calls, then report back with `finish_undo`
    Revert(ActionSet),
    /// The set held a permanent step; it has been dropped
    Irreversible(ActionSet),
}

/// Bounded undo/redo stacks of action sets.
///
/// Sets popped by `undo`/`redo` are owned by the caller while their calls
/// are in flight and must come back through `finish_*` on success or
/// `restore_*` on failure. Only one set may be in flight at a time.
#[derive(Debug, Default)]
pub struct History {
    undo: VecDeque<ActionSet>,
    redo: Vec<ActionSet>,
    in_flight: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed gesture. Evicts the oldest entry past the limit
    /// and clears redo.
    pub fn push(&mut self, set: ActionSet) {
        self.undo.push_back(set);
        while self.undo.len() > UNDO_STACK_LIMIT {
            self.undo.pop_front();
        }
        self.redo.clear();
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    /// Mark a new gesture as in flight; undo and redo wait for it.
    pub fn begin(&mut self) {
        self.in_flight += 1;
    }

    /// A gesture started with `begin` finished. Pushes the set on success.
    pub fn end(&mut self, completed: Option<ActionSet>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if let Some(set) = completed {
            self.push(set);
        }
    }

    pub fn undo(&mut self) -> Result<UndoOutcome, HistoryError> {
        if self.is_busy() {
            return Err(HistoryError::Busy);
        }
        let set = self.undo.pop_back().ok_or(HistoryError::NothingToUndo)?;
        if !set.undoable {
            return Ok(UndoOutcome::Irreversible(set));
        }
        self.in_flight += 1;
        Ok(UndoOutcome::Revert(set))
    }

    pub fn redo(&mut self) -> Result<ActionSet, HistoryError> {
        if self.is_busy() {
            return Err(HistoryError::Busy);
        }
        let set = self.redo.pop().ok_or(HistoryError::NothingToRedo)?;
        self.in_flight += 1;
        Ok(set)
    }

    pub fn finish_undo(&mut self, set: ActionSet) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.redo.push(set);
    }

    pub fn finish_redo(&mut self, set: ActionSet) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.undo.push_back(set);
        while self.undo.len() > UNDO_STACK_LIMIT {
            self.undo.pop_front();
        }
    }

    /// Put a set back after its undo failed.
    pub fn restore_undo(&mut self, set: ActionSet) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.undo.push_back(set);
    }

    /// Put a set back after its redo failed.
    pub fn restore_redo(&mut self, set: ActionSet) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.redo.push(set);
    }

    /// Forget an in-flight set whose project is no longer open.
    pub fn abandon(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn peek_undo(&self) -> Option<&ActionSet> {
        self.undo.back()
    }

    pub fn peek_redo(&self) -> Option<&ActionSet> {
        self.redo.last()
    }

    /// Drop everything, e.g. when switching projects.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
