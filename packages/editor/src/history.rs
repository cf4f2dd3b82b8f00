//! # History
//!
//! Committed steps plus the undo ledger.
//!
//! The open step is the live tree's journal: commands journal their records
//! directly, and [`History::commit`] drains the journal into a new [`Step`],
//! replays it on the mirror and opens the next one.
//!
//! The ledger marks each step with a [`StepState`]. Plain edits carry no
//! mark. Undo reverts the latest step marked redo-available or unmarked,
//! marks it consumed and commits the revert as an undone step. Redo reverts
//! the latest unconsumed undone step, marks it consumed and commits the
//! revert as redo-available. Any plain edit committed after an undo hides
//! every earlier undone step from redo.

use crate::mutations::{new_step_id, CursorSnapshot, Step, StepOrigin};
use crate::tree::Tree;
use std::collections::{BTreeMap, BTreeSet};

/// Ledger mark of a committed step. Plain edits have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StepState {
    /// Produced by an undo; redo reverts it
    Undone = 0,
    /// Produced by a redo; undo may revert it
    RedoAvailable = 1,
    /// Already reverted by an undo or redo
    Consumed = 2,
}

#[derive(Debug, Default)]
pub struct History {
    steps: Vec<Step>,
    states: BTreeMap<usize, StepState>,

    /// Steps received from other clients; never undone locally
    remote: BTreeSet<usize>,

    /// Caret to restore when the open step is reverted
    open_cursor: Option<CursorSnapshot>,
    open_origin: StepOrigin,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn state(&self, index: usize) -> Option<StepState> {
        self.states.get(&index).copied()
    }

    pub fn set_open_cursor(&mut self, cursor: CursorSnapshot) {
        self.open_cursor = Some(cursor);
    }

    pub(crate) fn set_open_origin(&mut self, origin: StepOrigin) {
        self.open_origin = origin;
    }

    pub(crate) fn mark(&mut self, index: usize, state: StepState) {
        self.states.insert(index, state);
    }

    /// Drain the tree's journal into a new step and replay it on `mirror`.
    /// An empty journal commits nothing unless `force` is set.
    pub fn commit(&mut self, tree: &mut Tree, mirror: &mut Tree, force: bool) -> Option<&Step> {
        let dom = tree.take_journal();
        if dom.is_empty() && !force {
            return None;
        }
        for record in &dom {
            mirror.apply_record(record);
        }
        let origin = std::mem::take(&mut self.open_origin);
        let step = Step {
            id: new_step_id(),
            cursor: self.open_cursor.take(),
            dom,
            origin,
        };
        let index = self.steps.len();
        match origin {
            StepOrigin::Edit => {}
            StepOrigin::Undo => self.mark(index, StepState::Undone),
            StepOrigin::Redo => self.mark(index, StepState::RedoAvailable),
        }
        tracing::debug!(id = %step.id, records = step.dom.len(), ?origin, "step committed");
        self.steps.push(step);
        self.steps.last()
    }

    /// Latest local step that is unmarked or redo-available
    pub fn next_undo_index(&self) -> Option<usize> {
        (0..self.steps.len()).rev().find(|i| {
            !self.remote.contains(i)
                && matches!(self.state(*i), None | Some(StepState::RedoAvailable))
        })
    }

    /// Latest unconsumed undone step, unless a plain local edit came after it
    pub fn next_redo_index(&self) -> Option<usize> {
        for i in (0..self.steps.len()).rev() {
            if self.remote.contains(&i) {
                continue;
            }
            match self.state(i) {
                None => return None,
                Some(StepState::Undone) => return Some(i),
                Some(StepState::RedoAvailable | StepState::Consumed) => {}
            }
        }
        None
    }

    /// Append a step that is already applied to the tree and the mirror
    pub(crate) fn push_applied(&mut self, step: Step, state: Option<StepState>, remote: bool) {
        let index = self.steps.len();
        if let Some(state) = state {
            self.states.insert(index, state);
        }
        if remote {
            self.remote.insert(index);
        }
        self.steps.push(step);
    }

    /// Remove and return the steps from `index` on, with their ledger marks
    pub(crate) fn truncate(&mut self, index: usize) -> Vec<(Step, Option<StepState>, bool)> {
        let mut states = self.states.split_off(&index);
        let mut remote = self.remote.split_off(&index);
        self.steps
            .drain(index..)
            .enumerate()
            .map(|(offset, step)| {
                let i = index + offset;
                (step, states.remove(&i), remote.remove(&i))
            })
            .collect()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }
}
