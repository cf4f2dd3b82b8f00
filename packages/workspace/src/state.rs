//! In-memory step store backing the history endpoints

use chrono::{DateTime, Utc};
use scribe_editor::Step;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Step {0} already exists")]
    DuplicateStep(String),

    #[error("Step id must not be empty")]
    MissingId,
}

/// A pushed step and when the server received it
#[derive(Clone, Debug)]
pub struct StoredStep {
    pub step: Step,
    pub received_at: DateTime<Utc>,
}

/// Steps in the order the server accepted them
#[derive(Debug, Default)]
pub struct HistoryState {
    steps: Vec<StoredStep>,
}

impl HistoryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Every step after `last_step_id`. An unknown id, or `"0"`, yields the
    /// whole history.
    pub fn steps_after(&self, last_step_id: &str) -> Vec<Step> {
        let start = self
            .steps
            .iter()
            .position(|s| s.step.id == last_step_id)
            .map_or(0, |i| i + 1);
        self.steps[start..].iter().map(|s| s.step.clone()).collect()
    }

    pub fn push(&mut self, step: Step) -> Result<&StoredStep, StateError> {
        if step.id.is_empty() {
            return Err(StateError::MissingId);
        }
        if self.steps.iter().any(|s| s.step.id == step.id) {
            return Err(StateError::DuplicateStep(step.id));
        }
        self.steps.push(StoredStep {
            step,
            received_at: Utc::now(),
        });
        Ok(&self.steps[self.steps.len() - 1])
    }

    pub fn last_received_at(&self) -> Option<DateTime<Utc>> {
        self.steps.last().map(|s| s.received_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn step(id: &str) -> Step {
        Step {
            id: id.to_string(),
            ..Step::new()
        }
    }

    fn ids(steps: Vec<Step>) -> Vec<String> {
        steps.into_iter().map(|s| s.id).collect()
    }

    #[test]
    fn test_steps_after() {
        let mut state = HistoryState::new();
        for id in ["s1", "s2", "s3"] {
            state.push(step(id)).unwrap();
        }
        assert_eq!(ids(state.steps_after("s1")), vec!["s2", "s3"]);
        assert_eq!(ids(state.steps_after("s3")), Vec::<String>::new());
        assert_eq!(ids(state.steps_after("0")), vec!["s1", "s2", "s3"]);
        assert_eq!(ids(state.steps_after("missing")), vec!["s1", "s2", "s3"]);
    }

    #[test]
    fn test_push_rejects_duplicates() {
        let mut state = HistoryState::new();
        state.push(step("s1")).unwrap();
        assert!(matches!(
            state.push(step("s1")),
            Err(StateError::DuplicateStep(id)) if id == "s1"
        ));
        assert!(matches!(state.push(step("")), Err(StateError::MissingId)));
        assert_eq!(state.len(), 1);
        assert!(state.last_received_at().is_some());
    }
}
