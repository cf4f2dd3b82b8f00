//! # Replication
//!
//! Steps are exchanged with a history server that keeps them in commit
//! order. A [`Replicator`] fetches the steps recorded after a known step id
//! and pushes locally committed ones. Replication is advisory: the session
//! stops using a replicator after its first error.

use crate::mutations::Step;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReplicationError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("step {0} already exists")]
    Duplicate(String),

    #[error("invalid payload: {0}")]
    Decode(#[from] serde_json::Error),
}

pub trait Replicator: Send {
    /// Steps recorded after `after`, or every step when `after` is `None`
    /// or unknown to the server
    fn fetch(&mut self, after: Option<&str>) -> Result<Vec<Step>, ReplicationError>;

    fn push(&mut self, step: &Step) -> Result<(), ReplicationError>;
}

/// Ordered step store shared by every replicator cloned from it
#[derive(Debug, Clone, Default)]
pub struct InMemoryReplicator {
    store: Arc<Mutex<Vec<Step>>>,
}

impl InMemoryReplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.store.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock(store: &Mutex<Vec<Step>>) -> Result<std::sync::MutexGuard<'_, Vec<Step>>, ReplicationError> {
    store
        .lock()
        .map_err(|_| ReplicationError::Transport("step store poisoned".to_string()))
}

impl Replicator for InMemoryReplicator {
    fn fetch(&mut self, after: Option<&str>) -> Result<Vec<Step>, ReplicationError> {
        let store = lock(&self.store)?;
        let start = after
            .and_then(|id| store.iter().position(|s| s.id == id))
            .map_or(0, |i| i + 1);
        Ok(store[start..].to_vec())
    }

    fn push(&mut self, step: &Step) -> Result<(), ReplicationError> {
        let mut store = lock(&self.store)?;
        if store.iter().any(|s| s.id == step.id) {
            return Err(ReplicationError::Duplicate(step.id.clone()));
        }
        store.push(step.clone());
        Ok(())
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

    #[test]
    fn test_fetch_after_known_id() {
        let mut replicator = InMemoryReplicator::new();
        for id in ["a", "b", "c"] {
            replicator.push(&step(id)).unwrap();
        }
        let ids = |steps: Vec<Step>| steps.into_iter().map(|s| s.id).collect::<Vec<_>>();
        assert_eq!(ids(replicator.fetch(Some("a")).unwrap()), vec!["b", "c"]);
        assert_eq!(ids(replicator.fetch(Some("c")).unwrap()), Vec::<String>::new());
        assert_eq!(ids(replicator.fetch(Some("zz")).unwrap()), vec!["a", "b", "c"]);
        assert_eq!(ids(replicator.fetch(None).unwrap()), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_duplicate_push_is_rejected() {
        let mut replicator = InMemoryReplicator::new();
        replicator.push(&step("a")).unwrap();
        let mut other = replicator.clone();
        assert!(matches!(other.push(&step("a")), Err(ReplicationError::Duplicate(_))));
        assert_eq!(replicator.len(), 1);
    }
}
