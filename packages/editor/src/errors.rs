//! Error types for the editor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Parse error: {0}")]
    Parse(#[from] scribe_parser::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing argument for {command}")]
    MissingArgument { command: String },

    #[error("Replication error: {0}")]
    Replication(#[from] crate::replication::ReplicationError),
}

/// Structural violation raised inside a command and caught by the guard
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// A node was moved across an unbreakable boundary
    #[error("UNBREAKABLE_VIOLATION")]
    Unbreakable,
    /// A protected node would have been removed
    #[error("UNREMOVABLE_VIOLATION")]
    Unremovable,
}

/// Result type threaded through command implementations
pub type CommandResult<T = ()> = Result<T, Violation>;

/// What happened to a guarded command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    RolledBack(Violation),
}

impl CommandOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CommandOutcome::Applied)
    }

    pub fn violation(&self) -> Option<Violation> {
        match self {
            CommandOutcome::Applied => None,
            CommandOutcome::RolledBack(v) => Some(*v),
        }
    }
}

pub type EditorResult<T> = Result<T, EditorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_codes() {
        assert_eq!(Violation::Unbreakable.to_string(), "UNBREAKABLE_VIOLATION");
        assert_eq!(Violation::Unremovable.to_string(), "UNREMOVABLE_VIOLATION");
        let err: Box<dyn std::error::Error> = Box::new(Violation::Unremovable);
        assert!(err.source().is_none());
    }
}
