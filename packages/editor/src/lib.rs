//! # Scribe Editor
//!
//! Structured document editing engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ parser: markup text → Markup                │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ tree: arena nodes with oids, journal        │
//! │  - walk: directional leaf paths             │
//! │  - state: what is visible at a boundary     │
//! │  - whitespace: space/BR restoration rules   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ commands: per node-kind editing operations  │
//! │ guard: rollback on structural violations    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ document: history, mirror, undo/redo        │
//! │ session: events, command catalogue, sync    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Commands journal their own records**: every tree primitive appends
//!    a [`MutationRecord`] to the open step while the node is attached
//! 2. **Whitespace is restored last**: commands capture the boundary state
//!    before mutating and restore it afterwards
//! 3. **Violations are values**: commands return `Err(Violation)` and the
//!    guard reverts the partial work
//! 4. **Replication is advisory**: remote steps win, local divergent steps
//!    are replayed after them
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scribe_editor::{Command, Document, EditorConfig};
//!
//! let mut doc = Document::from_fixture("<p>ab[]cd</p>", EditorConfig::default())?;
//! doc.apply(&Command::Enter);
//! doc.commit_step();
//! assert_eq!(doc.to_fixture_string(), "<p>ab</p><p>[]cd</p>");
//!
//! doc.undo();
//! assert_eq!(doc.to_fixture_string(), "<p>ab[]cd</p>");
//! ```

pub mod commands;
pub mod mutations;
pub mod schema;
pub mod selection;
pub mod state;
pub mod tree;
pub mod walk;
pub mod whitespace;

mod config;
mod document;
mod errors;
mod guard;
mod history;
mod replication;
mod session;

pub use commands::{Alignment, Command, ListMode};
pub use config::{EditorConfig, DEFAULT_CONFIG_NAME};
pub use document::Document;
pub use errors::{CommandOutcome, CommandResult, EditorError, EditorResult, Violation};
pub use guard::protect;
pub use history::{History, StepState};
pub use mutations::{CursorSnapshot, MutationRecord, Step, StepOrigin, VNode};
pub use replication::{InMemoryReplicator, ReplicationError, Replicator};
pub use schema::NodeKind;
pub use selection::Selection;
pub use session::{EditSession, EditorEvent, Key, KeyEvent};
pub use state::{classify, CType, State};
pub use tree::{NodeId, Tree};
pub use walk::{Direction, Position};
