//! # Scribe Workspace
//!
//! History server shared by editing sessions, and the blocking client the
//! sessions replicate through.

pub mod http_replicator;
pub mod server;
pub mod state;

pub use http_replicator::HttpReplicator;
pub use server::{router, serve, AppState, ServerError};
pub use state::{HistoryState, StateError, StoredStep};
