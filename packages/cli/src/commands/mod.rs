pub mod apply;
pub mod init;
pub mod serve;

pub use apply::{apply, ApplyArgs};
pub use init::{init, InitArgs};
pub use serve::{serve, ServeArgs};
