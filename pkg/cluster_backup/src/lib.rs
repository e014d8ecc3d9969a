extern crate common;
#[macro_use]
extern crate macros;

#[macro_use]
pub mod log;

pub mod agent;
pub mod archive;
pub mod clock;
pub mod config;
pub mod consensus;
pub mod counters;
pub mod endpoint_cursor;
pub mod errors;
pub mod events;
pub mod mark_file;
pub mod model;
pub mod protocol;
pub mod recording_log;
pub mod state;

pub use agent::Agent;
pub use config::{ClusterBackupArgs, Config};
pub use errors::BackupError;
pub use events::{BackupEventsListener, NullEventsListener};
