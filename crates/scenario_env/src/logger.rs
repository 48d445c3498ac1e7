//!
//! Logger of the scenario runner.
//!

pub mod config;
mod setup;
pub mod types;

pub use setup::{setup, TelemetryGuard};
pub use tracing::{debug, error, event as log, info, instrument, warn};
pub use types::{Flow, Level, Tag};
