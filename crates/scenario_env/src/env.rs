//!
//! Current environment related stuff.
//!

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Parent dir where Cargo.toml is stored
pub const CARGO_MANIFEST_DIR: &str = "CARGO_MANIFEST_DIR";
/// Env variable that selects the environment the scenarios run against
pub const RUN_ENV: &str = "RUN_ENV";

/// Environment the service under test is deployed in.
#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Env {
    /// Locally running service.
    #[default]
    Development,
    /// Hosted sandbox.
    Sandbox,
    /// Integration environment shared by the team.
    Integration,
}

/// Name of current environment, read from `RUN_ENV`. Falls back to development.
pub fn which() -> Env {
    std::env::var(RUN_ENV).map_or_else(|_| Env::default(), |v| v.parse().unwrap_or_default())
}

///
/// Base path to look for `config/` and `logs/` directories.
///
/// Scenarios run from the workspace root (`cargo test`) or from a crate directory
/// (`cd crates/scenario_engine && cargo test`); both resolve to the workspace root.
///
pub fn workspace_path() -> PathBuf {
    if let Ok(manifest_dir) = std::env::var(CARGO_MANIFEST_DIR) {
        let mut path = PathBuf::from(manifest_dir);
        path.pop();
        path.pop();
        path
    } else {
        PathBuf::from(".")
    }
}
