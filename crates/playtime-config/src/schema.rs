//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Launcher-wide settings
    #[serde(default)]
    pub launcher: RawLauncherConfig,

    /// Games offered by the launcher, in display order
    #[serde(default)]
    pub games: Vec<RawGame>,
}

/// Launcher-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawLauncherConfig {
    /// Total play time allowed per calendar day, in seconds
    pub daily_limit_seconds: Option<u64>,

    /// Data directory for the usage log
    pub data_dir: Option<PathBuf>,

    /// Usage log file; relative paths resolve against `data_dir`
    pub usage_file: Option<PathBuf>,

    /// Grace period between SIGTERM and SIGKILL when the budget runs out
    pub kill_grace_seconds: Option<u64>,
}

/// Raw game definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawGame {
    /// Display label
    pub name: String,

    /// Executable path or command, launched as-is
    pub command: String,

    /// Extra arguments passed through unmodified
    #[serde(default)]
    pub args: Vec<String>,
}
