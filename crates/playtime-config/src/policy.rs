//! Validated policy structures

use crate::schema::{RawConfig, RawGame, RawLauncherConfig};
use playtime_util::{DEFAULT_USAGE_FILENAME, default_data_dir};
use std::path::PathBuf;
use std::time::Duration;

/// Default grace period between SIGTERM and SIGKILL
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(5);

/// Validated policy ready for use by the launch coordinator
#[derive(Debug, Clone)]
pub struct LauncherPolicy {
    /// Launcher configuration
    pub launcher: LauncherSettings,

    /// Games in display order; launch requests address them by index
    pub games: Vec<GameDescriptor>,
}

impl LauncherPolicy {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            launcher: LauncherSettings::from_raw(raw.launcher),
            games: raw.games.into_iter().map(GameDescriptor::from_raw).collect(),
        }
    }
}

/// Launcher-wide settings
#[derive(Debug, Clone)]
pub struct LauncherSettings {
    /// Total play time allowed per calendar day
    pub daily_limit: Duration,
    pub data_dir: PathBuf,
    usage_file: PathBuf,
    pub kill_grace: Duration,
}

impl LauncherSettings {
    fn from_raw(raw: RawLauncherConfig) -> Self {
        Self {
            // Validation guarantees a non-zero limit
            daily_limit: Duration::from_secs(raw.daily_limit_seconds.unwrap_or_default()),
            data_dir: raw.data_dir.unwrap_or_else(default_data_dir),
            usage_file: raw
                .usage_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_USAGE_FILENAME)),
            kill_grace: raw
                .kill_grace_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_KILL_GRACE),
        }
    }

    /// Full path of the usage log, resolved against `data_dir`
    pub fn usage_path(&self) -> PathBuf {
        self.data_dir.join(&self.usage_file)
    }
}

/// A launchable game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameDescriptor {
    /// Display label
    pub name: String,
    /// Path or command handed to process creation unmodified
    pub executable_path: String,
    pub args: Vec<String>,
}

impl GameDescriptor {
    pub fn new(name: impl Into<String>, executable_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            executable_path: executable_path.into(),
            args: Vec::new(),
        }
    }

    fn from_raw(raw: RawGame) -> Self {
        Self {
            name: raw.name,
            executable_path: raw.command,
            args: raw.args,
        }
    }

    /// Full command line: executable followed by its arguments
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.executable_path.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }
}
