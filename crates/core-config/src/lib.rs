//! Configuration loading and parsing.
//!
//! Parses `tether.toml` (or an override path supplied by the host) for the
//! two timing constants of the synchronization protocol and the submit
//! policy:
//!
//! ```toml
//! [sync]
//! edit_window_ms = 300     # focus guard protection after the last keystroke
//! debounce_window_ms = 0   # 0 = coalesce calls issued within the same tick
//!
//! [submit]
//! reset_on_success = true
//! ```
//!
//! Every controller and dispatcher reads its window from here; there are no
//! per-widget overrides. The raw parsed values are kept next to the effective
//! ones so a host can report what the file asked for versus what is applied.
//! The debounce window is clamped to the edit window: a dispatch that lands
//! after the guard has stopped protecting the field would let a stale round
//! trip overwrite newer keystrokes.
//!
//! Unknown fields are ignored so the file format can grow without warnings.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf, time::Duration};
use tracing::{info, warn};

pub const DEFAULT_EDIT_WINDOW_MS: u64 = 300;
pub const DEFAULT_DEBOUNCE_WINDOW_MS: u64 = 0;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    #[serde(default = "SyncConfig::default_edit_window_ms")]
    pub edit_window_ms: u64,
    #[serde(default = "SyncConfig::default_debounce_window_ms")]
    pub debounce_window_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            edit_window_ms: Self::default_edit_window_ms(),
            debounce_window_ms: Self::default_debounce_window_ms(),
        }
    }
}

impl SyncConfig {
    const fn default_edit_window_ms() -> u64 {
        DEFAULT_EDIT_WINDOW_MS
    }
    const fn default_debounce_window_ms() -> u64 {
        DEFAULT_DEBOUNCE_WINDOW_MS
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SubmitConfig {
    #[serde(default = "SubmitConfig::default_reset_on_success")]
    pub reset_on_success: bool,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            reset_on_success: Self::default_reset_on_success(),
        }
    }
}

impl SubmitConfig {
    const fn default_reset_on_success() -> bool {
        true
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub submit: SubmitConfig,
}

/// Timing windows as applied at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindows {
    pub edit_window: Duration,
    pub debounce_window: Duration,
}

impl Default for SyncWindows {
    fn default() -> Self {
        Self {
            edit_window: Duration::from_millis(DEFAULT_EDIT_WINDOW_MS),
            debounce_window: Duration::from_millis(DEFAULT_DEBOUNCE_WINDOW_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data
    pub windows: SyncWindows,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_file(None, ConfigFile::default())
    }
}

/// Best-effort config path following platform conventions (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from("tether.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("tether").join("tether.toml");
    }
    PathBuf::from("tether.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => Ok(Config::from_file(Some(content), file)),
        Err(err) => {
            warn!(target: "config", path = %path.display(), error = %err, "config_parse_failed_using_defaults");
            Ok(Config::default())
        }
    }
}

/// Parse configuration from an in-memory TOML string.
pub fn from_toml_str(content: &str) -> Result<Config> {
    let file = toml::from_str::<ConfigFile>(content)?;
    Ok(Config::from_file(Some(content.to_string()), file))
}

impl Config {
    pub fn from_file(raw: Option<String>, file: ConfigFile) -> Self {
        let windows = Self::effective_windows(&file.sync);
        Self { raw, file, windows }
    }

    fn effective_windows(sync: &SyncConfig) -> SyncWindows {
        let edit = sync.edit_window_ms;
        let debounce = sync.debounce_window_ms.min(edit);
        if debounce != sync.debounce_window_ms {
            info!(
                target: "config",
                raw = sync.debounce_window_ms,
                clamped = debounce,
                edit_window_ms = edit,
                "debounce_window_clamped"
            );
        }
        SyncWindows {
            edit_window: Duration::from_millis(edit),
            debounce_window: Duration::from_millis(debounce),
        }
    }

    pub fn edit_window(&self) -> Duration {
        self.windows.edit_window
    }

    pub fn debounce_window(&self) -> Duration {
        self.windows.debounce_window
    }

    pub fn reset_on_success(&self) -> bool {
        self.file.submit.reset_on_success
    }
}
