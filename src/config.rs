//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::executor::ConfirmPolicy;
use crate::provider::UserId;

const DEFAULT_DATA_DIR: &str = "/data/system/alert-slider";
const DEFAULT_STATE_DIR: &str = "/sys/devices/platform/soc/soc:tri_state_key/extcon";
const DEFAULT_ALIASES: [&str; 2] = ["tri-state-key", "soc:tri_state_key"];
const DEFAULT_CONFIRM_POLL_MS: u64 = 50;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// JSON settings store
    pub settings_path: PathBuf,

    /// Directory scanned for the slider's extcon node at startup
    pub state_dir: PathBuf,

    /// Names the slider's uevents may carry; each board uses one of them
    pub uevent_aliases: Vec<String>,

    /// User whose settings apply
    pub user_id: UserId,

    /// Zen confirmation wait
    pub confirm: ConfirmPolicy,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = PathBuf::from(
            lookup("ALERT_SLIDER_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
        );
        let socket_path = lookup("ALERT_SLIDER_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("daemon.sock"));
        let settings_path = lookup("ALERT_SLIDER_SETTINGS")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("settings.json"));
        let state_dir = PathBuf::from(
            lookup("ALERT_SLIDER_STATE_DIR").unwrap_or_else(|| DEFAULT_STATE_DIR.to_string()),
        );

        let uevent_aliases = match lookup("ALERT_SLIDER_ALIASES") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|alias| !alias.is_empty())
                .map(String::from)
                .collect(),
            None => DEFAULT_ALIASES.iter().map(|a| a.to_string()).collect(),
        };

        let user_id = match lookup("ALERT_SLIDER_USER") {
            Some(v) => v
                .trim()
                .parse::<UserId>()
                .context("ALERT_SLIDER_USER must be a user id")?,
            None => 0,
        };

        let poll_ms = match lookup("ALERT_SLIDER_CONFIRM_POLL_MS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .context("ALERT_SLIDER_CONFIRM_POLL_MS must be milliseconds")?,
            None => DEFAULT_CONFIRM_POLL_MS,
        };
        let timeout = match lookup("ALERT_SLIDER_CONFIRM_TIMEOUT_MS") {
            Some(v) => Some(Duration::from_millis(
                v.trim()
                    .parse::<u64>()
                    .context("ALERT_SLIDER_CONFIRM_TIMEOUT_MS must be milliseconds")?,
            )),
            None => None,
        };

        Ok(Self {
            data_dir,
            socket_path,
            settings_path,
            state_dir,
            uevent_aliases,
            user_id,
            confirm: ConfirmPolicy {
                poll_interval: Duration::from_millis(poll_ms),
                timeout,
            },
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}
