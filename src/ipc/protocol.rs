//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::adapters::AudioState;
use crate::events::SliderEvent;
use crate::policy::{Policy, Position, RingerMode, ZenMode};

/// Requests from the platform bridge to the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current daemon status
    GetStatus,

    /// Ping to check connectivity
    Ping,

    /// Subscribe to slider event notifications
    Subscribe,

    /// The media stream mute state changed outside the daemon
    MuteStateChanged { muted: bool },

    /// Display configuration changed; the dialog must re-layout
    ConfigurationChanged,
}

/// Responses from daemon to the platform bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current daemon status
    Status(DaemonStatus),

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Notification accepted
    Ack,

    /// Error response
    Error { code: String, message: String },
}

/// Push notification for subscribed clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Event { event: SliderEvent },
}

/// Full daemon status snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Last applied slider position
    pub position: Option<Position>,

    /// Policy in force for that position
    pub policy: Option<Policy>,

    pub ringer: RingerMode,
    pub zen: ZenMode,
    pub media_muted: bool,

    /// Media was muted by Silent and will be restored on the next audible policy
    pub was_muted: bool,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for DaemonStatus {
    fn default() -> Self {
        let audio = AudioState::default();
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            position: None,
            policy: None,
            ringer: audio.ringer,
            zen: audio.zen,
            media_muted: audio.media_muted,
            was_muted: false,
            uptime_secs: 0,
        }
    }
}
