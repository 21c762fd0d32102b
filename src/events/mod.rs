//! Events module for slider transitions
//!
//! Structured events broadcast to in-process observers and, through the
//! IPC bridge, to subscribed UI clients.

use serde::{Deserialize, Serialize};

use crate::policy::{HapticEffect, Policy, Position, RingerMode, ZenMode};

/// Events emitted while slider policies are applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SliderEvent {
    /// A policy took effect for a position
    PolicyApplied {
        position: Position,
        policy: Policy,
        /// Applied by startup recovery rather than a live move
        restored: bool,
    },

    /// Ringer mode changed
    RingerModeChanged { mode: RingerMode },

    /// Interruption level changed
    ZenModeChanged { mode: ZenMode },

    /// Media stream mute state changed
    StreamMuteChanged { muted: bool },

    /// A haptic effect should be played
    HapticRequested { effect: HapticEffect },

    /// The indicator dialog should show this policy
    DialogRequested { position: Position, policy: Policy },

    /// Display configuration changed; the dialog should re-layout
    DialogRelayout,
}

impl std::fmt::Display for SliderEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SliderEvent::PolicyApplied {
                position,
                policy,
                restored,
            } => {
                let how = if *restored { "restored" } else { "live" };
                write!(f, "POLICY_APPLIED ({position} -> {policy}, {how})")
            }
            SliderEvent::RingerModeChanged { mode } => write!(f, "RINGER_MODE_CHANGED ({mode:?})"),
            SliderEvent::ZenModeChanged { mode } => write!(f, "ZEN_MODE_CHANGED ({mode:?})"),
            SliderEvent::StreamMuteChanged { muted } => {
                write!(f, "STREAM_MUTE_CHANGED (muted={muted})")
            }
            SliderEvent::HapticRequested { effect } => write!(f, "HAPTIC_REQUESTED ({effect:?})"),
            SliderEvent::DialogRequested { position, policy } => {
                write!(f, "DIALOG_REQUESTED ({position} -> {policy})")
            }
            SliderEvent::DialogRelayout => write!(f, "DIALOG_RELAYOUT"),
        }
    }
}
