//! Positions, policies and the mapping between them

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Settings key for the "mute media with silent" toggle
pub const MUTE_MEDIA_WITH_SILENT_KEY: &str = "mute_media_with_silent";

/// Physical orientation of the slider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Top,
    Middle,
    Bottom,
}

impl Position {
    /// Key under which the user's chosen policy for this position is stored
    pub fn settings_key(self) -> &'static str {
        match self {
            Position::Top => "alert_slider_top",
            Position::Middle => "alert_slider_middle",
            Position::Bottom => "alert_slider_bottom",
        }
    }

    /// Policy used when the user never configured this position
    pub fn default_policy(self) -> Policy {
        match self {
            Position::Top => Policy::Silent,
            Position::Middle => Policy::Vibrate,
            Position::Bottom => Policy::Normal,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Top => write!(f, "top"),
            Position::Middle => write!(f, "middle"),
            Position::Bottom => write!(f, "bottom"),
        }
    }
}

/// Audio subsystem ringer mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RingerMode {
    Normal,
    Vibrate,
    Silent,
}

/// Notification interruption level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZenMode {
    #[default]
    Off,
    ImportantInterruptions,
    NoInterruptions,
}

/// Predefined haptic effects played on a live transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HapticEffect {
    HeavyClick,
    DoubleClick,
}

/// Behaviour selected for a slider position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    Normal,
    Priority,
    Vibrate,
    Silent,
    DoNotDisturb,
}

impl Policy {
    pub fn ringer_mode(self) -> RingerMode {
        match self {
            Policy::Normal | Policy::Priority | Policy::DoNotDisturb => RingerMode::Normal,
            Policy::Vibrate => RingerMode::Vibrate,
            Policy::Silent => RingerMode::Silent,
        }
    }

    pub fn zen_mode(self) -> ZenMode {
        match self {
            Policy::Priority => ZenMode::ImportantInterruptions,
            Policy::DoNotDisturb => ZenMode::NoInterruptions,
            Policy::Normal | Policy::Vibrate | Policy::Silent => ZenMode::Off,
        }
    }

    /// Haptic played when this policy is entered live, if any
    pub fn haptic(self) -> Option<HapticEffect> {
        match self {
            Policy::Normal | Policy::Priority => Some(HapticEffect::HeavyClick),
            Policy::Vibrate => Some(HapticEffect::DoubleClick),
            Policy::Silent | Policy::DoNotDisturb => None,
        }
    }

    /// Whether entering this policy restores media muted by an earlier Silent
    pub fn unmutes_media(self) -> bool {
        matches!(self, Policy::Normal | Policy::Priority | Policy::Vibrate)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Normal => write!(f, "normal"),
            Policy::Priority => write!(f, "priority"),
            Policy::Vibrate => write!(f, "vibrate"),
            Policy::Silent => write!(f, "silent"),
            Policy::DoNotDisturb => write!(f, "do_not_disturb"),
        }
    }
}

/// A stored policy value that names no known policy
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown policy value {0:?}")]
pub struct PolicyParseError(pub String);

impl FromStr for Policy {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Policy::Normal),
            "priority" => Ok(Policy::Priority),
            "vibrate" => Ok(Policy::Vibrate),
            "silent" => Ok(Policy::Silent),
            "do_not_disturb" | "dnd" => Ok(Policy::DoNotDisturb),
            _ => Err(PolicyParseError(s.to_string())),
        }
    }
}

/// Resolve the policy for a position from its stored settings value
///
/// A missing value falls back to the position's default; a value that does
/// not parse is an error and the caller must abort the cycle.
pub fn resolve(position: Position, stored: Option<&str>) -> Result<Policy, PolicyParseError> {
    match stored {
        Some(value) => value.parse(),
        None => Ok(position.default_policy()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_value_uses_default() {
        assert_eq!(resolve(Position::Top, None), Ok(Policy::Silent));
        assert_eq!(resolve(Position::Middle, None), Ok(Policy::Vibrate));
        assert_eq!(resolve(Position::Bottom, None), Ok(Policy::Normal));
    }

    #[test]
    fn test_stored_value_overrides_default() {
        assert_eq!(resolve(Position::Top, Some("dnd")), Ok(Policy::DoNotDisturb));
        assert_eq!(resolve(Position::Bottom, Some(" Priority ")), Ok(Policy::Priority));
    }

    #[test]
    fn test_unknown_value_is_error() {
        let err = resolve(Position::Middle, Some("loud")).unwrap_err();
        assert_eq!(err, PolicyParseError("loud".to_string()));
    }

    #[test]
    fn test_policy_bundles() {
        assert_eq!(Policy::Priority.ringer_mode(), RingerMode::Normal);
        assert_eq!(Policy::Priority.zen_mode(), ZenMode::ImportantInterruptions);
        assert_eq!(Policy::DoNotDisturb.zen_mode(), ZenMode::NoInterruptions);
        assert_eq!(Policy::DoNotDisturb.haptic(), None);
        assert_eq!(Policy::Vibrate.haptic(), Some(HapticEffect::DoubleClick));
        assert!(!Policy::Silent.unmutes_media());
        assert!(!Policy::DoNotDisturb.unmutes_media());
    }

    #[test]
    fn test_display_parses_back() {
        for policy in [
            Policy::Normal,
            Policy::Priority,
            Policy::Vibrate,
            Policy::Silent,
            Policy::DoNotDisturb,
        ] {
            assert_eq!(policy.to_string().parse::<Policy>(), Ok(policy));
        }
    }
}
