//! Hardware token normalization
//!
//! Tokens come in two shapes: a bare switch code (`1`, `2`, `3`) from the
//! switch class driver, or an extcon state blob where the one cable reading
//! `=0` names the position. Anything else is bounce noise and is dropped.

use crate::policy::Position;

const NONE_CABLE: &str = "USB=0";
const VIBRATION_CABLE: &str = "HOST=0";
const SILENT_CABLE: &str = "null)=0";

/// Decode a raw token of either shape into a position
pub fn normalize(token: &str) -> Option<Position> {
    let trimmed = token.trim();
    if trimmed.parse::<i64>().is_ok() {
        normalize_numeric(trimmed)
    } else {
        normalize_composite(token)
    }
}

/// Decode a switch code: `1` top, `2` middle, `3` bottom
pub fn normalize_numeric(token: &str) -> Option<Position> {
    match token.trim().parse::<i64>().ok()? {
        1 => Some(Position::Top),
        2 => Some(Position::Middle),
        3 => Some(Position::Bottom),
        _ => None,
    }
}

/// Decode an extcon state blob; exactly one cable flag must be present
pub fn normalize_composite(token: &str) -> Option<Position> {
    let none = token.contains(NONE_CABLE);
    let vibration = token.contains(VIBRATION_CABLE);
    let silent = token.contains(SILENT_CABLE);

    match (none, vibration, silent) {
        (true, false, false) => Some(Position::Bottom),
        (false, true, false) => Some(Position::Middle),
        (false, false, true) => Some(Position::Top),
        _ => None,
    }
}
