//! Kernel uevent datagram parsing
//!
//! A kernel uevent arrives as `action@devpath\0KEY=VALUE\0KEY=VALUE...`.
//! Frames re-broadcast by udev start with `libudev\0` and are ignored.

use std::collections::HashMap;

/// Key carrying the switch-class position code
const SWITCH_STATE_KEY: &str = "SWITCH_STATE";
/// Key carrying the extcon cable state blob
const EXTCON_STATE_KEY: &str = "STATE";

/// A parsed kernel uevent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uevent {
    pub action: String,
    pub devpath: String,
    pub env: HashMap<String, String>,
}

impl Uevent {
    /// Parse a raw netlink datagram, returning `None` for non-kernel frames
    pub fn parse(datagram: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(datagram);
        let mut fields = text.split('\0').filter(|f| !f.is_empty());

        let header = fields.next()?;
        let (action, devpath) = header.split_once('@')?;

        let env = fields
            .filter_map(|field| field.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Some(Self {
            action: action.to_string(),
            devpath: devpath.to_string(),
            env,
        })
    }

    /// Whether the devpath or any value names the given alias
    pub fn mentions(&self, alias: &str) -> bool {
        self.devpath.contains(alias) || self.env.values().any(|v| v.contains(alias))
    }

    /// The position token carried by this event, if any
    pub fn state_token(&self) -> Option<&str> {
        self.env
            .get(SWITCH_STATE_KEY)
            .or_else(|| self.env.get(EXTCON_STATE_KEY))
            .map(String::as_str)
    }
}

#[cfg(test)]
pub(crate) fn datagram(header: &str, fields: &[&str]) -> Vec<u8> {
    let mut out = header.as_bytes().to_vec();
    out.push(0);
    for field in fields {
        out.extend_from_slice(field.as_bytes());
        out.push(0);
    }
    out
}
