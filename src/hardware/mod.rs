//! Hardware side of the alert slider
//!
//! Turns kernel uevents and the sysfs state file into canonical positions.

mod listener;
mod normalize;
mod snapshot;
mod uevent;

#[cfg(target_os = "linux")]
pub use listener::netlink::NetlinkUeventSource;
pub use listener::{ListenerError, SliderListener, UeventSource};
pub use snapshot::read_position;

#[cfg(test)]
pub(crate) use listener::testing;
#[cfg(test)]
pub(crate) use uevent::datagram;
