//! IPC module for daemon-UI communication

mod protocol;
mod server;

pub use server::{Server, ServerHooks};
