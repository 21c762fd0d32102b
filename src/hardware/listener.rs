//! Live slider listener on the kernel uevent socket
//!
//! Reads uevents on a dedicated thread, keeps the ones that mention one of
//! the configured aliases, normalizes their state token and publishes the
//! position to the queue. Unusable tokens are dropped quietly.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::normalize::normalize;
use super::uevent::Uevent;
use crate::queue::PositionQueue;

/// Pause after a failed receive before trying the socket again
const RECEIVE_BACKOFF: Duration = Duration::from_millis(100);

/// A source of raw uevent datagrams
///
/// `next_datagram` waits a bounded time and returns `Ok(None)` when nothing
/// arrived, so the listener can notice `stop()`. Errors are logged and the
/// source is read again.
pub trait UeventSource: Send {
    fn next_datagram(&mut self) -> io::Result<Option<Vec<u8>>>;
}

/// Errors that can occur in the slider listener
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("slider listener is already running")]
    AlreadyRunning,

    #[error("no aliases to observe")]
    NoAliases,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),

    #[error("failed to open uevent socket: {0}")]
    Socket(#[from] io::Error),
}

/// Observes slider uevents and feeds the position queue
pub struct SliderListener {
    aliases: Vec<String>,
    queue: Arc<PositionQueue>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SliderListener {
    pub fn new(aliases: Vec<String>, queue: Arc<PositionQueue>) -> Self {
        Self {
            aliases,
            queue,
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    /// Start reading `source` on a dedicated thread
    pub fn start<S>(&self, source: S) -> Result<(), ListenerError>
    where
        S: UeventSource + 'static,
    {
        if self.aliases.is_empty() {
            return Err(ListenerError::NoAliases);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ListenerError::AlreadyRunning);
        }

        let aliases = self.aliases.clone();
        let queue = Arc::clone(&self.queue);
        let running = Arc::clone(&self.running);

        let handle = thread::Builder::new()
            .name("uevent-listener".to_string())
            .spawn(move || {
                info!(?aliases, "uevent listener thread started");
                run_receive_loop(source, &aliases, &queue, &running);
                running.store(false, Ordering::SeqCst);
                info!("uevent listener thread stopped");
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                ListenerError::ThreadSpawn(e.to_string())
            })?;

        if let Ok(mut slot) = self.handle.lock() {
            *slot = Some(handle);
        }
        Ok(())
    }

    /// Stop the listener and wait for its thread to exit
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);

        let handle = self.handle.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("uevent listener thread panicked");
            }
        }
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for SliderListener {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_receive_loop<S: UeventSource>(
    mut source: S,
    aliases: &[String],
    queue: &PositionQueue,
    running: &AtomicBool,
) {
    while running.load(Ordering::SeqCst) {
        let datagram = match source.next_datagram() {
            Ok(Some(datagram)) => datagram,
            Ok(None) => continue,
            Err(e) => {
                warn!(%e, "uevent receive failed, retrying");
                thread::sleep(RECEIVE_BACKOFF);
                continue;
            }
        };

        let Some(event) = Uevent::parse(&datagram) else {
            continue;
        };
        if !aliases.iter().any(|alias| event.mentions(alias)) {
            continue;
        }

        let Some(token) = event.state_token() else {
            debug!(devpath = %event.devpath, "slider uevent without state");
            continue;
        };

        match normalize(token) {
            Some(position) => {
                debug!(%position, action = %event.action, devpath = %event.devpath, "slider moved");
                queue.publish(position);
            }
            None => {
                debug!(?token, "dropping unrecognized slider state");
            }
        }
    }
}

/// Kernel uevent multicast socket
#[cfg(target_os = "linux")]
pub mod netlink {
    use std::io;
    use std::os::fd::{AsRawFd, OwnedFd};
    use std::time::Duration;

    use nix::errno::Errno;
    use nix::sys::socket::{
        bind, recv, setsockopt, socket, sockopt, AddressFamily, MsgFlags, NetlinkAddr, SockFlag,
        SockProtocol, SockType,
    };
    use nix::sys::time::{TimeVal, TimeValLike};
    use tracing::warn;

    use super::UeventSource;

    /// Kernel-originated uevents are multicast on group 1
    const KERNEL_GROUP: u32 = 1;
    const MAX_DATAGRAM: usize = 8192;

    pub struct NetlinkUeventSource {
        fd: OwnedFd,
        buf: Vec<u8>,
    }

    impl NetlinkUeventSource {
        /// Bind to the kernel uevent group; receives time out after `wait`
        pub fn open(wait: Duration) -> io::Result<Self> {
            let fd = socket(
                AddressFamily::Netlink,
                SockType::Datagram,
                SockFlag::SOCK_CLOEXEC,
                SockProtocol::NetlinkKObjectUEvent,
            )?;
            bind(fd.as_raw_fd(), &NetlinkAddr::new(0, KERNEL_GROUP))?;

            let millis = i64::try_from(wait.as_millis()).unwrap_or(i64::MAX);
            setsockopt(&fd, sockopt::ReceiveTimeout, &TimeVal::milliseconds(millis))?;

            Ok(Self {
                fd,
                buf: vec![0; MAX_DATAGRAM],
            })
        }
    }

    impl UeventSource for NetlinkUeventSource {
        fn next_datagram(&mut self) -> io::Result<Option<Vec<u8>>> {
            match recv(self.fd.as_raw_fd(), &mut self.buf, MsgFlags::empty()) {
                Ok(len) => Ok(Some(self.buf[..len].to_vec())),
                Err(Errno::EAGAIN) | Err(Errno::EINTR) => Ok(None),
                // Receive buffer overran during a burst; later events still arrive
                Err(Errno::ENOBUFS) => {
                    warn!("uevent socket overran, events were lost");
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        }
    }
}
