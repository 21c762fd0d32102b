//! Unix domain socket server for IPC
//!
//! Bridges the daemon to the UI process: answers status queries, accepts the
//! mute-state and configuration-change notifications, and pushes slider
//! events to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::adapters::ModeledAudio;
use crate::events::SliderEvent;
use crate::executor::MuteTracker;
use crate::provider::DialogPresenter;

use super::protocol::{DaemonStatus, Notification, Request, Response};

const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// Daemon pieces the IPC requests act on
pub struct ServerHooks {
    pub mute: MuteTracker,
    pub dialog: Arc<dyn DialogPresenter>,
    pub audio: Arc<ModeledAudio>,
}

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    state: Arc<RwLock<ServerState>>,
    shutdown_tx: broadcast::Sender<()>,
    event_tx: broadcast::Sender<SliderEvent>,
}

/// Shared server state
struct ServerState {
    status: DaemonStatus,
    start_time: std::time::Instant,
    hooks: ServerHooks,
}

impl Server {
    /// Create a new IPC server
    pub fn new(
        socket_path: &Path,
        hooks: ServerHooks,
        event_tx: broadcast::Sender<SliderEvent>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Owner-only: the bridge runs as the same user
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        let state = Arc::new(RwLock::new(ServerState {
            status: DaemonStatus::default(),
            start_time: std::time::Instant::now(),
            hooks,
        }));

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            state,
            shutdown_tx,
            event_tx,
        })
    }

    /// Run the server, accepting connections and tracking slider events
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;
        let mut events = self.event_tx.subscribe();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _addr)) => {
                        debug!("client connected");
                        self.spawn_client(stream);
                    }
                    Err(e) => {
                        error!(?e, "accept error");
                    }
                },

                event = events.recv() => match event {
                    Ok(event) => Self::track_event(&self.state, &event).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "IPC event tracker lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return Ok(()),
                },
            }
        }
    }

    fn spawn_client(&self, stream: UnixStream) {
        let state = Arc::clone(&self.state);
        let event_tx = self.event_tx.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            tokio::select! {
                result = Self::handle_client(stream, state, event_tx) => {
                    if let Err(e) = result {
                        warn!(?e, "client handler error");
                    }
                }
                _ = shutdown_rx.recv() => {
                    debug!("client handler shutting down");
                }
            }
        });
    }

    /// Keep the status snapshot in line with applied policies
    async fn track_event(state: &RwLock<ServerState>, event: &SliderEvent) {
        if let SliderEvent::PolicyApplied {
            position, policy, ..
        } = event
        {
            let mut state = state.write().await;
            let previous = state.status.policy;
            state.status.position = Some(*position);
            state.status.policy = Some(*policy);

            if previous != Some(*policy) {
                info!(?previous, %policy, "IPC server: policy updated");
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(
        stream: UnixStream,
        state: Arc<RwLock<ServerState>>,
        event_tx: broadcast::Sender<SliderEvent>,
    ) -> Result<()> {
        let (reader, mut writer) = stream.into_split();

        // Reads are not cancel-safe, so they run apart from the select below.
        let (request_tx, mut request_rx) = mpsc::channel(8);
        let reader_task = tokio::spawn(Self::read_requests(reader, request_tx));

        let mut subscription: Option<broadcast::Receiver<SliderEvent>> = None;

        let result = loop {
            tokio::select! {
                request = request_rx.recv() => {
                    let Some(request) = request else {
                        break Ok(());
                    };
                    debug!(?request, "received request");

                    let (response, subscribe) = Self::process_request(request, &state).await;
                    if subscribe && subscription.is_none() {
                        subscription = Some(event_tx.subscribe());
                        debug!("client subscribed to notifications");
                    }

                    if let Err(e) = Self::send_message(&mut writer, &response).await {
                        break Err(e);
                    }
                }

                event = Self::next_event(&mut subscription) => {
                    let notification = Notification::Event { event };
                    if let Err(e) = Self::send_message(&mut writer, &notification).await {
                        break Err(e);
                    }
                }
            }
        };

        reader_task.abort();
        result
    }

    /// Read length-prefixed requests until the client disconnects
    async fn read_requests(mut reader: OwnedReadHalf, request_tx: mpsc::Sender<Request>) {
        let mut len_buf = [0u8; 4];

        loop {
            // Read message length (4-byte little-endian)
            match reader.read_exact(&mut len_buf).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!("client disconnected");
                    return;
                }
                Err(e) => {
                    warn!(?e, "client read error");
                    return;
                }
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_MESSAGE_LEN {
                warn!(len, "message too large, disconnecting");
                return;
            }

            let mut msg_buf = vec![0u8; len];
            if let Err(e) = reader.read_exact(&mut msg_buf).await {
                warn!(?e, "client read error");
                return;
            }

            let request: Request = match serde_json::from_slice(&msg_buf) {
                Ok(request) => request,
                Err(e) => {
                    warn!(%e, "failed to parse request, disconnecting");
                    return;
                }
            };

            if request_tx.send(request).await.is_err() {
                return;
            }
        }
    }

    /// Next event for a subscribed client; pending forever when not subscribed
    async fn next_event(subscription: &mut Option<broadcast::Receiver<SliderEvent>>) -> SliderEvent {
        let Some(rx) = subscription.as_mut() else {
            return std::future::pending().await;
        };

        loop {
            match rx.recv().await {
                Ok(event) => return event,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    *subscription = None;
                    return std::future::pending().await;
                }
            }
        }
    }

    /// Send a length-prefixed JSON message
    async fn send_message<T: serde::Serialize>(writer: &mut OwnedWriteHalf, msg: &T) -> Result<()> {
        let msg_bytes = serde_json::to_vec(msg)?;
        let msg_len = (msg_bytes.len() as u32).to_le_bytes();

        writer.write_all(&msg_len).await?;
        writer.write_all(&msg_bytes).await?;

        Ok(())
    }

    /// Process a request and return a response
    /// Returns (Response, should_subscribe)
    async fn process_request(request: Request, state: &RwLock<ServerState>) -> (Response, bool) {
        match request {
            Request::Ping => (Response::Pong, false),

            Request::GetStatus => {
                let mut state = state.write().await;
                let audio = state.hooks.audio.snapshot();
                state.status.uptime_secs = state.start_time.elapsed().as_secs();
                state.status.ringer = audio.ringer;
                state.status.zen = audio.zen;
                state.status.media_muted = audio.media_muted;
                state.status.was_muted = state.hooks.mute.was_muted();
                (Response::Status(state.status.clone()), false)
            }

            Request::Subscribe => (Response::Subscribed, true),

            Request::MuteStateChanged { muted } => {
                let state = state.read().await;
                if !muted {
                    debug!("media unmuted externally");
                    state.hooks.mute.clear();
                }
                (Response::Ack, false)
            }

            Request::ConfigurationChanged => {
                state.read().await.hooks.dialog.configuration_changed();
                (Response::Ack, false)
            }
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::BridgeDialog;
    use crate::executor::testing::{Call, Recorder};
    use crate::policy::{Policy, Position};
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        socket_path: PathBuf,
        mute: MuteTracker,
        event_tx: broadcast::Sender<SliderEvent>,
        server: Arc<Server>,
    }

    fn harness() -> Harness {
        harness_with(|event_tx| Arc::new(BridgeDialog::new(event_tx)) as Arc<dyn DialogPresenter>)
    }

    fn harness_with<F>(dialog: F) -> Harness
    where
        F: FnOnce(broadcast::Sender<SliderEvent>) -> Arc<dyn DialogPresenter>,
    {
        let dir = TempDir::new().unwrap();
        let socket_path = dir.path().join("daemon.sock");
        let (event_tx, _) = broadcast::channel(16);
        let mute = MuteTracker::new();
        let hooks = ServerHooks {
            mute: mute.clone(),
            dialog: dialog(event_tx.clone()),
            audio: Arc::new(ModeledAudio::new(event_tx.clone())),
        };

        let server = Arc::new(Server::new(&socket_path, hooks, event_tx.clone()).unwrap());
        let running = Arc::clone(&server);
        tokio::spawn(async move { running.run().await });

        Harness {
            _dir: dir,
            socket_path,
            mute,
            event_tx,
            server,
        }
    }

    async fn send(stream: &mut UnixStream, request: &Request) {
        let bytes = serde_json::to_vec(request).unwrap();
        stream.write_all(&(bytes.len() as u32).to_le_bytes()).await.unwrap();
        stream.write_all(&bytes).await.unwrap();
    }

    async fn recv(stream: &mut UnixStream) -> serde_json::Value {
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await.unwrap();
        let mut buf = vec![0u8; u32::from_le_bytes(len_buf) as usize];
        stream.read_exact(&mut buf).await.unwrap();
        serde_json::from_slice(&buf).unwrap()
    }

    #[tokio::test]
    async fn test_ping_and_status() {
        let h = harness();
        let mut stream = UnixStream::connect(&h.socket_path).await.unwrap();

        send(&mut stream, &Request::Ping).await;
        assert_eq!(recv(&mut stream).await["type"], "pong");

        h.mute.mark_muted();
        send(&mut stream, &Request::GetStatus).await;
        let status = recv(&mut stream).await;
        assert_eq!(status["type"], "status");
        assert_eq!(status["was_muted"], true);
        assert_eq!(status["zen"], "off");

        h.server.shutdown().await;
        assert!(!h.socket_path.exists());
    }

    #[tokio::test]
    async fn test_external_unmute_clears_tracker() {
        let h = harness();
        let mut stream = UnixStream::connect(&h.socket_path).await.unwrap();
        h.mute.mark_muted();

        send(&mut stream, &Request::MuteStateChanged { muted: true }).await;
        assert_eq!(recv(&mut stream).await["type"], "ack");
        assert!(h.mute.was_muted());

        send(&mut stream, &Request::MuteStateChanged { muted: false }).await;
        assert_eq!(recv(&mut stream).await["type"], "ack");
        assert!(!h.mute.was_muted());
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let h = harness();
        let mut stream = UnixStream::connect(&h.socket_path).await.unwrap();

        send(&mut stream, &Request::Subscribe).await;
        assert_eq!(recv(&mut stream).await["type"], "subscribed");

        h.event_tx
            .send(SliderEvent::DialogRequested {
                position: Position::Top,
                policy: Policy::Silent,
            })
            .unwrap();
        let note = recv(&mut stream).await;
        assert_eq!(note["type"], "event");
        assert_eq!(note["event"]["type"], "dialog_requested");
        assert_eq!(note["event"]["policy"], "silent");

        // Relayout goes through the dialog presenter and back out as an event.
        send(&mut stream, &Request::ConfigurationChanged).await;
        let mut seen = vec![recv(&mut stream).await, recv(&mut stream).await];
        seen.sort_by_key(|v| v["type"].as_str().map(String::from));
        assert_eq!(seen[0]["type"], "ack");
        assert_eq!(seen[1]["event"]["type"], "dialog_relayout");
    }

    #[tokio::test]
    async fn test_configuration_change_relayouts_dialog() {
        let recorder = Recorder::new();
        let dialog = recorder.log.clone();
        let h = harness_with(move |_| dialog as Arc<dyn DialogPresenter>);
        let mut stream = UnixStream::connect(&h.socket_path).await.unwrap();

        send(&mut stream, &Request::ConfigurationChanged).await;
        assert_eq!(recv(&mut stream).await["type"], "ack");
        assert_eq!(recorder.calls(), vec![Call::Relayout]);
    }

    #[tokio::test]
    async fn test_status_tracks_applied_policy() {
        let h = harness();
        let mut stream = UnixStream::connect(&h.socket_path).await.unwrap();

        // A round trip proves the run loop is up and tracking events.
        send(&mut stream, &Request::Ping).await;
        assert_eq!(recv(&mut stream).await["type"], "pong");

        h.event_tx
            .send(SliderEvent::PolicyApplied {
                position: Position::Middle,
                policy: Policy::Vibrate,
                restored: false,
            })
            .unwrap();

        let mut status = serde_json::Value::Null;
        for _ in 0..50 {
            send(&mut stream, &Request::GetStatus).await;
            status = recv(&mut stream).await;
            if status["policy"] == "vibrate" {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(status["position"], "middle");
        assert_eq!(status["policy"], "vibrate");
    }
}
