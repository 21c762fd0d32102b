//! alert-slider-daemon: maps the three-position alert slider to sound policy
//!
//! This daemon runs as a system service and provides:
//! - Kernel uevent observation of the slider under both driver aliases
//! - Startup recovery of the resting policy from sysfs
//! - A single worker applying ringer/zen policy with confirmation
//! - IPC bridge for the UI process (dialog, haptics, mute-state broadcast)

mod adapters;
mod config;
mod events;
mod executor;
mod hardware;
mod ipc;
mod lifecycle;
mod policy;
mod provider;
mod queue;
mod service;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::{BridgeDialog, BridgeHaptics, JsonFileSettings, ModeledAudio};
use crate::config::Config;
use crate::events::SliderEvent;
use crate::executor::Collaborators;
use crate::ipc::{Server, ServerHooks};
use crate::lifecycle::ShutdownSignal;
use crate::service::SliderService;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "alert-slider-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(
        ?config.socket_path,
        ?config.settings_path,
        ?config.state_dir,
        "configuration loaded"
    );

    // Register before anything slow so early signals are not lost
    let mut shutdown = ShutdownSignal::new()?;

    // Slider events fan out to the IPC bridge and its subscribers
    let (event_tx, _event_rx) = broadcast::channel::<SliderEvent>(64);

    let audio = Arc::new(ModeledAudio::new(event_tx.clone()));
    let dialog = Arc::new(BridgeDialog::new(event_tx.clone()));
    let collaborators = Collaborators {
        settings: Arc::new(JsonFileSettings::new(&config.settings_path)),
        audio: audio.clone(),
        haptics: Arc::new(BridgeHaptics::new(event_tx.clone(), true)),
        dialog: dialog.clone(),
    };

    // Restores the resting policy before live events are observed
    let service = SliderService::init(&config, collaborators, event_tx.clone())?;

    start_observing(&service);

    let server = Server::new(
        &config.socket_path,
        ServerHooks {
            mute: service.mute_tracker(),
            dialog,
            audio,
        },
        event_tx,
    )?;

    info!("daemon initialized, entering main loop");

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        reason = shutdown.wait() => {
            info!(%reason, "shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    if let Err(e) = service.shutdown().await {
        error!(?e, "slider service shutdown error");
    }
    server.shutdown().await;

    info!("alert-slider-daemon stopped");

    Ok(())
}

#[cfg(target_os = "linux")]
fn start_observing(service: &SliderService) {
    use std::time::Duration;

    use crate::hardware::NetlinkUeventSource;

    let result = NetlinkUeventSource::open(Duration::from_millis(250))
        .map_err(hardware::ListenerError::from)
        .and_then(|source| service.observe(source));

    match result {
        Ok(()) => info!("slider listener started"),
        Err(e) => {
            error!(?e, "failed to start slider listener");
            warn!("continuing without live slider events");
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn start_observing(_service: &SliderService) {
    warn!("kernel uevents unavailable on this platform, live slider events disabled");
}
