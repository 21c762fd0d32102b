//! Slider service lifecycle
//!
//! `init` restores the resting policy from sysfs, starts the policy worker
//! and the queue consumer; `observe` attaches the live uevent source;
//! `shutdown` releases all of it in reverse order.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::events::SliderEvent;
use crate::executor::{
    ApplyMode, Collaborators, MuteTracker, PolicyExecutor, PolicySubmitter, PolicyWorker,
};
use crate::hardware::{self, ListenerError, SliderListener, UeventSource};
use crate::queue::PositionQueue;

pub struct SliderService {
    queue: Arc<PositionQueue>,
    listener: SliderListener,
    consumer: JoinHandle<()>,
    worker: PolicyWorker,
    mute: MuteTracker,
}

impl SliderService {
    /// Restore the current slider policy and start processing positions
    ///
    /// Must be called from within a tokio runtime.
    pub fn init(
        config: &Config,
        collaborators: Collaborators,
        event_tx: broadcast::Sender<SliderEvent>,
    ) -> Result<Self> {
        let mute = MuteTracker::new();
        let mut executor = PolicyExecutor::new(
            collaborators,
            mute.clone(),
            config.user_id,
            config.confirm,
            event_tx,
        );

        recover(&mut executor, &config.state_dir);

        let worker = PolicyWorker::spawn(executor).context("failed to spawn policy worker")?;
        let queue = Arc::new(PositionQueue::new());
        let consumer = tokio::spawn(consume_positions(Arc::clone(&queue), worker.submitter()));
        let listener = SliderListener::new(config.uevent_aliases.clone(), Arc::clone(&queue));

        info!("slider service initialized");

        Ok(Self {
            queue,
            listener,
            consumer,
            worker,
            mute,
        })
    }

    /// Start feeding live slider moves from `source`
    pub fn observe<S>(&self, source: S) -> Result<(), ListenerError>
    where
        S: UeventSource + 'static,
    {
        self.listener.start(source)
    }

    /// Shared flag cleared by the mute-state observer
    pub fn mute_tracker(&self) -> MuteTracker {
        self.mute.clone()
    }

    /// Stop observing, drain the queue and wait for the worker
    pub async fn shutdown(self) -> Result<()> {
        let Self {
            queue,
            listener,
            consumer,
            worker,
            ..
        } = self;

        tokio::task::spawn_blocking(move || listener.stop())
            .await
            .context("failed to stop slider listener")?;

        queue.close();
        consumer.await.context("position consumer failed")?;

        tokio::task::spawn_blocking(move || worker.shutdown())
            .await
            .context("failed to stop policy worker")?;

        info!("slider service stopped");
        Ok(())
    }
}

/// Apply the snapshot position without haptics, media changes or dialog
fn recover(executor: &mut PolicyExecutor, state_dir: &Path) {
    match hardware::read_position(state_dir) {
        Ok(Some(position)) => {
            if let Err(e) = executor.execute(position, ApplyMode::Recovery) {
                warn!(%position, %e, "startup recovery aborted");
            }
        }
        Ok(None) => warn!("slider snapshot not decodable, skipping recovery"),
        Err(e) => warn!(%e, "no slider snapshot, skipping recovery"),
    }
}

/// Feed positions to the worker one cycle at a time
///
/// The next position is taken from the queue only after the running cycle
/// finished, so moves made meanwhile collapse into the latest one.
async fn consume_positions(queue: Arc<PositionQueue>, submitter: PolicySubmitter) {
    debug!("position consumer started");

    while let Some(position) = queue.consume().await {
        let Some(done) = submitter.submit(position) else {
            warn!(%position, "policy worker gone, dropping position");
            break;
        };
        if done.await.is_err() {
            warn!(%position, "policy worker exited mid-cycle");
            break;
        }
    }

    debug!("position consumer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::{Call, Recorder};
    use crate::hardware::testing::ScriptedSource;
    use crate::hardware::datagram;
    use crate::policy::{Policy, Position, RingerMode, ZenMode};
    use std::time::Duration;
    use tempfile::TempDir;

    fn config(state_dir: &Path) -> Config {
        let mut config = Config::from_lookup(|_| None).unwrap();
        config.state_dir = state_dir.to_owned();
        config.confirm.poll_interval = Duration::from_millis(1);
        config
    }

    fn write_snapshot(base: &TempDir, content: &str) {
        let node = base.path().join("extcon1");
        std::fs::create_dir_all(&node).unwrap();
        std::fs::write(node.join("state"), content).unwrap();
    }

    fn dialogs(recorder: &Recorder) -> Vec<Call> {
        recorder
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Dialog(..)))
            .collect()
    }

    async fn wait_for_dialogs(recorder: &Recorder, count: usize) -> Vec<Call> {
        for _ in 0..400 {
            let dialogs = dialogs(recorder);
            if dialogs.len() >= count {
                return dialogs;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        dialogs(recorder)
    }

    #[tokio::test]
    async fn test_recovery_applies_without_side_effects() {
        let base = TempDir::new().unwrap();
        write_snapshot(&base, "USB=1\nHOST=0\nnull)=1\n");
        let recorder = Recorder::new();
        let (tx, mut rx) = broadcast::channel(16);

        let service = SliderService::init(&config(base.path()), recorder.collaborators(), tx).unwrap();
        assert_eq!(
            recorder.calls(),
            vec![Call::Ringer(RingerMode::Vibrate), Call::Zen(ZenMode::Off)]
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            SliderEvent::PolicyApplied {
                position: Position::Middle,
                policy: Policy::Vibrate,
                restored: true,
            }
        );

        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_not_fatal() {
        let base = TempDir::new().unwrap();
        let recorder = Recorder::new();
        let (tx, _rx) = broadcast::channel(16);

        let service = SliderService::init(&config(base.path()), recorder.collaborators(), tx).unwrap();
        assert!(recorder.calls().is_empty());
        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_live_move_reaches_dialog() {
        let base = TempDir::new().unwrap();
        write_snapshot(&base, "USB=0\nHOST=1\nnull)=1\n");
        let recorder = Recorder::new();
        let (tx, _rx) = broadcast::channel(16);

        let service = SliderService::init(&config(base.path()), recorder.collaborators(), tx).unwrap();
        let source = ScriptedSource(
            vec![datagram(
                "change@/devices/virtual/switch/tri-state-key",
                &["SWITCH_STATE=1"],
            )]
            .into(),
        );
        service.observe(source).unwrap();

        assert_eq!(
            wait_for_dialogs(&recorder, 1).await,
            vec![Call::Dialog(Policy::Silent, Position::Top)]
        );
        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_moves_during_confirm_collapse_to_latest() {
        let base = TempDir::new().unwrap();
        let recorder = Recorder::new();
        recorder.settings.set("alert_slider_top", 0, "dnd");
        // Roughly 300ms of confirming for every zen change
        recorder.lag_zen_by(30);
        let (tx, _rx) = broadcast::channel(64);

        let mut config = config(base.path());
        config.confirm.poll_interval = Duration::from_millis(10);
        let service = SliderService::init(&config, recorder.collaborators(), tx).unwrap();

        service.queue.publish(Position::Top);
        tokio::time::sleep(Duration::from_millis(20)).await;
        for position in [Position::Middle, Position::Bottom, Position::Middle, Position::Top] {
            service.queue.publish(position);
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        // The bounce while Top was confirming runs as one cycle for its last value
        assert_eq!(
            wait_for_dialogs(&recorder, 2).await,
            vec![
                Call::Dialog(Policy::DoNotDisturb, Position::Top),
                Call::Dialog(Policy::DoNotDisturb, Position::Top),
            ]
        );

        service.shutdown().await.unwrap();
        assert_eq!(dialogs(&recorder).len(), 2);
    }
}
