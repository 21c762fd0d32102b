//! Policy executor state machine
//!
//! One cycle per position: Resolving -> Applying -> Confirming -> Idle.
//! Every cycle ends in Idle, whether it succeeded or was aborted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::mute::MuteTracker;
use crate::events::SliderEvent;
use crate::policy::{self, Policy, PolicyParseError, Position, ZenMode, MUTE_MEDIA_WITH_SILENT_KEY};
use crate::provider::{AudioControl, DialogPresenter, HapticDriver, SettingsStore, UserId};

/// Where the executor is within a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Resolving,
    Applying,
    Confirming,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "Idle"),
            Phase::Resolving => write!(f, "Resolving"),
            Phase::Applying => write!(f, "Applying"),
            Phase::Confirming => write!(f, "Confirming"),
        }
    }
}

/// Why a cycle is being run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// The user moved the slider: confirm, play haptics, adjust media, show dialog
    Live,
    /// Startup restore: set ringer and zen only
    Recovery,
}

/// Errors that abort a cycle
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("setting {key} holds an unknown policy: {source}")]
    UnknownPolicy {
        key: &'static str,
        source: PolicyParseError,
    },

    #[error("zen mode still {observed:?} {waited:?} after requesting {requested:?}")]
    ConfirmTimeout {
        requested: ZenMode,
        observed: ZenMode,
        waited: Duration,
    },
}

/// How the Confirming phase waits for the zen change to land
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmPolicy {
    pub poll_interval: Duration,
    /// `None` waits for as long as it takes
    pub timeout: Option<Duration>,
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            timeout: None,
        }
    }
}

/// Platform services the executor drives
#[derive(Clone)]
pub struct Collaborators {
    pub settings: Arc<dyn SettingsStore>,
    pub audio: Arc<dyn AudioControl>,
    pub haptics: Arc<dyn HapticDriver>,
    pub dialog: Arc<dyn DialogPresenter>,
}

/// Resolves slider positions to policies and applies them
pub struct PolicyExecutor {
    collaborators: Collaborators,
    mute: MuteTracker,
    user: UserId,
    confirm: ConfirmPolicy,
    phase: Phase,
    current: Option<(Position, Policy)>,
    event_tx: broadcast::Sender<SliderEvent>,
}

impl PolicyExecutor {
    pub fn new(
        collaborators: Collaborators,
        mute: MuteTracker,
        user: UserId,
        confirm: ConfirmPolicy,
        event_tx: broadcast::Sender<SliderEvent>,
    ) -> Self {
        Self {
            collaborators,
            mute,
            user,
            confirm,
            phase: Phase::Idle,
            current: None,
            event_tx,
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Last successfully applied position and policy
    #[cfg(test)]
    pub fn current(&self) -> Option<(Position, Policy)> {
        self.current
    }

    /// Run one cycle for `position`, returning the policy that took effect
    ///
    /// On error nothing after the failing phase runs and the previously
    /// applied policy stays in force.
    pub fn execute(&mut self, position: Position, mode: ApplyMode) -> Result<Policy, ExecutorError> {
        let result = self.run_cycle(position, mode);
        self.enter(Phase::Idle);
        result
    }

    fn run_cycle(&mut self, position: Position, mode: ApplyMode) -> Result<Policy, ExecutorError> {
        self.enter(Phase::Resolving);
        let policy = self.resolve(position)?;

        self.enter(Phase::Applying);
        let audio = Arc::clone(&self.collaborators.audio);
        let zen = policy.zen_mode();
        audio.set_ringer_mode(policy.ringer_mode());
        audio.set_zen_mode(zen);

        if mode == ApplyMode::Live {
            self.enter(Phase::Confirming);
            self.confirm_zen(zen)?;
            self.apply_side_effects(policy);
        }

        let previous = self.current.replace((position, policy)).map(|(_, p)| p);
        let restored = mode == ApplyMode::Recovery;
        info!(%position, %policy, ?previous, restored, "policy applied");
        let _ = self.event_tx.send(SliderEvent::PolicyApplied {
            position,
            policy,
            restored,
        });

        if mode == ApplyMode::Live {
            self.collaborators.dialog.show(policy, position);
        }

        Ok(policy)
    }

    fn resolve(&self, position: Position) -> Result<Policy, ExecutorError> {
        let key = position.settings_key();
        let stored = self.collaborators.settings.get(key, self.user);

        policy::resolve(position, stored.as_deref())
            .map_err(|source| ExecutorError::UnknownPolicy { key, source })
    }

    /// Wait until the notification subsystem reports `requested`
    fn confirm_zen(&self, requested: ZenMode) -> Result<(), ExecutorError> {
        let audio = &self.collaborators.audio;
        let started = Instant::now();
        let mut polls = 0u32;

        loop {
            let observed = audio.zen_mode();
            polls += 1;
            if observed == requested {
                debug!(?requested, polls, "zen mode confirmed");
                return Ok(());
            }

            if let Some(timeout) = self.confirm.timeout {
                let waited = started.elapsed();
                if waited >= timeout {
                    return Err(ExecutorError::ConfirmTimeout {
                        requested,
                        observed,
                        waited,
                    });
                }
            }

            audio.wait_for_zen_change(self.confirm.poll_interval);
        }
    }

    fn apply_side_effects(&self, policy: Policy) {
        let Collaborators {
            settings,
            audio,
            haptics,
            ..
        } = &self.collaborators;

        if let Some(effect) = policy.haptic() {
            if haptics.has_vibrator() {
                haptics.play(effect);
            }
        }

        if !settings.get_bool(MUTE_MEDIA_WITH_SILENT_KEY, self.user, false) {
            return;
        }

        if policy == Policy::Silent {
            audio.set_media_muted(true);
            self.mute.mark_muted();
        } else if policy.unmutes_media() && self.mute.take() {
            debug!(%policy, "restoring media muted by silent");
            audio.set_media_muted(false);
        }
    }

    fn enter(&mut self, phase: Phase) {
        if self.phase != phase {
            debug!(from = %self.phase, to = %phase, "executor phase");
            self.phase = phase;
        }
    }
}

/// Log an aborted cycle; the previous policy remains in force
pub fn report_failure(position: Position, error: &ExecutorError) {
    match error {
        ExecutorError::UnknownPolicy { .. } => warn!(%position, %error, "slider cycle aborted"),
        ExecutorError::ConfirmTimeout { .. } => error!(%position, %error, "slider cycle aborted"),
    }
}
