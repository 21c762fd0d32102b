//! Recording collaborators for executor tests

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use super::machine::Collaborators;
use super::mute::MuteTracker;
use crate::adapters::MemorySettings;
use crate::policy::{HapticEffect, Policy, Position, RingerMode, ZenMode};
use crate::provider::{AudioControl, DialogPresenter, HapticDriver};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Ringer(RingerMode),
    Zen(ZenMode),
    Mute(bool),
    Haptic(HapticEffect),
    Dialog(Policy, Position),
    Relayout,
}

#[derive(Default)]
struct Zen {
    previous: ZenMode,
    requested: ZenMode,
}

/// Records every collaborator call in order
///
/// The zen mode reads back as the previous value until `lag` polls have been
/// made since the last request.
#[derive(Default)]
pub struct Log {
    calls: Mutex<Vec<Call>>,
    zen: Mutex<Zen>,
    zen_lag: AtomicU32,
    zen_polls: AtomicU32,
}

impl Log {
    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl AudioControl for Log {
    fn set_ringer_mode(&self, mode: RingerMode) {
        self.push(Call::Ringer(mode));
    }

    fn set_zen_mode(&self, mode: ZenMode) {
        let mut zen = self.zen.lock().unwrap();
        zen.previous = zen.requested;
        zen.requested = mode;
        self.zen_polls.store(0, Ordering::SeqCst);
        self.push(Call::Zen(mode));
    }

    fn zen_mode(&self) -> ZenMode {
        let polls = self.zen_polls.fetch_add(1, Ordering::SeqCst) + 1;
        let zen = self.zen.lock().unwrap();
        if polls >= self.zen_lag.load(Ordering::SeqCst) {
            zen.requested
        } else {
            zen.previous
        }
    }

    fn set_media_muted(&self, muted: bool) {
        self.push(Call::Mute(muted));
    }
}

impl HapticDriver for Log {
    fn has_vibrator(&self) -> bool {
        true
    }

    fn play(&self, effect: HapticEffect) {
        self.push(Call::Haptic(effect));
    }
}

impl DialogPresenter for Log {
    fn show(&self, policy: Policy, position: Position) {
        self.push(Call::Dialog(policy, position));
    }

    fn configuration_changed(&self) {
        self.push(Call::Relayout);
    }
}

pub struct Recorder {
    pub log: Arc<Log>,
    pub settings: Arc<MemorySettings>,
    pub mute: MuteTracker,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Log::default()),
            settings: Arc::new(MemorySettings::new()),
            mute: MuteTracker::new(),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            settings: self.settings.clone(),
            audio: self.log.clone(),
            haptics: self.log.clone(),
            dialog: self.log.clone(),
        }
    }

    /// Ringer, zen, haptic and dialog calls; mute calls are in `mute_calls`
    pub fn calls(&self) -> Vec<Call> {
        self.log
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| !matches!(c, Call::Mute(_)))
            .cloned()
            .collect()
    }

    pub fn mute_calls(&self) -> Vec<bool> {
        self.log
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                Call::Mute(muted) => Some(*muted),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.log.calls.lock().unwrap().clear();
    }

    pub fn lag_zen_by(&self, polls: u32) {
        self.log.zen_lag.store(polls, Ordering::SeqCst);
    }

    pub fn zen_polls(&self) -> u32 {
        self.log.zen_polls.load(Ordering::SeqCst)
    }
}
