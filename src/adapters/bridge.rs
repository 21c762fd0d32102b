//! Haptics and dialog forwarded to the platform bridge as events
//!
//! The vibrator and the indicator window live in the UI process; the daemon
//! only asks for them over the event channel.

use tokio::sync::broadcast;
use tracing::debug;

use crate::events::SliderEvent;
use crate::policy::{HapticEffect, Policy, Position};
use crate::provider::{DialogPresenter, HapticDriver};

pub struct BridgeHaptics {
    event_tx: broadcast::Sender<SliderEvent>,
    has_vibrator: bool,
}

impl BridgeHaptics {
    pub fn new(event_tx: broadcast::Sender<SliderEvent>, has_vibrator: bool) -> Self {
        Self {
            event_tx,
            has_vibrator,
        }
    }
}

impl HapticDriver for BridgeHaptics {
    fn has_vibrator(&self) -> bool {
        self.has_vibrator
    }

    fn play(&self, effect: HapticEffect) {
        debug!(?effect, "requesting haptic");
        let _ = self.event_tx.send(SliderEvent::HapticRequested { effect });
    }
}

pub struct BridgeDialog {
    event_tx: broadcast::Sender<SliderEvent>,
}

impl BridgeDialog {
    pub fn new(event_tx: broadcast::Sender<SliderEvent>) -> Self {
        Self { event_tx }
    }
}

impl DialogPresenter for BridgeDialog {
    fn show(&self, policy: Policy, position: Position) {
        let _ = self
            .event_tx
            .send(SliderEvent::DialogRequested { position, policy });
    }

    fn configuration_changed(&self) {
        let _ = self.event_tx.send(SliderEvent::DialogRelayout);
    }
}
