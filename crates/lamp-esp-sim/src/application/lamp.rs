//! The simulated ESP32 lamp.
//!
//! The lamp owns its colour.  The hub never sets it directly: it can only
//! ask for a report (`req-update`) or forward a click (`user-click`), and the
//! lamp answers both with an `update` carrying the state it is now in.

use lamp_core::protocol::messages::{EVENT_REQ_UPDATE, EVENT_USER_CLICK};
use lamp_core::protocol::DEVICE_LAMP_ESP;
use lamp_core::{EspLampState, LampMessage, UserButton};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
pub struct SimulatedLamp {
    state: EspLampState,
}

impl SimulatedLamp {
    pub fn new(initial: EspLampState) -> Self {
        Self { state: initial }
    }

    pub fn state(&self) -> EspLampState {
        self.state
    }

    /// The `update` message describing the current state.
    pub fn report(&self) -> LampMessage {
        LampMessage::update(DEVICE_LAMP_ESP, self.state.as_arg())
    }

    /// Applies one message from the hub and returns the reply to send, if any.
    pub fn handle(&mut self, msg: &LampMessage) -> Option<LampMessage> {
        if !msg.is_for(DEVICE_LAMP_ESP) {
            debug!(device = %msg.device, "message for another device ignored");
            return None;
        }

        match msg.event.as_str() {
            EVENT_REQ_UPDATE => {
                info!(state = ?self.state, "req-update");
                Some(self.report())
            }
            EVENT_USER_CLICK if msg.arg0 == UserButton::LampEspOn as i64 => {
                self.state = self.state.next_on_click();
                info!(state = ?self.state, "user-click");
                Some(self.report())
            }
            EVENT_USER_CLICK => {
                warn!(button = msg.arg0, "user-click for unsupported button");
                None
            }
            other => {
                warn!(event = other, arg0 = msg.arg0, arg1 = msg.arg1, "unsupported event");
                None
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
