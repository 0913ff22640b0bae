use tracing::info;

use crate::engine::DialogState;

/// Tracks the engine-reported dialog state and derives the TurnGate signal.
///
/// Transitions are driven solely by state-changed events; the tracker never
/// rejects a reported state, even a contradictory one.
pub struct DialogTracker {
    state: DialogState,
    failed: bool,
}

impl DialogTracker {
    pub fn new() -> Self {
        Self {
            state: DialogState::Idle,
            failed: false,
        }
    }

    /// Record a reported state. Returns true when the gate signal changed.
    pub fn observe(&mut self, state: DialogState) -> bool {
        let was_open = self.gate_open();
        if state != self.state {
            info!("dialog state {:?} -> {:?}", self.state, state);
        }
        self.state = state;
        self.gate_open() != was_open
    }

    /// Mark the session failed; terminal, no further actions this session.
    pub fn mark_failed(&mut self) {
        self.failed = true;
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn state(&self) -> DialogState {
        self.state
    }

    /// Gate is open iff the most recently observed state is Idle.
    pub fn gate_open(&self) -> bool {
        self.state == DialogState::Idle
    }
}

impl Default for DialogTracker {
    fn default() -> Self {
        Self::new()
    }
}
