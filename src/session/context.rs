use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::engine::EngineGateway;

/// Shared per-session state handed to every component.
///
/// Owns the gateway handle and the TurnGate. The gate has exactly one writer
/// (the dialog tracker, via the controller) and one reader (the uplink
/// streamer), so an atomic is sufficient — no lock.
pub struct SessionContext {
    session_id: String,
    gateway: Arc<dyn EngineGateway>,

    /// Open only while the most recently observed engine state is Idle
    turn_gate: AtomicBool,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, gateway: Arc<dyn EngineGateway>) -> Self {
        Self {
            session_id: session_id.into(),
            gateway,
            // Closed until the engine reports Idle
            turn_gate: AtomicBool::new(false),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn gateway(&self) -> &Arc<dyn EngineGateway> {
        &self.gateway
    }

    /// Whether outbound audio transmission is currently permitted
    pub fn gate_open(&self) -> bool {
        self.turn_gate.load(Ordering::SeqCst)
    }

    pub fn set_gate(&self, open: bool) {
        self.turn_gate.store(open, Ordering::SeqCst);
    }
}
