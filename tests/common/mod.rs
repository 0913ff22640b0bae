// Shared test double for the engine gateway.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use voicelink::{ActionKind, EngineConfig, EngineGateway, StatusCode};

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Audio(Vec<u8>),
    Action(ActionKind),
    Response(String),
}

/// Records every outbound gateway call and supports scripted failures.
pub struct RecordingGateway {
    calls: Mutex<Vec<GatewayCall>>,
    /// Actions that should be rejected with RequestDenied
    rejected_actions: Mutex<HashSet<ActionKind>>,
    /// 0-based audio send indices that should fail with SendDataFailed
    failing_sends: Mutex<HashSet<usize>>,
    audio_send_count: AtomicUsize,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            rejected_actions: Mutex::new(HashSet::new()),
            failing_sends: Mutex::new(HashSet::new()),
            audio_send_count: AtomicUsize::new(0),
        }
    }

    pub fn reject_action(&self, action: ActionKind) {
        self.rejected_actions.lock().unwrap().insert(action);
    }

    pub fn fail_send(&self, index: usize) {
        self.failing_sends.lock().unwrap().insert(index);
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn actions(&self) -> Vec<ActionKind> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                GatewayCall::Action(a) => Some(a),
                _ => None,
            })
            .collect()
    }

    pub fn audio_chunks(&self) -> Vec<Vec<u8>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                GatewayCall::Audio(bytes) => Some(bytes),
                _ => None,
            })
            .collect()
    }

    pub fn total_audio_bytes(&self) -> usize {
        self.audio_chunks().iter().map(|c| c.len()).sum()
    }

    pub fn responses(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                GatewayCall::Response(text) => Some(text),
                _ => None,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl EngineGateway for RecordingGateway {
    async fn connect(&self, _config: &EngineConfig) -> StatusCode {
        StatusCode::Success
    }

    async fn disconnect(&self) -> StatusCode {
        StatusCode::Success
    }

    async fn destroy(&self) -> StatusCode {
        StatusCode::Success
    }

    async fn send_audio(&self, data: &[u8]) -> StatusCode {
        let index = self.audio_send_count.fetch_add(1, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push(GatewayCall::Audio(data.to_vec()));
        if self.failing_sends.lock().unwrap().contains(&index) {
            StatusCode::SendDataFailed
        } else {
            StatusCode::Success
        }
    }

    async fn send_action(&self, action: ActionKind) -> StatusCode {
        if self.rejected_actions.lock().unwrap().contains(&action) {
            return StatusCode::RequestDenied;
        }
        self.calls
            .lock()
            .unwrap()
            .push(GatewayCall::Action(action));
        StatusCode::Success
    }

    async fn request_response(&self, text: &str) -> StatusCode {
        self.calls
            .lock()
            .unwrap()
            .push(GatewayCall::Response(text.to_string()));
        StatusCode::Success
    }
}
