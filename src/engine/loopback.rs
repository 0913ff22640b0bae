use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;

use super::event::DialogEvent;
use super::gateway::{ActionKind, EngineConfig, EngineGateway, StatusCode};

/// In-process stand-in for the real engine.
///
/// Accepts every call and replays a scripted event sequence into the session
/// event channel, so the binary and integration tests can exercise the full
/// controller path without engine credentials. Outbound audio and actions are
/// acknowledged and dropped.
pub struct LoopbackEngine {
    script: Mutex<Vec<DialogEvent>>,
    /// Delay between replayed events
    event_gap: Duration,
}

impl LoopbackEngine {
    pub fn new(script: Vec<DialogEvent>) -> Self {
        Self {
            script: Mutex::new(script),
            event_gap: Duration::from_millis(10),
        }
    }

    pub fn with_event_gap(mut self, gap: Duration) -> Self {
        self.event_gap = gap;
        self
    }

    /// Start replaying the script into `events`.
    ///
    /// Returns the task handle so the caller can await script exhaustion.
    pub fn replay(&self, events: mpsc::Sender<DialogEvent>) -> tokio::task::JoinHandle<()> {
        let script: Vec<DialogEvent> = {
            let mut guard = self.script.lock().expect("loopback script poisoned");
            std::mem::take(&mut *guard)
        };
        let gap = self.event_gap;

        tokio::spawn(async move {
            for event in script {
                if events.send(event).await.is_err() {
                    break;
                }
                tokio::time::sleep(gap).await;
            }
        })
    }
}

#[async_trait::async_trait]
impl EngineGateway for LoopbackEngine {
    async fn connect(&self, config: &EngineConfig) -> StatusCode {
        info!("loopback engine connected (mode={})", config.mode);
        StatusCode::Success
    }

    async fn disconnect(&self) -> StatusCode {
        info!("loopback engine disconnected");
        StatusCode::Success
    }

    async fn destroy(&self) -> StatusCode {
        StatusCode::Success
    }

    async fn send_audio(&self, _data: &[u8]) -> StatusCode {
        StatusCode::Success
    }

    async fn send_action(&self, action: ActionKind) -> StatusCode {
        info!("loopback engine acknowledged action {:?}", action);
        StatusCode::Success
    }

    async fn request_response(&self, text: &str) -> StatusCode {
        info!("loopback engine received response request ({} chars)", text.len());
        StatusCode::Success
    }
}
