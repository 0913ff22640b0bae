use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::downlink::DownlinkSink;
use crate::engine::{ActionKind, DialogEvent, DialogState, EventKind};
use crate::transcode::TranscodeSupervisor;
use crate::uplink::{self, UplinkJob};

use super::context::SessionContext;
use super::tracker::DialogTracker;

/// How long shutdown waits for an uplink job before cancelling it.
///
/// A job stuck polling a gate that never opens would otherwise block
/// teardown forever.
const UPLINK_JOIN_GRACE: Duration = Duration::from_secs(5);

/// Drives one dialog session: consumes engine events in arrival order,
/// keeps the dialog state and TurnGate current, synchronizes player state
/// with the engine, routes downlink audio to the sink and launches uplink
/// jobs.
///
/// Uplink tasks and the transcode job are owned here: `shutdown` joins them,
/// which is the session's explicit teardown point.
pub struct SessionController {
    ctx: Arc<SessionContext>,
    tracker: DialogTracker,
    sink: DownlinkSink,
    transcoder: Arc<TranscodeSupervisor>,

    /// Job to launch when the engine reports the conversation started
    auto_uplink: Option<UplinkJob>,

    uplink_tasks: Vec<JoinHandle<()>>,
}

impl SessionController {
    pub fn new(
        ctx: Arc<SessionContext>,
        sink: DownlinkSink,
        transcoder: Arc<TranscodeSupervisor>,
        auto_uplink: Option<UplinkJob>,
    ) -> Self {
        Self {
            ctx,
            tracker: DialogTracker::new(),
            sink,
            transcoder,
            auto_uplink,
            uplink_tasks: Vec::new(),
        }
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.ctx
    }

    pub fn sink(&self) -> &DownlinkSink {
        &self.sink
    }

    pub fn tracker(&self) -> &DialogTracker {
        &self.tracker
    }

    /// Process events until the channel closes.
    ///
    /// Events are handled strictly one at a time; each event's side effects
    /// complete before the next event is looked at.
    pub async fn run(&mut self, mut events: mpsc::Receiver<DialogEvent>) {
        info!("session {} event loop started", self.ctx.session_id());
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        info!("session {} event loop finished", self.ctx.session_id());
    }

    /// Handle a single engine event.
    pub async fn handle_event(&mut self, event: DialogEvent) {
        match event.kind {
            EventKind::Connected => info!("engine connection established"),
            EventKind::Disconnected => warn!("engine connection lost"),

            EventKind::ConversationStarted => {
                info!("conversation started (session {})", event.session_id);
                if let Some(job) = self.auto_uplink.take() {
                    self.start_uplink(job);
                }
            }
            EventKind::ConversationCompleted => {
                info!("conversation completed (session {})", event.session_id);
            }
            EventKind::ConversationFailed { code, message } => {
                error!(
                    "conversation failed (session {}): code={} {}",
                    event.session_id, code, message
                );
                self.tracker.mark_failed();
            }

            EventKind::SentenceBegin => info!("engine detected start of human speech"),
            EventKind::SentenceEnd => info!("engine ruled the human utterance finished"),

            EventKind::DialogStateChanged(code) => {
                match DialogState::from_code(code) {
                    Some(state) => {
                        self.tracker.observe(state);
                        self.ctx.set_gate(self.tracker.gate_open());
                    }
                    None => warn!("ignoring unknown dialog state code {}", code),
                }
            }

            EventKind::DataOutputStarted => {
                info!("synthesized output starting, reporting player started");
                self.send_action(ActionKind::PlayerStarted).await;
            }
            EventKind::DataOutputCompleted => {
                info!("synthesized output delivered, reporting player stopped");
                self.send_action(ActionKind::PlayerStopped).await;
            }

            EventKind::Binary(bytes) => {
                self.sink.on_binary(&event.session_id, &bytes);
            }

            EventKind::InterruptDecision { accepted } => {
                info!("interrupt request {}", if accepted { "accepted" } else { "denied" });
            }

            // High-frequency volume reports carry no coordination value here.
            EventKind::SoundLevel { .. } => {}
        }
    }

    /// Launch an uplink streaming job on its own task, retaining the handle.
    pub fn start_uplink(&mut self, job: UplinkJob) {
        if self.tracker.failed() {
            warn!("session already failed, not starting uplink job");
            return;
        }

        let ctx = Arc::clone(&self.ctx);
        let handle = tokio::spawn(async move {
            match uplink::stream(ctx, job).await {
                Ok(stats) => info!(
                    "uplink job completed: {} chunks, {} bytes",
                    stats.chunks_sent, stats.bytes_sent
                ),
                Err(e) => error!("uplink job failed: {}", e),
            }
        });
        self.uplink_tasks.push(handle);
    }

    /// Join in-flight work and release the engine.
    pub async fn shutdown(mut self) -> Result<()> {
        info!("shutting down session {}", self.ctx.session_id());

        for mut handle in self.uplink_tasks.drain(..) {
            match tokio::time::timeout(UPLINK_JOIN_GRACE, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("uplink task panicked: {}", e),
                Err(_) => {
                    warn!("uplink task still running after {:?}, cancelling", UPLINK_JOIN_GRACE);
                    handle.abort();
                }
            }
        }

        self.transcoder.join_inflight().await;

        let ret = self.ctx.gateway().disconnect().await;
        if !ret.is_success() {
            warn!("disconnect returned {:?}", ret);
        }
        let ret = self.ctx.gateway().destroy().await;
        if !ret.is_success() {
            warn!("destroy returned {:?}", ret);
        }

        Ok(())
    }

    /// Issue an action unless the session has terminally failed.
    async fn send_action(&self, action: ActionKind) {
        if self.tracker.failed() {
            warn!("session failed, suppressing action {:?}", action);
            return;
        }
        let ret = self.ctx.gateway().send_action(action).await;
        if !ret.is_success() {
            warn!("send_action {:?} returned {:?}", action, ret);
        }
    }
}
