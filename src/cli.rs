//! Interactive command surface
//!
//! Maps console commands onto session operations: trigger an uplink pass,
//! ask the engine to speak a text, toggle voice interruption. The binary
//! reads stdin and feeds lines through `Command::parse` into a
//! `CommandRunner`.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::engine::ActionKind;
use crate::session::SessionContext;
use crate::uplink::{self, UplinkJob};

/// Spoken when the speak command is given without its own text.
const DEFAULT_SPEAK_TEXT: &str = "Happiness is a skill: the calm left over once surplus wants are set aside.";

/// How long `join_uplinks` waits per job before cancelling it.
const UPLINK_JOIN_GRACE: Duration = Duration::from_secs(5);

pub const HELP_TEXT: &str =
    "commands: 1=send audio, 2 [text]=have the engine speak, 3=toggle voice interruption, help, q=quit";

/// One parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Stream the configured audio source uplink
    SendAudio,
    /// Ask the engine to synthesize and speak this text
    Speak(String),
    /// Flip voice interruption on or off
    ToggleVoiceInterrupt,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let line = line.trim();
        match line {
            "" => Command::Empty,
            "1" => Command::SendAudio,
            "2" => Command::Speak(DEFAULT_SPEAK_TEXT.to_string()),
            "3" => Command::ToggleVoiceInterrupt,
            "help" => Command::Help,
            "q" | "quit" | "exit" => Command::Quit,
            other => match other.strip_prefix("2 ") {
                Some(text) if !text.trim().is_empty() => Command::Speak(text.trim().to_string()),
                _ => Command::Unknown(other.to_string()),
            },
        }
    }
}

/// Executes console commands against a session.
///
/// Uplink passes triggered here run on their own tasks; the runner keeps the
/// handles and `join_uplinks` bounds the wait at teardown.
pub struct CommandRunner {
    ctx: Arc<SessionContext>,
    uplink_job: Option<UplinkJob>,
    voice_interrupt_enabled: bool,
    uplink_tasks: Vec<JoinHandle<()>>,
}

impl CommandRunner {
    pub fn new(ctx: Arc<SessionContext>, uplink_job: Option<UplinkJob>) -> Self {
        Self {
            ctx,
            uplink_job,
            voice_interrupt_enabled: false,
            uplink_tasks: Vec::new(),
        }
    }

    pub fn voice_interrupt_enabled(&self) -> bool {
        self.voice_interrupt_enabled
    }

    /// Run one command. Returns false when the session should end.
    pub async fn execute(&mut self, command: Command) -> bool {
        match command {
            Command::SendAudio => {
                let Some(job) = self.uplink_job.clone() else {
                    warn!("no uplink source configured, nothing to send");
                    return true;
                };
                let ctx = Arc::clone(&self.ctx);
                let handle = tokio::spawn(async move {
                    match uplink::stream(ctx, job).await {
                        Ok(stats) => info!(
                            "uplink pass completed: {} chunks, {} bytes",
                            stats.chunks_sent, stats.bytes_sent
                        ),
                        Err(e) => error!("uplink pass failed: {}", e),
                    }
                });
                self.uplink_tasks.push(handle);
            }

            Command::Speak(text) => {
                let ret = self.ctx.gateway().request_response(&text).await;
                if !ret.is_success() {
                    warn!("response request returned {:?}", ret);
                }
            }

            Command::ToggleVoiceInterrupt => {
                let action = if self.voice_interrupt_enabled {
                    ActionKind::DisableVoiceInterruption
                } else {
                    ActionKind::EnableVoiceInterruption
                };
                let ret = self.ctx.gateway().send_action(action).await;
                if ret.is_success() {
                    self.voice_interrupt_enabled = !self.voice_interrupt_enabled;
                    info!(
                        "voice interruption {}",
                        if self.voice_interrupt_enabled { "enabled" } else { "disabled" }
                    );
                } else {
                    warn!("send_action {:?} returned {:?}", action, ret);
                }
            }

            Command::Help => println!("{}", HELP_TEXT),
            Command::Quit => return false,
            Command::Empty => {}
            Command::Unknown(line) => println!("Unknown command: {}", line),
        }
        true
    }

    /// Join uplink passes started from the console, cancelling stragglers.
    pub async fn join_uplinks(&mut self) {
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
    }
}
