/// High-level conversational phase reported by the engine.
///
/// The engine is authoritative: the client never rejects or second-guesses a
/// reported state, it only mirrors it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    /// Engine is idle and ready to accept human speech
    Idle,
    /// Engine is listening to inbound speech
    Listening,
    /// Engine is sending back synthesized output
    Responding,
    /// Engine is working out what to say next
    Thinking,
}

impl DialogState {
    /// Map a raw engine state code to a dialog state.
    ///
    /// Codes outside the known range yield `None` and are ignored upstream.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(DialogState::Idle),
            1 => Some(DialogState::Listening),
            2 => Some(DialogState::Responding),
            3 => Some(DialogState::Thinking),
            _ => None,
        }
    }
}

/// What happened, without the session routing envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Transport-level connection established
    Connected,
    /// Transport-level connection lost
    Disconnected,
    /// Engine accepted the session and the dialog is live
    ConversationStarted,
    /// Dialog finished normally and the engine has left
    ConversationCompleted,
    /// Dialog failed; terminal for the session
    ConversationFailed { code: i32, message: String },
    /// Engine detected the start of human speech
    SentenceBegin,
    /// Engine decided the human has finished speaking
    SentenceEnd,
    /// Engine dialog state changed (raw code, see `DialogState::from_code`)
    DialogStateChanged(i32),
    /// Synthesized audio will follow; the local player should start
    DataOutputStarted,
    /// All synthesized audio for this turn has been delivered
    DataOutputCompleted,
    /// A synthesized audio payload
    Binary(Vec<u8>),
    /// Engine ruled on an interrupt request
    InterruptDecision { accepted: bool },
    /// Input volume report for the most recent audio
    SoundLevel { db: f32, level: i32 },
}

/// A single event delivered by the engine gateway.
///
/// Events for one session are delivered in arrival order over a single
/// channel; ordering across sessions is not defined.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogEvent {
    /// Session this event belongs to
    pub session_id: String,
    pub kind: EventKind,
}

impl DialogEvent {
    pub fn new(session_id: impl Into<String>, kind: EventKind) -> Self {
        Self {
            session_id: session_id.into(),
            kind,
        }
    }
}
