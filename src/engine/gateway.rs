use serde_json::json;

/// Status codes returned by the engine gateway.
///
/// Reduced from the full engine code set to the values this client acts on;
/// everything else the engine might return collapses to `DefaultError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Success,
    DefaultError,
    NotConnected,
    InvalidState,
    SendDataFailed,
    RequestDenied,
    InvokeInvalidAction,
}

impl StatusCode {
    pub fn is_success(&self) -> bool {
        matches!(self, StatusCode::Success)
    }
}

/// Actions the client synchronizes with the engine.
///
/// `PlayerStarted`/`PlayerStopped` keep the engine's picture of the local
/// player accurate; the speech pair brackets uplink audio in push-to-talk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    PlayerStarted,
    PlayerStopped,
    StartHumanSpeech,
    StopHumanSpeech,
    EnableVoiceInterruption,
    DisableVoiceInterruption,
}

/// Upstream (client → engine) audio description.
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub audio_format: String,
    pub sample_rate: u32,
}

/// Downstream (engine → client) audio description.
#[derive(Debug, Clone)]
pub struct DownstreamSettings {
    pub voice: String,
    pub audio_format: String,
    pub sample_rate: u32,
}

/// Parameters handed to the engine at connect time.
///
/// Rendered as a JSON document; the key set is fixed by the engine protocol
/// and recognized keys are enumerated here rather than redesigned.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Interaction mode: "tap2talk", "push2talk", "duplex", "kws_duplex"
    pub mode: String,
    /// Transport protocol version
    pub ws_version: u32,
    /// Engine-side log level: "verbose", "debug", "info", "warn", "error"
    pub log_level: String,
    pub url: String,
    pub apikey: String,
    pub upstream: UpstreamSettings,
    pub downstream: DownstreamSettings,
    /// System prompt for the dialog
    pub prompt: String,
    /// Caller identity forwarded as client info
    pub user_id: String,
}

impl EngineConfig {
    /// Render the connect-parameter document the engine expects.
    pub fn to_connect_params(&self) -> String {
        let root = json!({
            "mode": self.mode,
            "chain_mode": "ws",
            "ws_version": self.ws_version,
            "log_level": self.log_level,
            "url": self.url,
            "apikey": self.apikey,
            "upstream": {
                "type": "AudioOnly",
                "audio_format": self.upstream.audio_format,
                "sample_rate": self.upstream.sample_rate,
            },
            "downstream": {
                "type": "Audio",
                "voice": self.downstream.voice,
                "audio_format": self.downstream.audio_format,
                "sample_rate": self.downstream.sample_rate,
            },
            "client_info": {
                "user_id": self.user_id,
            },
            "dialog_attributes": {
                "prompt": self.prompt,
            },
        });
        root.to_string()
    }
}

/// The external conversational engine boundary.
///
/// Outbound operations only; inbound events arrive on an `mpsc` channel the
/// gateway implementation produces, one channel per session, serialized.
#[async_trait::async_trait]
pub trait EngineGateway: Send + Sync {
    /// Establish the managed connection
    async fn connect(&self, config: &EngineConfig) -> StatusCode;

    /// Tear down the managed connection
    async fn disconnect(&self) -> StatusCode;

    /// Release engine resources; the gateway is unusable afterwards
    async fn destroy(&self) -> StatusCode;

    /// Push one chunk of uplink audio
    async fn send_audio(&self, data: &[u8]) -> StatusCode;

    /// Synchronize a local hardware/interaction state change with the engine
    async fn send_action(&self, action: ActionKind) -> StatusCode;

    /// Ask the engine to speak the given text (engine-side synthesis)
    async fn request_response(&self, text: &str) -> StatusCode;
}
