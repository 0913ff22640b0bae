pub mod cli;
pub mod config;
pub mod downlink;
pub mod engine;
pub mod session;
pub mod transcode;
pub mod uplink;

pub use cli::{Command, CommandRunner};
pub use config::Config;
pub use downlink::{DownlinkSink, SessionRecording};
pub use engine::{
    ActionKind, DialogEvent, DialogState, EngineConfig, EngineGateway, EventKind, LoopbackEngine,
    StatusCode,
};
pub use session::{DialogTracker, SessionContext, SessionController};
pub use transcode::{TranscodeSupervisor, TranscodeTicket};
pub use uplink::{AudioChunk, AudioFormat, UplinkError, UplinkJob, UplinkStats};
