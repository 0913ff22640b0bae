//! The conversational engine boundary
//!
//! Everything behind `EngineGateway` is opaque: connection management, speech
//! recognition, synthesis and the wire protocol all live on the other side.
//! This module only defines the boundary types and a loopback implementation
//! for running without a real engine.

pub mod event;
pub mod gateway;
pub mod loopback;

pub use event::{DialogEvent, DialogState, EventKind};
pub use gateway::{
    ActionKind, DownstreamSettings, EngineConfig, EngineGateway, StatusCode, UpstreamSettings,
};
pub use loopback::LoopbackEngine;
