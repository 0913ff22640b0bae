//! Dialog session coordination
//!
//! This module owns the turn-taking core:
//! - `SessionContext`: shared gateway handle + TurnGate
//! - `DialogTracker`: engine-driven dialog state machine
//! - `SessionController`: the sequential event loop and task ownership

mod context;
mod controller;
mod tracker;

pub use context::SessionContext;
pub use controller::SessionController;
pub use tracker::DialogTracker;
