//! Downlink audio persistence
//!
//! Every binary payload the engine sends is written twice: once as its own
//! per-chunk file and once appended to the session's cumulative file. The two
//! writes are independent failure domains, and neither failure reaches the
//! caller — a missing recording degrades gracefully, it never aborts the
//! conversation.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::transcode::{TranscodeSupervisor, TranscodeTicket};

/// Accumulated recording state for one session.
///
/// Created on the first binary event for the session and append-only for the
/// session's lifetime; never explicitly closed.
#[derive(Debug, Clone)]
pub struct SessionRecording {
    pub session_id: String,
    /// Per-chunk files, in arrival order
    pub chunk_paths: Vec<PathBuf>,
    /// Cumulative append-only file
    pub total_path: PathBuf,
}

/// Persists inbound binary audio and kicks off post-processing.
pub struct DownlinkSink {
    out_dir: PathBuf,

    /// Process-wide counter folded into chunk file names; guards against
    /// collisions within the same wall-clock second
    chunk_counter: AtomicU64,

    /// Recordings keyed by session id, each entry independently lockable
    recordings: Mutex<HashMap<String, Arc<Mutex<SessionRecording>>>>,

    transcoder: Arc<TranscodeSupervisor>,
}

impl DownlinkSink {
    pub fn new(out_dir: impl Into<PathBuf>, transcoder: Arc<TranscodeSupervisor>) -> Result<Self> {
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir).context("Failed to create downlink output directory")?;

        Ok(Self {
            out_dir,
            chunk_counter: AtomicU64::new(0),
            recordings: Mutex::new(HashMap::new()),
            transcoder,
        })
    }

    /// Persist one binary payload for `session_id`. Fire-and-forget: all
    /// failures are logged and contained here.
    pub fn on_binary(&self, session_id: &str, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }

        let recording = self.recording_entry(session_id);

        let secs = chrono::Utc::now().timestamp();
        let counter = self.chunk_counter.fetch_add(1, Ordering::SeqCst);
        let chunk_path = self
            .out_dir
            .join(format!("binary_{}_{}_{}.pcm", session_id, secs, counter));

        // Per-chunk write; a failure here must not stop the append below.
        match fs::write(&chunk_path, bytes) {
            Ok(()) => {
                debug!("saved binary chunk {} ({} bytes)", chunk_path.display(), bytes.len());
                let mut rec = recording.lock().expect("recording entry poisoned");
                rec.chunk_paths.push(chunk_path);
            }
            Err(e) => error!("failed to write chunk {}: {}", chunk_path.display(), e),
        }

        // Independent append to the cumulative file.
        let total_path = {
            let rec = recording.lock().expect("recording entry poisoned");
            rec.total_path.clone()
        };
        match append_to(&total_path, bytes) {
            Ok(()) => {
                if self.transcoder.request(total_path) == TranscodeTicket::Skipped {
                    debug!("transcode already running, request skipped");
                }
            }
            Err(e) => error!("failed to append to {}: {}", total_path.display(), e),
        }
    }

    /// Current recording state for a session, if any binary data arrived.
    pub fn recording(&self, session_id: &str) -> Option<SessionRecording> {
        let registry = self.recordings.lock().expect("recording registry poisoned");
        registry
            .get(session_id)
            .map(|entry| entry.lock().expect("recording entry poisoned").clone())
    }

    fn recording_entry(&self, session_id: &str) -> Arc<Mutex<SessionRecording>> {
        let mut registry = self.recordings.lock().expect("recording registry poisoned");
        registry
            .entry(session_id.to_string())
            .or_insert_with(|| {
                info!("first binary payload for session {}, opening recording", session_id);
                Arc::new(Mutex::new(SessionRecording {
                    session_id: session_id.to_string(),
                    chunk_paths: Vec::new(),
                    total_path: self.out_dir.join(format!("binary_{}_total.pcm", session_id)),
                }))
            })
            .clone()
    }
}

fn append_to(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(bytes)
}
