//! Single-flight transcoding of accumulated downlink audio
//!
//! Turns a session's raw PCM accumulation into a playable WAV artifact in the
//! background. At most one conversion runs per process; requests arriving
//! while one is in flight are skipped, not queued.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Whether a transcode request was taken up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeTicket {
    Accepted,
    /// A conversion is already running; this request is dropped. The running
    /// job reflects whatever data existed when it started.
    Skipped,
}

/// Supervises the per-process single-flight transcode job.
pub struct TranscodeSupervisor {
    busy: Arc<AtomicBool>,
    sample_rate: u32,
    channels: u16,

    /// Most recent accepted job, retained so teardown has a join point
    inflight: Mutex<Option<JoinHandle<()>>>,
}

impl TranscodeSupervisor {
    /// `sample_rate`/`channels` describe the downstream audio the engine
    /// sends, which is what the accumulation files contain.
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            busy: Arc::new(AtomicBool::new(false)),
            sample_rate,
            channels,
            inflight: Mutex::new(None),
        }
    }

    /// Request a conversion of `source` into a sibling `.wav` artifact.
    ///
    /// Non-blocking; the conversion itself runs on a blocking worker task.
    /// Conversion errors are logged and swallowed, and the busy flag is
    /// always released.
    pub fn request(&self, source: PathBuf) -> TranscodeTicket {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return TranscodeTicket::Skipped;
        }

        let busy = Arc::clone(&self.busy);
        let sample_rate = self.sample_rate;
        let channels = self.channels;

        let handle = tokio::task::spawn_blocking(move || {
            match transcode_pcm_to_wav(&source, sample_rate, channels) {
                Ok(artifact) => info!("transcoded {} -> {}", source.display(), artifact.display()),
                Err(e) => error!("transcode of {} failed: {:#}", source.display(), e),
            }
            busy.store(false, Ordering::SeqCst);
        });

        let mut guard = self.inflight.lock().expect("transcode handle lock poisoned");
        *guard = Some(handle);

        TranscodeTicket::Accepted
    }

    /// Wait for the in-flight conversion, if any, to finish.
    pub async fn join_inflight(&self) {
        let handle = {
            let mut guard = self.inflight.lock().expect("transcode handle lock poisoned");
            guard.take()
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("transcode task panicked: {}", e);
            }
        }
    }
}

/// Convert a raw 16-bit LE PCM file into a WAV next to it (`.wav` extension
/// substituted). Returns the artifact path.
fn transcode_pcm_to_wav(source: &Path, sample_rate: u32, channels: u16) -> Result<PathBuf> {
    let raw = std::fs::read(source)
        .with_context(|| format!("failed to read PCM accumulation {}", source.display()))?;

    let artifact = source.with_extension("wav");
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(&artifact, spec)
        .with_context(|| format!("failed to create WAV file {}", artifact.display()))?;

    // A trailing odd byte cannot form a sample and is dropped.
    for pair in raw.chunks_exact(2) {
        let sample = i16::from_le_bytes([pair[0], pair[1]]);
        writer
            .write_sample(sample)
            .context("failed to write sample to WAV")?;
    }

    writer.finalize().context("failed to finalize WAV file")?;
    Ok(artifact)
}
