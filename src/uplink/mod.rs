//! Paced uplink audio streaming
//!
//! Streams a recorded audio source to the engine at real-time speed, gated on
//! the engine being Idle and bracketed by explicit speech-start/stop actions.

use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{info, warn};

use crate::engine::{ActionKind, StatusCode};
use crate::session::SessionContext;

/// How often the streamer re-samples the TurnGate while waiting to start
const GATE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Grace period after speech-start so the engine can switch state before
/// audio arrives
const START_SETTLE_DELAY: Duration = Duration::from_millis(300);

/// Floor on the per-chunk pacing sleep; avoids a degenerate tight loop on
/// tiny chunks
const MIN_CHUNK_DELAY_MS: u64 = 5;

/// Pacing sleep for encoded formats, where real-time duration cannot be
/// derived from byte count
const ENCODED_CHUNK_DELAY: Duration = Duration::from_millis(20);

/// Byte length of the typical RIFF/WAVE header this client knows how to skip
const WAV_HEADER_LEN: u64 = 44;

/// One read-off-the-source audio buffer, immutable once created.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    seq: u64,
    produced_at: chrono::DateTime<chrono::Utc>,
    data: Vec<u8>,
}

impl AudioChunk {
    fn new(seq: u64, data: Vec<u8>) -> Self {
        Self {
            seq,
            produced_at: chrono::Utc::now(),
            data,
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn produced_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.produced_at
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Uplink audio encoding tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// Raw 16-bit little-endian PCM
    Pcm,
    /// Already-encoded opus payload
    Opus,
}

/// One uplink streaming job. Immutable once created; terminal outcomes are
/// final, there is no resumption.
#[derive(Debug, Clone)]
pub struct UplinkJob {
    pub source: PathBuf,
    pub format: AudioFormat,
    pub sample_rate: u32,
    pub channels: u16,
    /// Read size per send; the final chunk may be shorter
    pub chunk_size: usize,
    /// Probe the source for a WAV container header and skip it if present
    pub skip_wav_header: bool,
}

impl UplinkJob {
    /// A 16 kHz mono PCM job with the engine's preferred 640-byte frames.
    pub fn pcm_16k(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            format: AudioFormat::Pcm,
            sample_rate: 16000,
            channels: 1,
            chunk_size: 640,
            skip_wav_header: false,
        }
    }
}

/// Why an uplink job aborted without streaming.
///
/// Per-chunk send failures are deliberately absent: those are logged and
/// streaming continues, best effort.
#[derive(Debug, thiserror::Error)]
pub enum UplinkError {
    #[error("failed to open uplink source: {0}")]
    SourceUnavailable(#[from] std::io::Error),

    #[error("engine rejected speech-start action: {0:?}")]
    ActionRejected(StatusCode),
}

/// Outcome of a completed uplink job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UplinkStats {
    pub chunks_sent: usize,
    pub bytes_sent: usize,
    pub chunks_failed: usize,
}

/// Stream `job` to the engine.
///
/// Waits for the TurnGate to open, issues speech-start, streams the source in
/// real-time-paced chunks, and always closes with speech-stop once streaming
/// has begun. The gate is sampled only before the start action, never
/// mid-stream.
pub async fn stream(ctx: Arc<SessionContext>, job: UplinkJob) -> Result<UplinkStats, UplinkError> {
    let mut source = File::open(&job.source).await?;

    if job.skip_wav_header && job.format == AudioFormat::Pcm {
        skip_wav_header_if_present(&mut source).await?;
    }

    // Wait for permission to speak. Timed poll, not a busy spin.
    while !ctx.gate_open() {
        tokio::time::sleep(GATE_POLL_INTERVAL).await;
    }

    let start_ret = ctx.gateway().send_action(ActionKind::StartHumanSpeech).await;
    if !start_ret.is_success() {
        warn!(
            "speech-start rejected ({:?}), aborting uplink without sending audio",
            start_ret
        );
        return Err(UplinkError::ActionRejected(start_ret));
    }

    // Let the engine switch state before audio arrives.
    tokio::time::sleep(START_SETTLE_DELAY).await;

    let mut stats = UplinkStats {
        chunks_sent: 0,
        bytes_sent: 0,
        chunks_failed: 0,
    };
    let mut buf = vec![0u8; job.chunk_size];
    let mut seq = 0u64;

    loop {
        // A read failure mid-stream ends the source early; the job still
        // completes and still issues speech-stop.
        let n = match read_chunk(&mut source, &mut buf).await {
            Ok(n) => n,
            Err(e) => {
                warn!("uplink source read failed, ending stream: {}", e);
                0
            }
        };
        if n == 0 {
            break;
        }

        // Carries the actual read length, not the fixed chunk size.
        let chunk = AudioChunk::new(seq, buf[..n].to_vec());
        seq += 1;

        let ret = ctx.gateway().send_audio(chunk.data()).await;
        if ret.is_success() {
            stats.chunks_sent += 1;
            stats.bytes_sent += chunk.data().len();
        } else {
            // Best-effort delivery: no retry, no abort.
            warn!(
                "send_audio returned {:?} for chunk {} ({} bytes), continuing",
                ret,
                chunk.seq(),
                chunk.data().len()
            );
            stats.chunks_failed += 1;
        }

        tokio::time::sleep(pacing_delay(&job, chunk.data().len())).await;
    }

    // Speech-stop goes out unconditionally, even after failed chunk sends.
    let stop_ret = ctx.gateway().send_action(ActionKind::StopHumanSpeech).await;
    if !stop_ret.is_success() {
        warn!("speech-stop returned {:?}", stop_ret);
    }

    info!(
        "uplink complete: {} chunks / {} bytes sent, {} chunk sends failed",
        stats.chunks_sent, stats.bytes_sent, stats.chunks_failed
    );
    Ok(stats)
}

/// Fill `buf` as far as the source allows; 0 means exhausted.
async fn read_chunk(source: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Probe the first 12 bytes for a RIFF/WAVE signature; if present skip the
/// typical 44-byte header, otherwise rewind to the start.
///
/// This is a heuristic, not a container parser: files with non-standard chunk
/// ordering or extra chunks before `data` are mis-handled, and that behavior
/// is kept as-is.
async fn skip_wav_header_if_present(source: &mut File) -> std::io::Result<()> {
    let mut header = [0u8; 12];
    let mut filled = 0;
    while filled < header.len() {
        let n = source.read(&mut header[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    if filled == 12 && &header[0..4] == b"RIFF" && &header[8..12] == b"WAVE" {
        source.seek(SeekFrom::Start(WAV_HEADER_LEN)).await?;
    } else {
        source.seek(SeekFrom::Start(0)).await?;
    }
    Ok(())
}

/// Real-time pacing for one sent chunk.
fn pacing_delay(job: &UplinkJob, bytes: usize) -> Duration {
    match job.format {
        AudioFormat::Pcm => {
            // 16-bit samples: bytes per second = rate * channels * 2
            let bytes_per_second = job.sample_rate as u64 * job.channels as u64 * 2;
            if bytes_per_second == 0 {
                return Duration::from_millis(100);
            }
            let ms = (bytes as u64 * 1000 / bytes_per_second).max(MIN_CHUNK_DELAY_MS);
            Duration::from_millis(ms)
        }
        AudioFormat::Opus => ENCODED_CHUNK_DELAY,
    }
}
