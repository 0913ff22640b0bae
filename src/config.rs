use anyhow::Result;
use serde::Deserialize;

use crate::engine::{DownstreamSettings, EngineConfig, UpstreamSettings};
use crate::uplink::{AudioFormat, UplinkJob};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub engine: EngineSettings,
    pub audio: AudioSettings,
}

/// Settings forwarded to the engine gateway at connect time.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    pub url: String,
    pub apikey: String,
    /// "tap2talk", "push2talk", "duplex" or "kws_duplex"
    pub mode: String,
    pub ws_version: u32,
    pub log_level: String,
    pub voice: String,
    pub upstream_sample_rate: u32,
    pub downstream_sample_rate: u32,
    pub prompt: String,
    pub user_id: String,
}

/// Local audio handling settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AudioSettings {
    /// Where downlink recordings and transcoded artifacts land
    pub output_dir: String,
    /// Recorded audio file streamed on conversation start
    pub uplink_source: String,
    /// "pcm" or "opus"
    pub uplink_format: String,
    pub chunk_size: usize,
    pub skip_wav_header: bool,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// The connect-time parameter set for the engine gateway.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            mode: self.engine.mode.clone(),
            ws_version: self.engine.ws_version,
            log_level: self.engine.log_level.clone(),
            url: self.engine.url.clone(),
            apikey: self.engine.apikey.clone(),
            upstream: UpstreamSettings {
                audio_format: self.audio.uplink_format.clone(),
                sample_rate: self.engine.upstream_sample_rate,
            },
            downstream: DownstreamSettings {
                voice: self.engine.voice.clone(),
                audio_format: "pcm".to_string(),
                sample_rate: self.engine.downstream_sample_rate,
            },
            prompt: self.engine.prompt.clone(),
            user_id: self.engine.user_id.clone(),
        }
    }

    /// The uplink job described by the audio settings.
    pub fn uplink_job(&self) -> UplinkJob {
        let format = match self.audio.uplink_format.as_str() {
            "opus" | "raw-opus" => AudioFormat::Opus,
            _ => AudioFormat::Pcm,
        };
        UplinkJob {
            source: self.audio.uplink_source.clone().into(),
            format,
            sample_rate: self.engine.upstream_sample_rate,
            channels: 1,
            chunk_size: self.audio.chunk_size,
            skip_wav_header: self.audio.skip_wav_header,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineSettings {
                url: "wss://dashscope.aliyuncs.com/api-ws/v1/inference".to_string(),
                apikey: String::new(),
                mode: "push2talk".to_string(),
                ws_version: 3,
                log_level: "info".to_string(),
                voice: "longanhuan".to_string(),
                upstream_sample_rate: 16000,
                downstream_sample_rate: 24000,
                prompt: "You are a helpful assistant.".to_string(),
                user_id: String::new(),
            },
            audio: AudioSettings {
                output_dir: "tmp".to_string(),
                uplink_source: "audio_16k.pcm".to_string(),
                uplink_format: "pcm".to_string(),
                chunk_size: 640,
                skip_wav_header: false,
            },
        }
    }
}
