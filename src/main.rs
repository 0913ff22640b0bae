use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;
use voicelink::cli::{Command, CommandRunner, HELP_TEXT};
use voicelink::engine::{DialogEvent, EventKind};
use voicelink::{
    Config, DownlinkSink, EngineGateway, LoopbackEngine, SessionContext, SessionController,
    TranscodeSupervisor,
};

#[derive(Debug, Parser)]
#[command(name = "voicelink", about = "Real-time voice dialog session controller")]
struct Args {
    /// Config file (without extension, per the config crate)
    #[arg(long)]
    config: Option<String>,

    /// Engine API key (overrides config)
    #[arg(long)]
    apikey: Option<String>,

    /// Engine endpoint URL (overrides config)
    #[arg(long)]
    url: Option<String>,

    /// Recorded audio file to stream uplink (overrides config)
    #[arg(long)]
    audio: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(apikey) = args.apikey {
        cfg.engine.apikey = apikey;
    }
    if let Some(url) = args.url {
        cfg.engine.url = url;
    }
    if let Some(audio) = args.audio {
        cfg.audio.uplink_source = audio;
    }

    info!("voicelink v{}", env!("CARGO_PKG_VERSION"));
    info!("engine url: {}", cfg.engine.url);
    info!("output dir: {}", cfg.audio.output_dir);

    let session_id = format!("session-{}", uuid::Uuid::new_v4());

    // Local run against the loopback engine; a real deployment substitutes
    // its own EngineGateway implementation here.
    let gateway = Arc::new(LoopbackEngine::new(demo_script(&session_id)));

    let ret = gateway.connect(&cfg.engine_config()).await;
    if !ret.is_success() {
        bail!("engine connect failed: {:?}", ret);
    }

    let ctx = Arc::new(SessionContext::new(
        session_id.clone(),
        Arc::clone(&gateway) as Arc<dyn EngineGateway>,
    ));
    let transcoder = Arc::new(TranscodeSupervisor::new(cfg.engine.downstream_sample_rate, 1));
    let sink = DownlinkSink::new(&cfg.audio.output_dir, Arc::clone(&transcoder))?;

    let uplink_job = if std::path::Path::new(&cfg.audio.uplink_source).exists() {
        Some(cfg.uplink_job())
    } else {
        info!(
            "no uplink source at {}, audio commands are disabled",
            cfg.audio.uplink_source
        );
        None
    };

    let mut controller =
        SessionController::new(Arc::clone(&ctx), sink, transcoder, uplink_job.clone());

    let (event_tx, event_rx) = mpsc::channel(64);
    let replay = gateway.replay(event_tx);
    let controller_task = tokio::spawn(async move {
        controller.run(event_rx).await;
        controller
    });

    // Console loop, as in the original client: commands drive the session
    // until the user quits or stdin closes.
    println!("{}", HELP_TEXT);
    let mut runner = CommandRunner::new(Arc::clone(&ctx), uplink_job);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(b">> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if !runner.execute(Command::parse(&line)).await {
            break;
        }
    }

    runner.join_uplinks().await;
    replay.await?;
    let controller = controller_task.await?;
    controller.shutdown().await?;

    info!("session {} finished", session_id);
    Ok(())
}

/// A short scripted dialog: the engine goes idle, the conversation starts,
/// one synthesized reply streams back, then the session completes.
fn demo_script(session_id: &str) -> Vec<DialogEvent> {
    let reply_chunk = vec![0u8; 4800];
    vec![
        DialogEvent::new(session_id, EventKind::Connected),
        DialogEvent::new(session_id, EventKind::DialogStateChanged(0)),
        DialogEvent::new(session_id, EventKind::ConversationStarted),
        DialogEvent::new(session_id, EventKind::SentenceBegin),
        DialogEvent::new(session_id, EventKind::SentenceEnd),
        DialogEvent::new(session_id, EventKind::DialogStateChanged(3)),
        DialogEvent::new(session_id, EventKind::DialogStateChanged(2)),
        DialogEvent::new(session_id, EventKind::DataOutputStarted),
        DialogEvent::new(session_id, EventKind::Binary(reply_chunk.clone())),
        DialogEvent::new(session_id, EventKind::Binary(reply_chunk)),
        DialogEvent::new(session_id, EventKind::DataOutputCompleted),
        DialogEvent::new(session_id, EventKind::DialogStateChanged(0)),
        DialogEvent::new(session_id, EventKind::ConversationCompleted),
    ]
}
