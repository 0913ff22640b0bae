// Integration tests for the session controller: event dispatch, gate
// derivation, action suppression after failure, and the end-to-end uplink
// scenario.

mod common;

use std::sync::Arc;

use anyhow::Result;
use common::RecordingGateway;
use tempfile::TempDir;
use tokio::sync::mpsc;
use voicelink::engine::{DialogEvent, EventKind};
use voicelink::{
    ActionKind, DownlinkSink, EngineGateway, LoopbackEngine, SessionContext, SessionController,
    TranscodeSupervisor, UplinkJob,
};

fn controller_with(
    gateway: &Arc<RecordingGateway>,
    dir: &TempDir,
    auto_uplink: Option<UplinkJob>,
) -> Result<SessionController> {
    let ctx = Arc::new(SessionContext::new(
        "s1",
        Arc::clone(gateway) as Arc<dyn EngineGateway>,
    ));
    let transcoder = Arc::new(TranscodeSupervisor::new(24000, 1));
    let sink = DownlinkSink::new(dir.path(), Arc::clone(&transcoder))?;
    Ok(SessionController::new(ctx, sink, transcoder, auto_uplink))
}

fn event(kind: EventKind) -> DialogEvent {
    DialogEvent::new("s1", kind)
}

#[tokio::test]
async fn player_actions_follow_output_lifecycle() -> Result<()> {
    let dir = TempDir::new()?;
    let gateway = Arc::new(RecordingGateway::new());
    let mut controller = controller_with(&gateway, &dir, None)?;

    controller.handle_event(event(EventKind::DataOutputStarted)).await;
    controller.handle_event(event(EventKind::DataOutputCompleted)).await;

    assert_eq!(
        gateway.actions(),
        vec![ActionKind::PlayerStarted, ActionKind::PlayerStopped]
    );

    Ok(())
}

#[tokio::test]
async fn gate_is_open_iff_latest_state_is_idle() -> Result<()> {
    let dir = TempDir::new()?;
    let gateway = Arc::new(RecordingGateway::new());
    let mut controller = controller_with(&gateway, &dir, None)?;

    // (code, expected gate after processing)
    let steps = [(1, false), (0, true), (2, false), (3, false), (0, true), (0, true)];
    for (code, expect_open) in steps {
        controller
            .handle_event(event(EventKind::DialogStateChanged(code)))
            .await;
        assert_eq!(controller.context().gate_open(), expect_open, "after code {}", code);
    }

    // Unknown codes leave the gate untouched.
    controller
        .handle_event(event(EventKind::DialogStateChanged(7)))
        .await;
    assert!(controller.context().gate_open());

    Ok(())
}

#[tokio::test]
async fn failed_session_issues_no_further_actions() -> Result<()> {
    let dir = TempDir::new()?;
    let gateway = Arc::new(RecordingGateway::new());
    let mut controller = controller_with(&gateway, &dir, None)?;

    controller
        .handle_event(event(EventKind::ConversationFailed {
            code: 310,
            message: "engine went away".to_string(),
        }))
        .await;
    controller.handle_event(event(EventKind::DataOutputStarted)).await;
    controller.handle_event(event(EventKind::DataOutputCompleted)).await;

    assert!(gateway.actions().is_empty());

    Ok(())
}

#[tokio::test]
async fn binary_events_are_persisted_by_the_sink() -> Result<()> {
    let dir = TempDir::new()?;
    let gateway = Arc::new(RecordingGateway::new());
    let mut controller = controller_with(&gateway, &dir, None)?;

    controller
        .handle_event(event(EventKind::Binary(vec![5u8; 120])))
        .await;

    let recording = controller.sink().recording("s1").expect("recording exists");
    assert_eq!(recording.chunk_paths.len(), 1);
    assert_eq!(std::fs::read(&recording.total_path)?.len(), 120);

    controller.shutdown().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn conversation_start_drives_a_full_uplink_pass() -> Result<()> {
    let dir = TempDir::new()?;
    let source = dir.path().join("audio_16k.pcm");
    std::fs::write(&source, vec![0u8; 64000])?;

    let job = UplinkJob::pcm_16k(source);
    let gateway = Arc::new(RecordingGateway::new());
    let mut controller = controller_with(&gateway, &dir, Some(job))?;

    // Engine reports Idle, then the conversation starts.
    controller
        .handle_event(event(EventKind::DialogStateChanged(0)))
        .await;
    controller
        .handle_event(event(EventKind::ConversationStarted))
        .await;

    // shutdown joins the spawned uplink task.
    controller.shutdown().await?;

    let chunks = gateway.audio_chunks();
    assert_eq!(chunks.len(), 100);
    assert!(chunks.iter().all(|c| c.len() <= 640));
    assert_eq!(gateway.total_audio_bytes(), 64000);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn shutdown_completes_when_the_gate_never_opens() -> Result<()> {
    let dir = TempDir::new()?;
    let source = dir.path().join("audio_16k.pcm");
    std::fs::write(&source, vec![0u8; 64000])?;

    let job = UplinkJob::pcm_16k(source);
    let gateway = Arc::new(RecordingGateway::new());
    let mut controller = controller_with(&gateway, &dir, Some(job))?;

    // The conversation starts but the engine never reports Idle, so the
    // uplink job polls a closed gate indefinitely.
    controller
        .handle_event(event(EventKind::ConversationStarted))
        .await;

    // shutdown cancels the stuck job after the grace period instead of
    // hanging on the join.
    controller.shutdown().await?;

    assert!(gateway.audio_chunks().is_empty());
    assert!(gateway.actions().is_empty());

    Ok(())
}

#[tokio::test]
async fn loopback_script_runs_end_to_end() -> Result<()> {
    let dir = TempDir::new()?;

    let script = vec![
        event(EventKind::Connected),
        event(EventKind::DialogStateChanged(0)),
        event(EventKind::ConversationStarted),
        event(EventKind::DialogStateChanged(2)),
        event(EventKind::DataOutputStarted),
        event(EventKind::Binary(vec![1u8; 100])),
        event(EventKind::Binary(vec![2u8; 200])),
        event(EventKind::DataOutputCompleted),
        event(EventKind::DialogStateChanged(0)),
        event(EventKind::ConversationCompleted),
    ];
    let gateway = Arc::new(LoopbackEngine::new(script));

    let ctx = Arc::new(SessionContext::new(
        "s1",
        Arc::clone(&gateway) as Arc<dyn EngineGateway>,
    ));
    let transcoder = Arc::new(TranscodeSupervisor::new(24000, 1));
    let sink = DownlinkSink::new(dir.path(), Arc::clone(&transcoder))?;
    let mut controller = SessionController::new(ctx, sink, transcoder, None);

    let (tx, rx) = mpsc::channel(16);
    let replay = gateway.replay(tx);
    controller.run(rx).await;
    replay.await?;

    let recording = controller.sink().recording("s1").expect("recording exists");
    assert_eq!(recording.chunk_paths.len(), 2);
    assert!(controller.context().gate_open());

    controller.shutdown().await?;
    assert_eq!(std::fs::read(dir.path().join("binary_s1_total.pcm"))?.len(), 300);
    assert!(dir.path().join("binary_s1_total.wav").exists());

    Ok(())
}
