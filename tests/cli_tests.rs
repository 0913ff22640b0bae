// Integration tests for the console command surface: speak requests, the
// voice interruption toggle, and console-triggered uplink passes.

mod common;

use std::sync::Arc;

use anyhow::Result;
use common::RecordingGateway;
use tempfile::TempDir;
use voicelink::cli::{Command, CommandRunner};
use voicelink::{ActionKind, EngineGateway, SessionContext, UplinkJob};

fn runner_with(
    gateway: &Arc<RecordingGateway>,
    uplink_job: Option<UplinkJob>,
) -> (Arc<SessionContext>, CommandRunner) {
    let ctx = Arc::new(SessionContext::new(
        "s1",
        Arc::clone(gateway) as Arc<dyn EngineGateway>,
    ));
    let runner = CommandRunner::new(Arc::clone(&ctx), uplink_job);
    (ctx, runner)
}

#[tokio::test]
async fn speak_command_requests_a_response() -> Result<()> {
    let gateway = Arc::new(RecordingGateway::new());
    let (_ctx, mut runner) = runner_with(&gateway, None);

    assert!(runner.execute(Command::Speak("hello".to_string())).await);

    assert_eq!(gateway.responses(), vec!["hello".to_string()]);
    Ok(())
}

#[tokio::test]
async fn interruption_toggle_alternates_enable_and_disable() -> Result<()> {
    let gateway = Arc::new(RecordingGateway::new());
    let (_ctx, mut runner) = runner_with(&gateway, None);

    assert!(!runner.voice_interrupt_enabled());
    runner.execute(Command::ToggleVoiceInterrupt).await;
    assert!(runner.voice_interrupt_enabled());
    runner.execute(Command::ToggleVoiceInterrupt).await;
    assert!(!runner.voice_interrupt_enabled());

    assert_eq!(
        gateway.actions(),
        vec![
            ActionKind::EnableVoiceInterruption,
            ActionKind::DisableVoiceInterruption,
        ]
    );
    Ok(())
}

#[tokio::test]
async fn rejected_toggle_leaves_state_unchanged() -> Result<()> {
    let gateway = Arc::new(RecordingGateway::new());
    gateway.reject_action(ActionKind::EnableVoiceInterruption);
    let (_ctx, mut runner) = runner_with(&gateway, None);

    runner.execute(Command::ToggleVoiceInterrupt).await;

    assert!(!runner.voice_interrupt_enabled());
    assert!(gateway.actions().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn send_audio_command_streams_the_source() -> Result<()> {
    let dir = TempDir::new()?;
    let source = dir.path().join("audio_16k.pcm");
    std::fs::write(&source, vec![0u8; 6400])?;

    let gateway = Arc::new(RecordingGateway::new());
    let (ctx, mut runner) = runner_with(&gateway, Some(UplinkJob::pcm_16k(source)));
    ctx.set_gate(true);

    assert!(runner.execute(Command::SendAudio).await);
    runner.join_uplinks().await;

    assert_eq!(gateway.total_audio_bytes(), 6400);
    let actions = gateway.actions();
    assert_eq!(actions.first(), Some(&ActionKind::StartHumanSpeech));
    assert_eq!(actions.last(), Some(&ActionKind::StopHumanSpeech));
    Ok(())
}

#[tokio::test]
async fn send_audio_without_a_source_is_a_no_op() -> Result<()> {
    let gateway = Arc::new(RecordingGateway::new());
    let (_ctx, mut runner) = runner_with(&gateway, None);

    assert!(runner.execute(Command::SendAudio).await);
    runner.join_uplinks().await;

    assert!(gateway.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn quit_ends_the_loop() -> Result<()> {
    let gateway = Arc::new(RecordingGateway::new());
    let (_ctx, mut runner) = runner_with(&gateway, None);

    assert!(!runner.execute(Command::Quit).await);
    Ok(())
}
