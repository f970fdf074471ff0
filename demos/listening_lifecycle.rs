use anyhow::Result;
use futures::StreamExt;
use speech_control::testing::{
    scripted_platform, CountingNotifier, ScriptStep, ScriptedRecognition,
};
use speech_control::{ListenConfig, RecognitionError, SpeechControl, SpeechControlError};
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    info!("🎙️  Listening lifecycle demo: restarts, silence retry, and opt-out");

    // 1. Script three physical sessions: one ends on its own, one hears
    //    nothing, one keeps listening
    let recognition = ScriptedRecognition::with_scripts(vec![
        vec![ScriptStep::say("first utterance"), ScriptStep::End],
        vec![ScriptStep::Fail(RecognitionError::NoSpeech)],
        vec![
            ScriptStep::say("second utterance"),
            ScriptStep::wait_ms(60_000),
        ],
    ]);
    let notifier = CountingNotifier::new();

    let config = ListenConfig {
        debounce_ms: 100,
        restart_delay_ms: 250,
        ..ListenConfig::default()
    };
    let control = SpeechControl::new(
        scripted_platform(recognition.clone(), notifier.clone()),
        config,
    );

    // 2. Start listening and consume events across the restarts
    let mut events = control.start();
    for _ in 0..2 {
        match events.next().await {
            Some(Ok(event)) => info!("📝 Event: {}", serde_json::to_string(&event)?),
            Some(Err(err)) => info!("⚠️  Error: {err}"),
            None => break,
        }
    }
    info!(
        "✅ {} physical sessions ran behind one stream; notification shown {} time(s)",
        recognition.sessions_started(),
        notifier.appends()
    );

    // 3. The user dismisses the listening notification
    info!("👆 Dismissing the notification...");
    notifier.dismiss();
    match events.next().await {
        Some(Err(SpeechControlError::Disabled)) => {
            info!("🛑 Stream failed with Disabled, as expected")
        }
        other => info!("Unexpected stream item: {other:?}"),
    }

    // 4. Speech control is now off for good
    info!("✅ is_enabled() = {}", control.is_enabled());
    if let Some(Err(SpeechControlError::Disabled)) = control.start().next().await {
        info!("🛑 New sessions refuse to start");
    }

    sleep(Duration::from_millis(100)).await;
    Ok(())
}
