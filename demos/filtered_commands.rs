use anyhow::Result;
use futures::StreamExt;
use speech_control::testing::{
    scripted_platform, CountingNotifier, ScriptStep, ScriptedRecognition,
};
use speech_control::{latest_transcript, ListenConfig, SpeechControl};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    info!("🎙️  Voice command demo with a scripted recognition backend");

    // 1. Script a recognition session: three utterances, then silence
    let recognition = ScriptedRecognition::with_scripts(vec![vec![
        ScriptStep::say("please stop the music"),
        ScriptStep::wait_ms(400),
        ScriptStep::say("go to the next track"),
        ScriptStep::wait_ms(400),
        ScriptStep::say("unrelated chatter"),
        ScriptStep::wait_ms(60_000),
    ]]);
    let notifier = CountingNotifier::new();

    // 2. Build the controller
    let config = ListenConfig {
        debounce_ms: 100,
        ..ListenConfig::default()
    };
    let control = SpeechControl::new(scripted_platform(recognition.clone(), notifier), config);

    // 3. Subscribe to two command terms; both share one listening session
    let mut stop_commands = control.on("stop");
    let mut go_commands = control.on("go");

    // 4. Wait for one match per term
    if let Some(Ok(event)) = timeout(Duration::from_secs(5), stop_commands.next()).await? {
        info!(
            "🛑 'stop' heard in: {:?}",
            latest_transcript(&event).unwrap_or_default()
        );
    }
    if let Some(Ok(event)) = timeout(Duration::from_secs(5), go_commands.next()).await? {
        info!(
            "➡️  'go' heard in: {:?}",
            latest_transcript(&event).unwrap_or_default()
        );
    }
    info!(
        "✅ One physical session served both subscribers (sessions started: {})",
        recognition.sessions_started()
    );

    // 5. Dropping the last subscriber stops the shared session
    drop(stop_commands);
    drop(go_commands);
    sleep(Duration::from_millis(200)).await;
    info!(
        "✅ Session stopped after the last unsubscribe (sessions stopped: {})",
        recognition.sessions_stopped()
    );

    Ok(())
}
