// Integration tests for term subscriptions.
//
// `on` shares one listening session among all subscribers and filters events
// by term. The first live subscriber starts the session; the last one to
// drop stops it.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use speech_control::testing::{
    scripted_platform, CountingNotifier, ProbeMediaAccess, ScriptStep, ScriptedRecognition,
    StaticPermissions,
};
use speech_control::{
    FlagStore, ListenConfig, MemoryFlagStore, Platform, RecognitionError, RecognitionEvent,
    SpeechControl, SpeechControlError, DISABLED_FLAG_KEY,
};
use tokio::time::timeout;

fn fast_config() -> ListenConfig {
    ListenConfig {
        debounce_ms: 20,
        restart_delay_ms: 30,
        notification_auto_hide_ms: 10_000,
        ..ListenConfig::default()
    }
}

async fn next_item(
    stream: &mut (impl Stream<Item = Result<RecognitionEvent, SpeechControlError>> + Unpin),
) -> Option<Result<RecognitionEvent, SpeechControlError>> {
    timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("timed out waiting for stream item")
}

fn transcript(item: Option<Result<RecognitionEvent, SpeechControlError>>) -> String {
    let event = item
        .expect("stream ended early")
        .expect("unexpected stream error");
    speech_control::latest_transcript(&event)
        .expect("event carries no transcript")
        .to_string()
}

#[tokio::test]
async fn test_subscribers_share_one_session_and_filter() {
    let recognition = ScriptedRecognition::with_scripts(vec![vec![
        ScriptStep::say("please stop now"),
        ScriptStep::wait_ms(60),
        ScriptStep::say("go left"),
        ScriptStep::wait_ms(60),
        ScriptStep::say("turn right"),
        ScriptStep::wait_ms(10_000),
    ]]);
    let notifier = CountingNotifier::new();
    let control = SpeechControl::new(
        scripted_platform(recognition.clone(), notifier),
        fast_config(),
    );

    let mut stop_stream = control.on("stop");
    let mut go_stream = control.on("go");

    assert_eq!(transcript(next_item(&mut stop_stream).await), "please stop now");
    assert_eq!(transcript(next_item(&mut go_stream).await), "go left");
    assert_eq!(
        recognition.sessions_started(),
        1,
        "subscribers share one session"
    );

    // "turn right" matches neither term.
    let extra = timeout(Duration::from_millis(150), stop_stream.next()).await;
    assert!(extra.is_err());
}

#[tokio::test]
async fn test_same_term_twice_gets_both_streams_served() {
    let recognition = ScriptedRecognition::with_scripts(vec![vec![
        ScriptStep::say("stop it"),
        ScriptStep::wait_ms(10_000),
    ]]);
    let notifier = CountingNotifier::new();
    let control = SpeechControl::new(
        scripted_platform(recognition.clone(), notifier),
        fast_config(),
    );

    let mut first = control.on("stop");
    let mut second = control.on("stop");

    assert_eq!(transcript(next_item(&mut first).await), "stop it");
    assert_eq!(transcript(next_item(&mut second).await), "stop it");
    assert_eq!(recognition.sessions_started(), 1);
}

#[tokio::test]
async fn test_matches_preserve_order() {
    let recognition = ScriptedRecognition::with_scripts(vec![vec![
        ScriptStep::say("stop one"),
        ScriptStep::wait_ms(60),
        ScriptStep::say("stop two"),
        ScriptStep::wait_ms(60),
        ScriptStep::say("stop three"),
        ScriptStep::wait_ms(10_000),
    ]]);
    let notifier = CountingNotifier::new();
    let control = SpeechControl::new(scripted_platform(recognition, notifier), fast_config());

    let mut stream = control.on("stop");
    assert_eq!(transcript(next_item(&mut stream).await), "stop one");
    assert_eq!(transcript(next_item(&mut stream).await), "stop two");
    assert_eq!(transcript(next_item(&mut stream).await), "stop three");
}

#[tokio::test]
async fn test_dropping_one_subscriber_keeps_session() {
    let recognition = ScriptedRecognition::with_scripts(vec![vec![
        ScriptStep::wait_ms(50),
        ScriptStep::say("stop now"),
        ScriptStep::wait_ms(10_000),
    ]]);
    let notifier = CountingNotifier::new();
    let control = SpeechControl::new(
        scripted_platform(recognition.clone(), notifier),
        fast_config(),
    );

    let mut stop_stream = control.on("stop");
    let go_stream = control.on("go");

    drop(go_stream);

    assert_eq!(transcript(next_item(&mut stop_stream).await), "stop now");
    assert_eq!(recognition.sessions_stopped(), 0);
}

#[tokio::test]
async fn test_last_detach_stops_session_and_next_is_fresh() {
    let recognition =
        ScriptedRecognition::with_scripts(vec![vec![ScriptStep::wait_ms(10_000)]]);
    let notifier = CountingNotifier::new();
    let control = SpeechControl::new(
        scripted_platform(recognition.clone(), notifier.clone()),
        fast_config(),
    );

    let stop_stream = control.on("stop");
    let go_stream = control.on("go");

    // Let the shared session spin up.
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(recognition.sessions_started(), 1);

    drop(stop_stream);
    drop(go_stream);
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(recognition.sessions_stopped(), 1);

    // The next subscription starts a fresh logical session with its own
    // notification.
    recognition.push_script(vec![
        ScriptStep::say("stop again"),
        ScriptStep::wait_ms(10_000),
    ]);
    let mut revived = control.on("stop");
    assert_eq!(transcript(next_item(&mut revived).await), "stop again");
    assert_eq!(recognition.sessions_started(), 2);
    assert_eq!(notifier.appends(), 2);
}

#[tokio::test]
async fn test_on_after_stop_starts_fresh_session() {
    let recognition = ScriptedRecognition::with_scripts(vec![
        vec![ScriptStep::wait_ms(10_000)],
        vec![
            ScriptStep::say("stop once more"),
            ScriptStep::wait_ms(10_000),
        ],
    ]);
    let notifier = CountingNotifier::new();
    let control = SpeechControl::new(
        scripted_platform(recognition.clone(), notifier),
        fast_config(),
    );

    let mut first = control.on("stop");
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(recognition.sessions_started(), 1);

    // No await between the stop and the new subscription: the wound-down
    // session is still in the shared slot when `on` runs.
    control.stop();
    let mut second = control.on("stop");

    assert_eq!(transcript(next_item(&mut second).await), "stop once more");
    assert_eq!(recognition.sessions_started(), 2);
    assert!(next_item(&mut first).await.is_none());
}

#[tokio::test]
async fn test_error_reaches_all_subscribers() {
    let recognition = ScriptedRecognition::with_scripts(vec![vec![ScriptStep::Fail(
        RecognitionError::Network,
    )]]);
    let notifier = CountingNotifier::new();
    let control = SpeechControl::new(scripted_platform(recognition, notifier), fast_config());

    let mut alpha = control.on("alpha");
    let mut beta = control.on("beta");

    for stream in [&mut alpha, &mut beta] {
        match next_item(stream).await {
            Some(Err(SpeechControlError::Recognition(RecognitionError::Network))) => {}
            other => panic!("expected network failure, got {other:?}"),
        }
        assert!(next_item(stream).await.is_none());
    }
}

#[tokio::test]
async fn test_subscription_sees_disabled_error() {
    let recognition = ScriptedRecognition::new();
    let notifier = CountingNotifier::new();
    let flags = Arc::new(MemoryFlagStore::new());
    flags.set(DISABLED_FLAG_KEY, "true");
    let platform = Platform::new(
        recognition.clone(),
        StaticPermissions::granted(),
        ProbeMediaAccess::granting(),
        notifier,
        flags,
    );
    let control = SpeechControl::new(platform, fast_config());

    let mut stream = control.on("stop");
    match next_item(&mut stream).await {
        Some(Err(SpeechControlError::Disabled)) => {}
        other => panic!("expected Disabled, got {other:?}"),
    }
    assert!(next_item(&mut stream).await.is_none());
    assert_eq!(recognition.sessions_started(), 0);
}
