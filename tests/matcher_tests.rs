// Tests for transcript normalization and term matching.

use speech_control::{
    matches, normalize, RecognitionAlternative, RecognitionEvent, RecognitionResult,
};

#[test]
fn test_detects_term_within_phrase() {
    let event = RecognitionEvent::from_transcript("Please STOP  now");

    assert!(matches(&event, "stop"));
    assert!(matches(&event, "please, stop"));
}

#[test]
fn test_no_match_on_other_command() {
    let event = RecognitionEvent::from_transcript("turn the volume up");

    assert!(!matches(&event, "stop"));
    assert!(!matches(&event, "go"));
}

#[test]
fn test_newest_result_decides() {
    // Results accumulate across a session; only the newest utterance counts.
    let event = RecognitionEvent {
        results: vec![
            RecognitionResult {
                alternatives: vec![RecognitionAlternative {
                    transcript: "stop everything".to_string(),
                    confidence: 0.95,
                }],
            },
            RecognitionResult {
                alternatives: vec![RecognitionAlternative {
                    transcript: "go on".to_string(),
                    confidence: 0.9,
                }],
            },
        ],
    };

    assert!(matches(&event, "go"));
    assert!(!matches(&event, "stop"));
}

#[test]
fn test_normalization_shape() {
    assert_eq!(normalize("Hey   There"), "hey, there");
    assert_eq!(normalize(" one two  three "), "one, two, three");
    assert_eq!(normalize(""), "");
}

#[test]
fn test_event_without_results_never_matches() {
    let event = RecognitionEvent { results: vec![] };

    assert!(!matches(&event, "stop"));
}
