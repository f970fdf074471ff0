//! Transcript normalization and term matching.
//!
//! Only the newest utterance in an event is considered: recognition results
//! accumulate, so earlier entries were already seen in earlier events.

use super::backend::RecognitionEvent;

/// Normalizes a transcript for matching: trims, lowercases, and collapses
/// every whitespace run into a comma separator.
///
/// "Please STOP  now" becomes "please, stop, now".
pub fn normalize(transcript: &str) -> String {
    transcript
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(", ")
}

/// The transcript of the newest utterance: the last alternative of the last
/// result. `None` when the event carries no results or no alternatives.
pub fn latest_transcript(event: &RecognitionEvent) -> Option<&str> {
    event
        .results
        .last()?
        .alternatives
        .last()
        .map(|alt| alt.transcript.as_str())
}

/// Whether the newest utterance contains `term`. The transcript is normalized
/// before the substring check; the term is used as given.
pub fn matches(event: &RecognitionEvent, term: &str) -> bool {
    match latest_transcript(event) {
        Some(transcript) => normalize(transcript).contains(term),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::backend::{RecognitionAlternative, RecognitionResult};

    #[test]
    fn test_normalize_lowercases_and_separates() {
        assert_eq!(normalize("Please STOP now"), "please, stop, now");
    }

    #[test]
    fn test_normalize_collapses_whitespace_runs() {
        assert_eq!(normalize("  go \t left\n right "), "go, left, right");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_normalize_single_word() {
        assert_eq!(normalize("Stop"), "stop");
    }

    #[test]
    fn test_latest_transcript_picks_last_result_and_alternative() {
        let event = RecognitionEvent {
            results: vec![
                RecognitionResult {
                    alternatives: vec![RecognitionAlternative {
                        transcript: "old utterance".to_string(),
                        confidence: 0.9,
                    }],
                },
                RecognitionResult {
                    alternatives: vec![
                        RecognitionAlternative {
                            transcript: "first guess".to_string(),
                            confidence: 0.8,
                        },
                        RecognitionAlternative {
                            transcript: "second guess".to_string(),
                            confidence: 0.4,
                        },
                    ],
                },
            ],
        };
        assert_eq!(latest_transcript(&event), Some("second guess"));
    }

    #[test]
    fn test_latest_transcript_empty_event() {
        let event = RecognitionEvent { results: vec![] };
        assert_eq!(latest_transcript(&event), None);

        let event = RecognitionEvent {
            results: vec![RecognitionResult {
                alternatives: vec![],
            }],
        };
        assert_eq!(latest_transcript(&event), None);
    }

    #[test]
    fn test_matches_is_substring_on_normalized_text() {
        let event = RecognitionEvent::from_transcript("Please STOP now");
        assert!(matches(&event, "stop"));
        assert!(matches(&event, "please, stop"));
        assert!(!matches(&event, "start"));
    }

    #[test]
    fn test_matches_term_taken_verbatim() {
        let event = RecognitionEvent::from_transcript("stop");
        // The transcript is normalized, the term is not.
        assert!(!matches(&event, "STOP"));
    }

    #[test]
    fn test_matches_empty_event_never_matches() {
        let event = RecognitionEvent { results: vec![] };
        assert!(!matches(&event, "stop"));
        // Every normalized transcript contains the empty term.
        assert!(matches(&RecognitionEvent::from_transcript("x"), ""));
    }
}
