//! Segmented sending for long assistant output.
//!
//! Output is split into fixed-size character segments (no smart boundaries:
//! concatenating the segments gives back the original text exactly), each
//! pushed as its own message with a short pause in between so bursts stay
//! under LINE's rate limits.

use std::time::Duration;

use tracing::debug;

use crate::client::MessageGateway;
use crate::error::LineError;
use crate::types::TextMessage;

/// Split `text` into segments of at most `max_chars` characters.
///
/// Splits on `char` boundaries, so multi-byte characters are never broken.
/// A text of L chars yields ceil(L / max_chars) segments; empty text yields none.
pub fn split_segments(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut segments = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == max_chars {
            segments.push(text[start..idx].to_string());
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        segments.push(text[start..].to_string());
    }
    segments
}

/// Push `text` to `to` in segments, pausing `delay` between consecutive ones.
///
/// Stops at the first failed push. Returns the number of segments sent.
pub async fn push_segmented(
    gateway: &dyn MessageGateway,
    to: &str,
    text: &str,
    max_chars: usize,
    delay: Duration,
) -> Result<usize, LineError> {
    let segments = split_segments(text, max_chars);
    debug!(to, segments = segments.len(), chars = text.chars().count(), "pushing segmented output");

    for (i, segment) in segments.iter().enumerate() {
        gateway.push(to, &[TextMessage::new(segment.as_str())]).await?;
        if i + 1 < segments.len() {
            tokio::time::sleep(delay).await;
        }
    }
    Ok(segments.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        pushed: Mutex<Vec<String>>,
        fail_after: Option<usize>,
    }

    #[async_trait]
    impl MessageGateway for Recorder {
        async fn reply(&self, _token: &str, _messages: &[TextMessage]) -> Result<(), LineError> {
            Ok(())
        }

        async fn push(&self, _to: &str, messages: &[TextMessage]) -> Result<(), LineError> {
            let mut pushed = self.pushed.lock().unwrap();
            if self.fail_after == Some(pushed.len()) {
                return Err(LineError::Api {
                    status: 429,
                    body: "rate limited".to_string(),
                });
            }
            pushed.extend(messages.iter().map(|m| m.text.clone()));
            Ok(())
        }
    }

    #[test]
    fn short_text_is_single_segment() {
        assert_eq!(split_segments("hello", 2000), vec!["hello"]);
    }

    #[test]
    fn empty_text_has_no_segments() {
        assert!(split_segments("", 2000).is_empty());
    }

    #[test]
    fn exactly_max_is_single_segment() {
        let text = "a".repeat(2000);
        assert_eq!(split_segments(&text, 2000).len(), 1);
    }

    #[test]
    fn segment_count_is_ceiling_and_concat_is_identity() {
        for len in [1usize, 1999, 2000, 2001, 4000, 4001, 10_500] {
            let text: String = (0..len).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
            let segments = split_segments(&text, 2000);
            assert_eq!(segments.len(), len.div_ceil(2000), "len {len}");
            assert!(segments.iter().all(|s| s.chars().count() <= 2000));
            assert_eq!(segments.concat(), text);
        }
    }

    #[test]
    fn multibyte_text_counts_chars_not_bytes() {
        let text = "考".repeat(4500);
        let segments = split_segments(&text, 2000);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].chars().count(), 2000);
        assert_eq!(segments[2].chars().count(), 500);
        assert_eq!(segments.concat(), text);
    }

    #[tokio::test(start_paused = true)]
    async fn pushes_each_segment_in_order() {
        let recorder = Recorder::default();
        let text = format!("{}{}{}", "a".repeat(2000), "b".repeat(2000), "c".repeat(10));
        let started = tokio::time::Instant::now();

        let sent = push_segmented(&recorder, "U1", &text, 2000, Duration::from_millis(100))
            .await
            .unwrap();

        assert_eq!(sent, 3);
        let pushed = recorder.pushed.lock().unwrap().clone();
        assert_eq!(pushed.concat(), text);
        assert!(pushed[2].starts_with('c'));
        // Two pauses between three segments.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(200) && elapsed < Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_first_failure() {
        let recorder = Recorder {
            fail_after: Some(1),
            ..Recorder::default()
        };
        let text = "x".repeat(5000);
        let err = push_segmented(&recorder, "U1", &text, 2000, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, LineError::Api { status: 429, .. }));
        assert_eq!(recorder.pushed.lock().unwrap().len(), 1);
    }
}
