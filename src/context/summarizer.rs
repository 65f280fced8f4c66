//! Summary placeholders for truncated history

use crate::chat::Turn;

/// Summarizer trait for turning dropped turns into a compact stand-in.
///
/// Implementations must be deterministic and infallible: window fitting is
/// purely computational and a summarization failure has nowhere to go.
pub trait Summarizer: Send + Sync {
    /// Summarize dropped turns. Output is capped at roughly `max_tokens`
    /// tokens (four characters per token).
    fn summarize(&self, dropped: &[Turn], max_tokens: usize) -> String;
}

/// Deterministic placeholder summarizer.
///
/// Names how many turns were dropped rather than inspecting their content.
pub struct PlaceholderSummarizer;

impl Summarizer for PlaceholderSummarizer {
    fn summarize(&self, dropped: &[Turn], max_tokens: usize) -> String {
        if dropped.is_empty() {
            return String::new();
        }

        let summary = format!(
            "Previous conversation summary ({} messages): The conversation covered \
             various topics including user questions and assistant responses. Key \
             context has been preserved for continuity.",
            dropped.len()
        );

        truncate_chars(&summary, max_tokens * 4)
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}
