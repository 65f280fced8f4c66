//! Pattern-based extraction of candidate memory facts

use super::models::{MemoryCategory, MemoryFact, MemoryMetadata};
use crate::chat::{Role, Turn};
use crate::metrics::METRICS;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Source label recorded on extracted facts
const EXTRACTION_SOURCE: &str = "pattern_extraction";

/// One category matcher: the trigger patterns plus the confidence assigned
/// to facts it produces
struct CategoryMatcher {
    category: MemoryCategory,
    confidence: f32,
    patterns: Vec<Regex>,
}

/// Ordered matcher table; earlier entries win when a message matches
/// several categories.
static MATCHERS: Lazy<Vec<CategoryMatcher>> = Lazy::new(|| {
    vec![
        CategoryMatcher {
            category: MemoryCategory::UserPreference,
            confidence: 0.8,
            patterns: compile(&[
                r"(?i)I (like|love|prefer|enjoy|hate|dislike|really like)",
                r"(?i)My favorite .* is",
                r"(?i)I usually",
                r"(?i)I always",
                r"(?i)I never",
                r"(?i)remember this",
                r"(?i)please remember",
            ]),
        },
        CategoryMatcher {
            category: MemoryCategory::PersonalInfo,
            confidence: 0.9,
            patterns: compile(&[
                r"(?i)My name is",
                r"(?i)I am .* years old",
                r"(?i)I work (as|at)",
                r"(?i)I am a .* (engineer|developer|designer|manager|student|teacher)",
                r"(?i)I am an? (engineer|developer|designer|manager|student|teacher)",
                r"(?i)I live in",
                r"(?i)I study",
            ]),
        },
        CategoryMatcher {
            category: MemoryCategory::FactualKnowledge,
            confidence: 0.7,
            patterns: compile(&[
                r"(?i)Did you know",
                r"(?i)The fact is",
                r"(?i)According to",
                r"(?i)Research shows",
                r"(?i)Studies indicate",
            ]),
        },
        CategoryMatcher {
            category: MemoryCategory::BehavioralPattern,
            confidence: 0.75,
            patterns: compile(&[
                r"(?i)I tend to",
                r"(?i)I often",
                r"(?i)I typically",
                r"(?i)My habit is",
                r"(?i)I have a tendency",
            ]),
        },
    ]
});

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid matcher pattern"))
        .collect()
}

/// Extracts candidate memory facts from freshly-arrived user turns
pub struct MemoryExtractor {
    min_content_chars: usize,
}

impl MemoryExtractor {
    pub fn new(min_content_chars: usize) -> Self {
        Self { min_content_chars }
    }

    /// Scan a turn for a memorable statement.
    ///
    /// Only `user` turns of at least the configured length are scanned.
    /// The first matching category in priority order wins; at most one
    /// candidate fact is produced per turn.
    pub fn extract(&self, turn: &Turn, user_id: &str, chat_id: &str) -> Vec<MemoryFact> {
        if turn.role != Role::User {
            return Vec::new();
        }
        if turn.content.chars().count() < self.min_content_chars {
            return Vec::new();
        }

        for matcher in MATCHERS.iter() {
            if matcher.patterns.iter().any(|p| p.is_match(&turn.content)) {
                debug!(
                    category = matcher.category.as_str(),
                    "Extracted candidate memory"
                );
                METRICS.memory_facts_extracted.inc();

                let metadata = MemoryMetadata::new(matcher.category)
                    .with_chat(chat_id)
                    .with_confidence(matcher.confidence)
                    .with_source(EXTRACTION_SOURCE)
                    .with_timestamp(turn.timestamp);

                return vec![MemoryFact::new(turn.content.clone(), user_id, metadata)];
            }
        }

        Vec::new()
    }
}

impl Default for MemoryExtractor {
    fn default() -> Self {
        Self::new(20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(content: &str) -> Vec<MemoryFact> {
        MemoryExtractor::default().extract(&Turn::user(content), "user-1", "chat-1")
    }

    #[test]
    fn test_preference_statement() {
        let facts = extract("I prefer working in the morning");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].metadata.category, MemoryCategory::UserPreference);
        assert_eq!(facts[0].content, "I prefer working in the morning");
        assert_eq!(facts[0].metadata.source, "pattern_extraction");
    }

    #[test]
    fn test_personal_info_statement() {
        let facts = extract("My name is John and I work as a developer");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].metadata.category, MemoryCategory::PersonalInfo);
    }

    #[test]
    fn test_first_match_priority() {
        // Matches both preference ("I always") and behavioral ("I tend to");
        // preference is earlier in the table and must win.
        let facts = extract("I always drink coffee because I tend to wake up early");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].metadata.category, MemoryCategory::UserPreference);
    }

    #[test]
    fn test_factual_and_behavioral_categories() {
        let facts = extract("According to the docs this flag is deprecated");
        assert_eq!(facts[0].metadata.category, MemoryCategory::FactualKnowledge);

        let facts = extract("I tend to forget to close my editor tabs");
        assert_eq!(
            facts[0].metadata.category,
            MemoryCategory::BehavioralPattern
        );
    }

    #[test]
    fn test_short_messages_are_not_scanned() {
        assert!(extract("I like cats").is_empty());
    }

    #[test]
    fn test_non_user_turns_are_not_scanned() {
        let extractor = MemoryExtractor::default();
        let turn = Turn::assistant("I prefer working in the morning");
        assert!(extractor.extract(&turn, "user-1", "chat-1").is_empty());
    }

    #[test]
    fn test_unremarkable_message_yields_nothing() {
        assert!(extract("What is the weather like today in Berlin?").is_empty());
    }

    #[test]
    fn test_case_insensitive_matching() {
        let facts = extract("MY NAME IS ALICE, PLEASED TO MEET YOU");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].metadata.category, MemoryCategory::PersonalInfo);
    }
}
