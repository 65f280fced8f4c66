//! Data models for long-term memory facts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Closed set of memory categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryCategory {
    UserPreference,
    ConversationContext,
    FactualKnowledge,
    BehavioralPattern,
    TopicExpertise,
    PersonalInfo,
}

impl MemoryCategory {
    /// Human-readable label used in memory context blocks
    pub fn label(&self) -> &'static str {
        match self {
            Self::UserPreference => "User Preferences",
            Self::ConversationContext => "Previous Context",
            Self::FactualKnowledge => "Known Facts",
            Self::BehavioralPattern => "Behavioral Patterns",
            Self::TopicExpertise => "Topic Expertise",
            Self::PersonalInfo => "Personal Information",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserPreference => "user_preference",
            Self::ConversationContext => "conversation_context",
            Self::FactualKnowledge => "factual_knowledge",
            Self::BehavioralPattern => "behavioral_pattern",
            Self::TopicExpertise => "topic_expertise",
            Self::PersonalInfo => "personal_info",
        }
    }

    /// Parse a service-side category tag; unknown tags fall back to
    /// conversation context
    pub fn parse(tag: &str) -> Self {
        match tag {
            "user_preference" => Self::UserPreference,
            "factual_knowledge" => Self::FactualKnowledge,
            "behavioral_pattern" => Self::BehavioralPattern,
            "topic_expertise" => Self::TopicExpertise,
            "personal_info" => Self::PersonalInfo,
            _ => Self::ConversationContext,
        }
    }

    /// Default retention period in days
    pub fn retention_days(&self) -> u32 {
        match self {
            Self::UserPreference | Self::PersonalInfo => 365,
            Self::ConversationContext => 30,
            Self::FactualKnowledge | Self::TopicExpertise => 180,
            Self::BehavioralPattern => 90,
        }
    }
}

impl Default for MemoryCategory {
    fn default() -> Self {
        Self::ConversationContext
    }
}

/// Metadata attached to a memory fact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryMetadata {
    pub category: MemoryCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub confidence: f32,
    pub source: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl MemoryMetadata {
    pub fn new(category: MemoryCategory) -> Self {
        Self {
            category,
            chat_id: None,
            timestamp: Utc::now(),
            confidence: 0.8,
            source: "memory_service".to_string(),
            tags: Vec::new(),
            expires_at: None,
        }
    }

    pub fn with_chat(mut self, chat_id: impl Into<String>) -> Self {
        self.chat_id = Some(chat_id.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Whether the fact has outlived its expiry
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |at| at < now)
    }
}

/// One long-term memory record surfaced by the external store.
///
/// Facts are created and deleted entirely outside this crate; they are
/// only read transiently per request and never persisted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryFact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content: String,
    pub user_id: String,
    pub relevance_score: f32,
    pub metadata: MemoryMetadata,
}

impl MemoryFact {
    pub fn new(
        content: impl Into<String>,
        user_id: impl Into<String>,
        metadata: MemoryMetadata,
    ) -> Self {
        Self {
            id: None,
            content: content.into(),
            user_id: user_id.into(),
            relevance_score: 1.0,
            metadata,
        }
    }
}

/// Stable short alias for a provider user id.
///
/// The upstream service limits identifier length; hashing keeps the alias
/// stable without truncating at an arbitrary byte boundary.
pub fn scoped_user_id(user_id: &str) -> String {
    let digest = Sha256::digest(user_id.as_bytes());
    let hex = format!("{:x}", digest);
    format!("user_{}", &hex[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_category_tags_round_trip() {
        for category in [
            MemoryCategory::UserPreference,
            MemoryCategory::ConversationContext,
            MemoryCategory::FactualKnowledge,
            MemoryCategory::BehavioralPattern,
            MemoryCategory::TopicExpertise,
            MemoryCategory::PersonalInfo,
        ] {
            assert_eq!(MemoryCategory::parse(category.as_str()), category);
        }
    }

    #[test]
    fn test_unknown_tag_falls_back() {
        assert_eq!(
            MemoryCategory::parse("something_new"),
            MemoryCategory::ConversationContext
        );
    }

    #[test]
    fn test_category_serde_uses_snake_case() {
        let json = serde_json::to_string(&MemoryCategory::UserPreference).unwrap();
        assert_eq!(json, "\"user_preference\"");
    }

    #[test]
    fn test_confidence_clamping() {
        let metadata = MemoryMetadata::new(MemoryCategory::PersonalInfo).with_confidence(1.5);
        assert_eq!(metadata.confidence, 1.0);
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let expired = MemoryMetadata::new(MemoryCategory::ConversationContext);
        assert!(!expired.is_expired(now));

        let mut expired = expired;
        expired.expires_at = Some(now - Duration::days(1));
        assert!(expired.is_expired(now));
    }

    #[test]
    fn test_scoped_user_id_is_stable_and_short() {
        let a = scoped_user_id("clerk_user_2aBcDeFgHiJkLmNoP");
        let b = scoped_user_id("clerk_user_2aBcDeFgHiJkLmNoP");
        assert_eq!(a, b);
        assert!(a.starts_with("user_"));
        assert_eq!(a.len(), "user_".len() + 8);
        assert_ne!(a, scoped_user_id("someone_else"));
    }
}
