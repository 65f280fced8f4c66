//! Memory-augmented context assembly

use super::client::{MemoryStore, SearchOptions};
use super::extractor::MemoryExtractor;
use super::models::{MemoryCategory, MemoryFact};
use super::service_config::MemoryServiceConfig;
use crate::chat::Turn;
use crate::context::formatter::{format_window, ApiMessage};
use crate::context::window::{ContextWindowManager, WindowOptions};
use crate::metrics::METRICS;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Label prefixed to the injected memory system message
const MEMORY_CONTEXT_PREFIX: &str = "Relevant memories and context";

/// Facts fetched per user when computing statistics or cleaning up
const USER_FACT_FETCH_LIMIT: usize = 100;

/// Options for memory-augmented assembly
#[derive(Debug, Clone)]
pub struct EnhancedContextOptions {
    /// Identity the memory store scopes facts to
    pub user_id: String,
    /// Conversation identity; facts from the same conversation rank first
    pub chat_id: Option<String>,
    /// Window fitting options
    pub window: WindowOptions,
    /// Blend retrieved facts into the context when the budget allows
    pub include_memories: bool,
    /// Cap on facts considered for one request
    pub max_memories: usize,
}

impl EnhancedContextOptions {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            chat_id: None,
            window: WindowOptions::default(),
            include_memories: true,
            max_memories: 10,
        }
    }

    pub fn with_chat(mut self, chat_id: impl Into<String>) -> Self {
        self.chat_id = Some(chat_id.into());
        self
    }

    pub fn with_window(mut self, window: WindowOptions) -> Self {
        self.window = window;
        self
    }
}

/// Context window extended with memory facts
#[derive(Debug, Clone)]
pub struct EnhancedContextWindow {
    pub messages: Vec<Turn>,
    pub memories: Vec<MemoryFact>,
    pub total_tokens: usize,
    pub memory_tokens: usize,
    pub memory_context: Option<String>,
}

/// Per-user memory statistics
#[derive(Debug, Clone)]
pub struct MemoryStats {
    pub total_memories: usize,
    pub memories_by_category: IndexMap<MemoryCategory, usize>,
    pub oldest_memory: Option<DateTime<Utc>>,
    pub newest_memory: Option<DateTime<Utc>>,
}

/// Orchestrates window fitting, memory retrieval, and wire formatting.
///
/// Collaborators are injected at construction so callers (and tests) can
/// substitute fakes; the assembler itself holds no request state.
pub struct ContextAssembler {
    window: ContextWindowManager,
    store: Arc<dyn MemoryStore>,
    extractor: MemoryExtractor,
    config: MemoryServiceConfig,
}

impl ContextAssembler {
    pub fn new(
        window: ContextWindowManager,
        store: Arc<dyn MemoryStore>,
        config: MemoryServiceConfig,
    ) -> Self {
        let extractor = MemoryExtractor::new(config.min_extraction_chars);
        Self {
            window,
            store,
            extractor,
            config,
        }
    }

    /// Options seeded from the configured window and memory settings
    pub fn default_options(&self, user_id: impl Into<String>) -> EnhancedContextOptions {
        EnhancedContextOptions {
            user_id: user_id.into(),
            chat_id: None,
            window: self.window.options().clone(),
            include_memories: self.config.enhance_context,
            max_memories: self.config.max_context_memories,
        }
    }

    pub fn window(&self) -> &ContextWindowManager {
        &self.window
    }

    pub fn store(&self) -> &Arc<dyn MemoryStore> {
        &self.store
    }

    /// Compute the enhanced window over the raw conversation.
    ///
    /// The base token count is the cost of the full conversation, not of a
    /// trimmed window; the memory budget decision always runs against the
    /// whole history and its latest message. Memory inclusion is
    /// all-or-nothing: a block that does not fit is discarded whole rather
    /// than shrunk fact by fact.
    pub async fn assemble(
        &self,
        turns: &[Turn],
        options: &EnhancedContextOptions,
    ) -> EnhancedContextWindow {
        let base_tokens = self.window.estimator().conversation_cost(turns);

        let mut window = EnhancedContextWindow {
            messages: turns.to_vec(),
            memories: Vec::new(),
            total_tokens: base_tokens,
            memory_tokens: 0,
            memory_context: None,
        };

        if !options.include_memories {
            METRICS
                .memory_context_skipped
                .with_label_values(&["disabled"])
                .inc();
            return window;
        }
        if !self.store.available() {
            METRICS
                .memory_context_skipped
                .with_label_values(&["unavailable"])
                .inc();
            debug!("Memory store unavailable, skipping augmentation");
            return window;
        }
        let Some(last) = turns.last() else {
            return window;
        };

        let mut memories = self
            .store
            .search(
                &last.content,
                &options.user_id,
                &SearchOptions {
                    limit: Some(options.max_memories),
                    min_relevance: Some(self.config.min_relevance_score),
                    ..SearchOptions::default()
                },
            )
            .await;

        // Facts from the current conversation rank first, then relevance.
        if let Some(chat_id) = &options.chat_id {
            memories.sort_by(|a, b| {
                let a_same = a.metadata.chat_id.as_deref() == Some(chat_id.as_str());
                let b_same = b.metadata.chat_id.as_deref() == Some(chat_id.as_str());
                b_same.cmp(&a_same).then_with(|| {
                    b.relevance_score
                        .partial_cmp(&a.relevance_score)
                        .unwrap_or(Ordering::Equal)
                })
            });
        }
        memories.truncate(options.max_memories);

        if memories.is_empty() {
            METRICS
                .memory_context_skipped
                .with_label_values(&["empty"])
                .inc();
            return window;
        }

        let memory_context = build_memory_context(&memories);
        let memory_tokens = self.window.estimator().text_cost(&memory_context);
        let available = options.window.available_tokens();

        if base_tokens + memory_tokens <= available {
            debug!(
                memory_tokens,
                facts = memories.len(),
                "Including memory context"
            );
            METRICS.memory_context_injected.inc();
            window.memories = memories;
            window.memory_context = Some(memory_context);
            window.memory_tokens = memory_tokens;
            window.total_tokens = base_tokens + memory_tokens;
        } else {
            debug!(
                base_tokens,
                memory_tokens, available, "Memory context over budget, discarded"
            );
            METRICS
                .memory_context_skipped
                .with_label_values(&["over_budget"])
                .inc();
        }

        window
    }

    /// Fit and format the conversation without memory augmentation
    pub fn prepare(&self, turns: &[Turn], system_prompt: Option<&str>) -> Vec<ApiMessage> {
        format_window(&self.window.fit(turns), system_prompt)
    }

    /// Fit, format, and (budget permitting) inject the memory context as a
    /// system message placed after any leading system messages.
    pub async fn prepare_with_memory(
        &self,
        turns: &[Turn],
        system_prompt: Option<&str>,
        options: &EnhancedContextOptions,
    ) -> Vec<ApiMessage> {
        let fitted = self.window.fit(turns);
        let mut messages = format_window(&fitted, system_prompt);

        let enhanced = self.assemble(turns, options).await;
        if let Some(context) = &enhanced.memory_context {
            let insert_at = messages.iter().take_while(|m| m.is_system()).count();
            messages.insert(
                insert_at,
                ApiMessage::system(format!("{}: {}", MEMORY_CONTEXT_PREFIX, context)),
            );
        }

        messages
    }

    /// Extract candidate facts from a persisted user turn and forward them
    /// to the store. Failures are logged and swallowed; the enclosing chat
    /// request must never fail here.
    pub async fn process_new_turn(
        &self,
        turn: &Turn,
        user_id: &str,
        chat_id: &str,
    ) -> Vec<MemoryFact> {
        if !self.config.extract_from_messages || !self.store.available() {
            return Vec::new();
        }

        let candidates = self.extractor.extract(turn, user_id, chat_id);
        let mut added = Vec::with_capacity(candidates.len());

        for mut fact in candidates {
            match self.store.add(&fact).await {
                Some(id) => {
                    fact.id = Some(id);
                    added.push(fact);
                }
                None => warn!("Extracted memory was rejected by the store"),
            }
        }

        added
    }

    /// Fire-and-forget variant of [`Self::process_new_turn`]: extraction
    /// runs on a background task, so an aborted request still persists its
    /// side effects.
    pub fn process_new_turn_detached(
        self: &Arc<Self>,
        turn: Turn,
        user_id: String,
        chat_id: String,
    ) {
        let assembler = Arc::clone(self);
        tokio::spawn(async move {
            let added = assembler
                .process_new_turn(&turn, &user_id, &chat_id)
                .await;
            if !added.is_empty() {
                debug!(count = added.len(), "Background extraction forwarded");
            }
        });
    }

    /// Per-user memory statistics
    pub async fn memory_stats(&self, user_id: &str) -> MemoryStats {
        if !self.store.available() {
            return MemoryStats {
                total_memories: 0,
                memories_by_category: IndexMap::new(),
                oldest_memory: None,
                newest_memory: None,
            };
        }

        let facts = self.store.get_all(user_id, USER_FACT_FETCH_LIMIT).await;

        let mut by_category: IndexMap<MemoryCategory, usize> = IndexMap::new();
        for fact in &facts {
            *by_category.entry(fact.metadata.category).or_insert(0) += 1;
        }

        let mut timestamps: Vec<_> = facts.iter().map(|f| f.metadata.timestamp).collect();
        timestamps.sort();

        MemoryStats {
            total_memories: facts.len(),
            memories_by_category: by_category,
            oldest_memory: timestamps.first().copied(),
            newest_memory: timestamps.last().copied(),
        }
    }

    /// Delete expired facts for a user; returns how many were removed
    pub async fn cleanup_expired(&self, user_id: &str) -> usize {
        if !self.store.available() {
            return 0;
        }

        let now = Utc::now();
        let mut deleted = 0;

        for fact in self.store.get_all(user_id, USER_FACT_FETCH_LIMIT).await {
            if !fact.metadata.is_expired(now) {
                continue;
            }
            if let Some(id) = &fact.id {
                if self.store.delete(id).await {
                    deleted += 1;
                }
            }
        }

        if deleted > 0 {
            info!(deleted, "Cleaned up expired memories");
        }
        deleted
    }
}

/// Group facts by category label and join their contents.
///
/// Categories appear in first-seen order; within a category facts are
/// ordered by relevance, highest first, and joined with "; ".
fn build_memory_context(memories: &[MemoryFact]) -> String {
    let mut groups: IndexMap<MemoryCategory, Vec<&MemoryFact>> = IndexMap::new();
    for fact in memories {
        groups.entry(fact.metadata.category).or_default().push(fact);
    }

    let mut blocks = Vec::with_capacity(groups.len());
    for (category, mut facts) in groups {
        facts.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(Ordering::Equal)
        });
        let contents: Vec<&str> = facts.iter().map(|f| f.content.as_str()).collect();
        blocks.push(format!("{}: {}", category.label(), contents.join("; ")));
    }

    blocks.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::models::MemoryMetadata;

    fn fact(content: &str, category: MemoryCategory, relevance: f32) -> MemoryFact {
        let mut fact = MemoryFact::new(content, "user-1", MemoryMetadata::new(category));
        fact.relevance_score = relevance;
        fact
    }

    #[test]
    fn test_memory_context_groups_by_category() {
        let memories = vec![
            fact("likes espresso", MemoryCategory::UserPreference, 0.9),
            fact("lives in Lisbon", MemoryCategory::PersonalInfo, 0.8),
            fact("prefers dark mode", MemoryCategory::UserPreference, 0.95),
        ];

        let context = build_memory_context(&memories);
        let lines: Vec<&str> = context.lines().collect();

        assert_eq!(lines.len(), 2);
        // First-seen category leads; within it, higher relevance first.
        assert_eq!(
            lines[0],
            "User Preferences: prefers dark mode; likes espresso"
        );
        assert_eq!(lines[1], "Personal Information: lives in Lisbon");
    }

    #[test]
    fn test_memory_context_empty_input() {
        assert_eq!(build_memory_context(&[]), "");
    }
}
