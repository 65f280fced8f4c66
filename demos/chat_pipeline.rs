//! End-to-end walkthrough of the context assembly pipeline.
//!
//! Builds a synthetic conversation that overflows a small token budget,
//! fits it, augments it with facts from a canned memory store, and prints
//! the wire-ready payload.

use async_trait::async_trait;
use chat_context::memory::MemoryMetadata;
use chat_context::{
    Attachment, ContextAssembler, ContextWindowManager, EnhancedContextOptions, MemoryCategory,
    MemoryFact, MemoryServiceConfig, MemoryStore, SearchOptions, Turn, WindowOptions,
};
use std::sync::Arc;

/// Canned store standing in for the external memory service
struct CannedMemoryStore {
    facts: Vec<MemoryFact>,
}

#[async_trait]
impl MemoryStore for CannedMemoryStore {
    fn available(&self) -> bool {
        true
    }

    async fn search(
        &self,
        _query: &str,
        _user_id: &str,
        options: &SearchOptions,
    ) -> Vec<MemoryFact> {
        let mut facts = self.facts.clone();
        if let Some(limit) = options.limit {
            facts.truncate(limit);
        }
        facts
    }

    async fn add(&self, _fact: &MemoryFact) -> Option<String> {
        Some("demo-id".to_string())
    }

    async fn get_all(&self, _user_id: &str, _limit: usize) -> Vec<MemoryFact> {
        self.facts.clone()
    }

    async fn delete(&self, _memory_id: &str) -> bool {
        false
    }
}

fn fact(content: &str, category: MemoryCategory, relevance: f32) -> MemoryFact {
    let mut fact = MemoryFact::new(content, "demo-user", MemoryMetadata::new(category));
    fact.relevance_score = relevance;
    fact
}

#[tokio::main]
async fn main() {
    chat_context::logging::init("info");

    let window_options = WindowOptions {
        max_tokens: 600,
        reserve_tokens_for_response: 150,
        ..WindowOptions::default()
    };

    let store = Arc::new(CannedMemoryStore {
        facts: vec![
            fact("prefers concise answers", MemoryCategory::UserPreference, 0.95),
            fact("works as a backend engineer", MemoryCategory::PersonalInfo, 0.9),
        ],
    });

    let assembler = ContextAssembler::new(
        ContextWindowManager::new(window_options.clone()),
        store,
        MemoryServiceConfig::default(),
    );

    // A conversation long enough to overflow the 450-token window.
    let mut turns: Vec<Turn> = (0..12)
        .flat_map(|i| {
            [
                Turn::user(format!(
                    "Question {}: how should I structure module {} of my service?",
                    i, i
                )),
                Turn::assistant(format!(
                    "Answer {}: keep module {} small, give it one responsibility, \
                     and wire it through an explicit interface.",
                    i, i
                )),
            ]
        })
        .collect();
    turns.push(
        Turn::user("Here is my current architecture diagram, what would you change?")
            .with_attachment(Attachment::image(
                "architecture.png",
                "https://files.example/architecture.png",
            )),
    );

    let stats = assembler.window().stats(&turns);
    println!(
        "conversation: {} turns, ~{} tokens, attachments: {}",
        stats.message_count, stats.total_tokens, stats.has_attachments
    );

    let window = assembler.window().fit(&turns);
    println!(
        "fitted window: {} turns kept, ~{} tokens, summarized: {}",
        window.messages.len(),
        window.total_tokens,
        window.summary.is_some()
    );

    // Extraction runs on the latest user turn after it is persisted.
    let persisted = Turn::user("Please remember this: I always deploy on Fridays");
    let extracted = assembler
        .process_new_turn(&persisted, "demo-user", "demo-chat")
        .await;
    println!("extracted {} candidate fact(s) from the new turn", extracted.len());

    let options = EnhancedContextOptions::new("demo-user")
        .with_chat("demo-chat")
        .with_window(window_options);

    // Over-budget conversation: truncated, and the memory block is
    // discarded because memory accounting runs against the full history.
    let payload = assembler
        .prepare_with_memory(&turns, Some("You are a pragmatic architect."), &options)
        .await;
    println!("\nlong conversation payload ({} messages):", payload.len());
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).expect("serializable payload")
    );

    // A conversation within budget gets the memory system message.
    let short_turns = vec![Turn::user("What deployment cadence would you recommend for me?")];
    let payload = assembler
        .prepare_with_memory(&short_turns, Some("You are a pragmatic architect."), &options)
        .await;
    println!("\nshort conversation payload ({} messages):", payload.len());
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).expect("serializable payload")
    );
}
