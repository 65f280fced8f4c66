//! Long-term memory: retrieval adapter, fact extraction, and
//! memory-augmented context assembly

pub mod client;
pub mod enhanced;
pub mod extractor;
pub mod models;
pub mod service_config;

pub use client::{HttpMemoryClient, MemoryStore, NullMemoryStore, SearchOptions};
pub use enhanced::{
    ContextAssembler, EnhancedContextOptions, EnhancedContextWindow, MemoryStats,
};
pub use extractor::MemoryExtractor;
pub use models::{scoped_user_id, MemoryCategory, MemoryFact, MemoryMetadata};
pub use service_config::MemoryServiceConfig;
