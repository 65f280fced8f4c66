//! Conversation context assembly for chat backends.
//!
//! Turns an unbounded conversation history into a bounded, ordered,
//! API-ready message list: token estimation, window fitting with
//! summarization of dropped turns, multimodal wire formatting, and
//! best-effort augmentation with facts retrieved from an external
//! long-term memory service.
//!
//! The pipeline is purely functional over its inputs; the only I/O
//! happens behind the [`memory::MemoryStore`] capability, and every
//! failure there degrades to "no memory block" instead of surfacing.

pub mod chat;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod memory;
pub mod metrics;

pub use chat::{Attachment, AttachmentKind, Role, Turn};
pub use config::Config;
pub use context::{
    format_window, ApiMessage, ContentPart, ContextStats, ContextWindow, ContextWindowManager,
    MessageContent, WindowOptions,
};
pub use error::{ContextError, Result};
pub use memory::{
    ContextAssembler, EnhancedContextOptions, EnhancedContextWindow, HttpMemoryClient,
    MemoryCategory, MemoryFact, MemoryServiceConfig, MemoryStore, NullMemoryStore, SearchOptions,
};
