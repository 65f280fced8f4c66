//! Context window management: estimation, fitting, summarization, and
//! wire formatting

pub mod formatter;
pub mod summarizer;
pub mod token_estimator;
pub mod window;

pub use formatter::{format_window, ApiMessage, ContentPart, MessageContent};
pub use summarizer::{PlaceholderSummarizer, Summarizer};
pub use token_estimator::{HeuristicEstimator, TiktokenEstimator, TokenEstimator, TurnEstimator};
pub use window::{ContextStats, ContextWindow, ContextWindowManager, WindowOptions};
