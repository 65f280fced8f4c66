//! Context window fitting with truncation and summarization

use super::summarizer::{PlaceholderSummarizer, Summarizer};
use super::token_estimator::{TokenEstimator, TurnEstimator};
use crate::chat::Turn;
use crate::metrics::METRICS;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Options governing how a conversation is fitted to the model budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowOptions {
    /// Overall request budget
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Tokens held back for the model's reply
    #[serde(default = "default_reserve_tokens")]
    pub reserve_tokens_for_response: usize,

    /// Cap on the summary placeholder length
    #[serde(default = "default_summary_tokens")]
    pub summary_token_budget: usize,

    /// Opaque model label, passed through for diagnostics
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_max_tokens() -> usize {
    4000
}
fn default_reserve_tokens() -> usize {
    1000
}
fn default_summary_tokens() -> usize {
    500
}
fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            reserve_tokens_for_response: default_reserve_tokens(),
            summary_token_budget: default_summary_tokens(),
            model: default_model(),
        }
    }
}

impl WindowOptions {
    /// Tokens available for the conversation itself
    pub fn available_tokens(&self) -> usize {
        self.max_tokens
            .saturating_sub(self.reserve_tokens_for_response)
    }
}

/// The result of fitting turns to a budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextWindow {
    /// Ordered suffix of the input turns
    pub messages: Vec<Turn>,
    /// Estimated cost of `messages` plus the summary, if any
    pub total_tokens: usize,
    /// Placeholder describing dropped turns; absent when nothing was dropped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Diagnostic summary over a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextStats {
    pub message_count: usize,
    pub total_tokens: usize,
    pub average_tokens_per_message: usize,
    pub has_attachments: bool,
}

/// Fits ordered turns into a bounded window, summarizing what it drops
pub struct ContextWindowManager {
    options: WindowOptions,
    estimator: TurnEstimator,
    summarizer: Arc<dyn Summarizer>,
}

impl ContextWindowManager {
    /// Create a manager with the character-ratio estimator and the
    /// placeholder summarizer
    pub fn new(options: WindowOptions) -> Self {
        Self {
            options,
            estimator: TurnEstimator::heuristic(),
            summarizer: Arc::new(PlaceholderSummarizer),
        }
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = TurnEstimator::new(estimator);
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn options(&self) -> &WindowOptions {
        &self.options
    }

    pub fn estimator(&self) -> &TurnEstimator {
        &self.estimator
    }

    /// Select the maximal suffix of `turns` that fits the budget.
    ///
    /// The most recent turn is always retained, even when it alone exceeds
    /// the budget, so the latest user question is never dropped. Older
    /// turns are admitted from most recent to least recent; the first turn
    /// that does not fit ends the walk, and the contiguous prefix it
    /// leaves behind is replaced by a summary placeholder. The summary's
    /// own cost is only known once the drop set is final, so it is added
    /// to the total after the walk; `total_tokens` can exceed the budget
    /// by at most that summary cost.
    pub fn fit(&self, turns: &[Turn]) -> ContextWindow {
        if turns.is_empty() {
            return ContextWindow {
                messages: Vec::new(),
                total_tokens: 0,
                summary: None,
            };
        }

        let available = self.options.available_tokens();
        let total = self.estimator.conversation_cost(turns);

        if total <= available {
            METRICS.context_window_tokens.observe(total as f64);
            return ContextWindow {
                messages: turns.to_vec(),
                total_tokens: total,
                summary: None,
            };
        }

        let last = turns.len() - 1;
        let mut kept = vec![turns[last].clone()];
        let mut kept_tokens = self.estimator.turn_cost(&turns[last]);
        let mut summary = String::new();
        let mut summary_tokens = 0;

        for i in (0..last).rev() {
            let cost = self.estimator.turn_cost(&turns[i]);
            if kept_tokens + cost + summary_tokens <= available {
                kept.push(turns[i].clone());
                kept_tokens += cost;
            } else {
                let dropped = &turns[..=i];
                summary = self
                    .summarizer
                    .summarize(dropped, self.options.summary_token_budget);
                summary_tokens = self.estimator.text_cost(&summary);
                debug!(
                    dropped = dropped.len(),
                    kept = kept.len(),
                    summary_tokens,
                    "Truncated conversation to fit token budget"
                );
                break;
            }
        }

        kept.reverse();

        METRICS.context_truncations.inc();
        METRICS
            .context_window_tokens
            .observe((kept_tokens + summary_tokens) as f64);

        ContextWindow {
            messages: kept,
            total_tokens: kept_tokens + summary_tokens,
            summary: (!summary.is_empty()).then_some(summary),
        }
    }

    /// Diagnostic statistics over the raw conversation
    pub fn stats(&self, turns: &[Turn]) -> ContextStats {
        let total_tokens = self.estimator.conversation_cost(turns);

        ContextStats {
            message_count: turns.len(),
            total_tokens,
            average_tokens_per_message: if turns.is_empty() {
                0
            } else {
                (total_tokens as f64 / turns.len() as f64).round() as usize
            },
            has_attachments: turns.iter().any(Turn::has_attachments),
        }
    }
}
