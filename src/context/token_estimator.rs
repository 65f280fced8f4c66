//! Token estimation for turns and attachments

use crate::chat::Turn;
use crate::error::{ContextError, Result};
use std::sync::Arc;
use tiktoken_rs::{cl100k_base, CoreBPE};

/// Characters per token assumed by the heuristic estimator
const CHARS_PER_TOKEN: usize = 4;

/// Fixed structural overhead per turn (role plus message framing)
const TURN_OVERHEAD_TOKENS: usize = 10;

/// Flat cost of an image attachment, independent of resolution
const IMAGE_ATTACHMENT_TOKENS: usize = 85;

/// Overhead of a textual file reference beyond its name
const FILE_REFERENCE_OVERHEAD_TOKENS: usize = 20;

/// Token estimator trait for different tokenization strategies
pub trait TokenEstimator: Send + Sync {
    /// Estimate the number of tokens in the given text
    fn estimate(&self, text: &str) -> usize;

    /// Estimate tokens for multiple texts
    fn estimate_batch(&self, texts: &[&str]) -> Vec<usize> {
        texts.iter().map(|t| self.estimate(t)).collect()
    }
}

/// Character-ratio estimator (~4 characters per token for English text).
///
/// A calibrated approximation, not a tokenizer; cheap enough to run on
/// every turn of every request.
pub struct HeuristicEstimator;

impl TokenEstimator for HeuristicEstimator {
    fn estimate(&self, text: &str) -> usize {
        text.chars().count().div_ceil(CHARS_PER_TOKEN)
    }
}

/// Tiktoken-based estimator using cl100k_base
pub struct TiktokenEstimator {
    bpe: Arc<CoreBPE>,
}

impl TiktokenEstimator {
    pub fn new() -> Result<Self> {
        let bpe = cl100k_base().map_err(|e| ContextError::Configuration(e.to_string()))?;
        Ok(Self { bpe: Arc::new(bpe) })
    }
}

impl TokenEstimator for TiktokenEstimator {
    fn estimate(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Turn-level cost model layered over a text estimator.
///
/// Adds the structural overheads on top of raw text cost: a fixed amount
/// per turn, a flat vision cost per image attachment, and a file-reference
/// cost (name plus framing) per non-image attachment. Attachment content
/// is never costed, only its reference.
#[derive(Clone)]
pub struct TurnEstimator {
    text: Arc<dyn TokenEstimator>,
}

impl TurnEstimator {
    pub fn new(text: Arc<dyn TokenEstimator>) -> Self {
        Self { text }
    }

    /// Cost model backed by the character-ratio estimator
    pub fn heuristic() -> Self {
        Self::new(Arc::new(HeuristicEstimator))
    }

    /// Raw text cost, without turn overhead
    pub fn text_cost(&self, text: &str) -> usize {
        self.text.estimate(text)
    }

    /// Cost of a single turn including structural and attachment overhead
    pub fn turn_cost(&self, turn: &Turn) -> usize {
        let mut tokens = self.text.estimate(&turn.content) + TURN_OVERHEAD_TOKENS;

        for attachment in &turn.attachments {
            tokens += if attachment.is_image() {
                IMAGE_ATTACHMENT_TOKENS
            } else {
                self.text.estimate(&attachment.name) + FILE_REFERENCE_OVERHEAD_TOKENS
            };
        }

        tokens
    }

    /// Total cost of an ordered turn sequence
    pub fn conversation_cost(&self, turns: &[Turn]) -> usize {
        turns.iter().map(|t| self.turn_cost(t)).sum()
    }
}

impl Default for TurnEstimator {
    fn default() -> Self {
        Self::heuristic()
    }
}
