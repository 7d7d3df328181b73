//! Contracts for the external model collaborators.
//!
//! The memory engine never talks to a concrete transformer. It consumes a
//! tokenizer, a forward pass, and a generation call through the traits
//! below, so any backend that can produce per-layer activations can sit
//! behind the chain.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
    #[error("forward pass failed: {0}")]
    Forward(String),
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("activation buffer of {0} values does not divide into rows of width {1}")]
    Shape(usize, usize),
}

/// Activation matrix for one model layer, one row per token.
#[derive(Debug, Clone)]
pub struct LayerActivations {
    hidden: usize,
    data: Vec<f32>,
}

impl LayerActivations {
    /// Builds a matrix from a row-major buffer of `tokens * hidden` values.
    pub fn from_flat(hidden: usize, data: Vec<f32>) -> Result<Self, ModelError> {
        if hidden == 0 || data.len() % hidden != 0 {
            return Err(ModelError::Shape(data.len(), hidden));
        }
        Ok(Self { hidden, data })
    }

    /// Builds a matrix from per-token rows, which must all share one width.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self, ModelError> {
        let hidden = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * hidden);
        for row in rows {
            if row.len() != hidden {
                return Err(ModelError::Shape(row.len(), hidden));
            }
            data.extend_from_slice(row);
        }
        Self::from_flat(hidden, data)
    }

    pub fn hidden(&self) -> usize {
        self.hidden
    }

    /// Number of token rows.
    pub fn tokens(&self) -> usize {
        self.data.len() / self.hidden
    }

    /// Iterates the token rows in order.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.hidden)
    }
}

/// Text <-> token conversion.
///
/// The end-of-sequence marker doubles as the pad/stop token during
/// generation.
pub trait Tokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>, ModelError>;
    fn decode(&self, tokens: &[u32]) -> Result<String, ModelError>;
    fn end_of_sequence(&self) -> u32;
}

/// A sequence model's forward pass.
///
/// `forward` returns one activation matrix per layer, starting with the
/// input embedding layer; implementations must expose at least one layer
/// beyond it. Every matrix has `hidden_dim()` columns.
pub trait SequenceModel {
    fn hidden_dim(&self) -> usize;
    fn forward(&self, tokens: &[u32]) -> Result<Vec<LayerActivations>, ModelError>;
}

/// The generation collaborator: context text in, continuation text out.
///
/// Sampling behavior is the implementation's configuration, not memory
/// logic; `GenerationConfig` carries the conventional knobs.
pub trait Generator {
    fn generate(&self, context: &str) -> Result<String, ModelError>;
}

/// Sampling controls for `Generator` implementations.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Upper bound on newly generated tokens per call.
    pub max_new_tokens: usize,
    pub temperature: f32,
    pub repetition_penalty: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 78,
            temperature: 0.85,
            repetition_penalty: 1.18,
        }
    }
}
