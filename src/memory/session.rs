use super::assembler::{AssembleError, AssemblerConfig, ContextAssembler};
use super::chain::{ChainError, MemoryChain};
use super::encoder::{EncodeError, EncoderConfig, EngramEncoder};
use crate::model::{ModelError, SequenceModel, Tokenizer};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

/// Configuration for a memory session.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub encoder: EncoderConfig,
    pub assembler: AssemblerConfig,
}

/// A conversation with long-term memory.
///
/// Owns the chain, the encoder, and the live recent-history buffer. Each
/// utterance is encoded and appended as it arrives; `build_context`
/// retrieves and renders the extended context for the next generation
/// call. Execution is strictly sequential, so ranking never observes a
/// half-linked tail.
pub struct MemorySession<M, T> {
    encoder: EngramEncoder<M>,
    tokenizer: T,
    assembler: ContextAssembler,
    chain: MemoryChain,
    recent: Vec<String>,
}

impl<M: SequenceModel, T: Tokenizer> MemorySession<M, T> {
    pub fn new(model: M, tokenizer: T, config: SessionConfig) -> Self {
        Self::with_chain(model, tokenizer, config, MemoryChain::new())
    }

    /// Resumes a session over a previously stored chain.
    ///
    /// The recent-history buffer starts empty: stored turns are reachable
    /// through ranking, only utterances of the live session qualify for
    /// the verbatim short-term window.
    pub fn with_chain(model: M, tokenizer: T, config: SessionConfig, chain: MemoryChain) -> Self {
        Self {
            encoder: EngramEncoder::new(model, config.encoder),
            tokenizer,
            assembler: ContextAssembler::new(config.assembler),
            chain,
            recent: Vec::new(),
        }
    }

    pub fn chain(&self) -> &MemoryChain {
        &self.chain
    }

    /// Records an utterance: tokenize, encode, append to the chain, and
    /// remember it in the recent-history buffer.
    ///
    /// `text` must already carry its speaker label (`"NAME: ..."`).
    /// Returns the new node's index, which doubles as the query handle
    /// for `build_context`.
    pub fn append(&mut self, text: &str) -> Result<usize, SessionError> {
        let tokens = self.tokenizer.encode(text)?;
        let engram = self.encoder.encode(&tokens)?;
        let index = self.chain.append(text.to_owned(), engram)?;
        self.recent.push(text.to_owned());
        debug!(index, "recorded utterance");
        Ok(index)
    }

    /// Builds the extended context for the node at `query`, usually the
    /// utterance just appended.
    pub fn build_context(&self, query: usize) -> Result<String, SessionError> {
        Ok(self.assembler.assemble(&self.chain, query, &self.recent)?)
    }
}
