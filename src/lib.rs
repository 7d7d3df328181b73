//! Long-term conversational memory for generative dialogue models.
//!
//! Past utterances are compressed into fixed-length "engram" vectors,
//! stored as nodes of a chronological doubly-linked chain, and retrieved
//! by similarity to the current conversational state to assemble a context
//! window far larger than the underlying model can natively attend to.

pub mod memory;
pub mod model;
pub mod storage;

pub use memory::{MemoryChain, MemoryNode, MemorySession, SessionConfig};
pub use storage::ChainStore;
