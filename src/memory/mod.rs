//! Core logic: engram encoding, the memory chain, similarity ranking,
//! and context assembly.

pub mod assembler;
pub mod chain;
pub mod encoder;
pub mod node;
pub mod ranker;
pub mod session;

pub use assembler::{AssembleError, AssemblerConfig, ContextAssembler};
pub use chain::{ChainError, MemoryChain};
pub use encoder::{EncodeError, EncoderConfig, EngramEncoder};
pub use node::{Engram, MemoryNode, NO_LINK};
pub use ranker::{distance, RankConfig, RankPass, Ranker, ScoreTable};
pub use session::{MemorySession, SessionConfig, SessionError};
