//! Session-boundary persistence of the memory chain.
//!
//! One snapshot file per chain: the bincode-encoded node list, lz4-block
//! compressed, with a crc32 checksum over the uncompressed payload. The
//! load path re-validates every chain link invariant, so a corrupt or
//! hand-edited snapshot is rejected instead of producing a broken chain.

use crate::memory::chain::{ChainError, MemoryChain};
use crate::memory::node::MemoryNode;
use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, ErrorKind, Read, Write};
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("snapshot failed checksum verification")]
    ChecksumMismatch,
    #[error("decompression error: {0}")]
    Decompression(String),
    #[error("stored nodes do not form a valid chain: {0}")]
    InvalidChain(#[from] ChainError),
}

#[derive(Serialize, Deserialize)]
struct ChainSnapshot {
    checksum: u32,
    payload: Vec<u8>,
}

/// Loads and saves a memory chain as a single snapshot file.
pub struct ChainStore {
    path: PathBuf,
}

impl ChainStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Loads the stored chain. A missing snapshot file is an empty chain,
    /// not an error.
    pub fn load(&self) -> Result<MemoryChain, StoreError> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no snapshot, starting empty");
                return Ok(MemoryChain::new());
            }
            Err(err) => return Err(err.into()),
        };

        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        let snapshot: ChainSnapshot = bincode::deserialize(&buffer)?;

        let payload = decompress_size_prepended(&snapshot.payload)
            .map_err(|e| StoreError::Decompression(e.to_string()))?;
        if crc32fast::hash(&payload) != snapshot.checksum {
            return Err(StoreError::ChecksumMismatch);
        }

        let nodes: Vec<MemoryNode> = bincode::deserialize(&payload)?;
        let chain = MemoryChain::from_nodes(nodes)?;
        debug!(
            path = %self.path.display(),
            nodes = chain.len(),
            "loaded chain snapshot"
        );
        Ok(chain)
    }

    /// Writes the chain as one snapshot, replacing any previous one.
    pub fn save(&self, chain: &MemoryChain) -> Result<(), StoreError> {
        let payload = bincode::serialize(chain.nodes())?;
        let snapshot = ChainSnapshot {
            checksum: crc32fast::hash(&payload),
            payload: compress_prepend_size(&payload),
        };
        let encoded = bincode::serialize(&snapshot)?;

        let mut file = File::create(&self.path)?;
        file.write_all(&encoded)?;
        file.flush()?;
        debug!(
            path = %self.path.display(),
            nodes = chain.len(),
            bytes = encoded.len(),
            "saved chain snapshot"
        );
        Ok(())
    }
}
