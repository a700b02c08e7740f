//! Core types for the ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Hash-chained block headers (SHA-256)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Block header, the hashed part of a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block number (0 = genesis)
    pub number: u64,

    /// Hash of the previous block header (zero for genesis)
    pub previous_hash: [u8; 32],

    /// Merkle root over the block data
    pub data_hash: [u8; 32],
}

impl BlockHeader {
    /// Compute header hash
    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.number.to_be_bytes());
        hasher.update(self.previous_hash);
        hasher.update(self.data_hash);

        hasher.finalize().into()
    }
}

/// Ordered transaction payloads carried by a block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockData {
    /// Marshaled transactions, in commit order
    pub data: Vec<Vec<u8>>,
}

impl BlockData {
    /// Wrap an ordered list of transactions
    pub fn new(data: Vec<Vec<u8>>) -> Self {
        Self { data }
    }

    /// Number of transactions
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the block carries no transactions
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Total payload size in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.iter().map(Vec::len).sum()
    }
}

/// Metadata attached when the block is written
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMetadata {
    /// Ed25519 signature over the header hash (empty when unsigned)
    pub signature: Vec<u8>,

    /// Public key of the signer (empty when unsigned)
    pub signer: Vec<u8>,

    /// Write timestamp
    pub written_at: Option<DateTime<Utc>>,
}

/// Ledger block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Header
    pub header: BlockHeader,

    /// Transactions
    pub data: BlockData,

    /// Write-time metadata
    pub metadata: BlockMetadata,
}

impl Block {
    /// Assemble an unsigned block on top of `previous_hash`
    pub fn new(number: u64, previous_hash: [u8; 32], data: BlockData) -> Self {
        let data_hash = crate::crypto::data_hash(&data);

        Self {
            header: BlockHeader {
                number,
                previous_hash,
                data_hash,
            },
            data,
            metadata: BlockMetadata::default(),
        }
    }

    /// Header hash
    pub fn hash(&self) -> [u8; 32] {
        self.header.hash()
    }

    /// Number of transactions in the block
    pub fn tx_count(&self) -> usize {
        self.data.len()
    }

    /// True if the data hash matches the carried data
    pub fn verify_data_hash(&self) -> bool {
        crate::crypto::data_hash(&self.data) == self.header.data_hash
    }
}

/// Digital signature (Ed25519)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    bytes: [u8; 64],
}

impl Signature {
    /// Create from bytes
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self { bytes }
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.bytes
    }

    /// Parse from a byte slice
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; 64] = bytes.try_into().ok()?;
        Some(Self { bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_hash_covers_all_fields() {
        let header = BlockHeader {
            number: 7,
            previous_hash: [1u8; 32],
            data_hash: [2u8; 32],
        };

        let mut other = header.clone();
        other.number = 8;
        assert_ne!(header.hash(), other.hash());

        let mut other = header.clone();
        other.previous_hash = [3u8; 32];
        assert_ne!(header.hash(), other.hash());

        let mut other = header.clone();
        other.data_hash = [3u8; 32];
        assert_ne!(header.hash(), other.hash());
    }

    #[test]
    fn test_block_new_computes_data_hash() {
        let block = Block::new(0, [0u8; 32], BlockData::new(vec![b"tx1".to_vec()]));
        assert!(block.verify_data_hash());
        assert_eq!(block.tx_count(), 1);

        let mut tampered = block.clone();
        tampered.data.data.push(b"tx2".to_vec());
        assert!(!tampered.verify_data_hash());
    }

    #[test]
    fn test_block_data_size() {
        let data = BlockData::new(vec![vec![0u8; 10], vec![0u8; 5]]);
        assert_eq!(data.len(), 2);
        assert_eq!(data.size_bytes(), 15);
        assert!(BlockData::default().is_empty());
    }

    #[test]
    fn test_signature_from_slice() {
        assert!(Signature::from_slice(&[0u8; 64]).is_some());
        assert!(Signature::from_slice(&[0u8; 63]).is_none());
    }
}
