//! Ledger Core
//!
//! Append-only block ledger backing the ordering service.
//!
//! # Architecture
//!
//! - **Hash Chain**: Every block header commits to the previous header hash
//! - **Data Hash**: Merkle root over the ordered transaction payloads
//! - **Single Writer**: Blocks are appended strictly in number order
//! - **Signed Metadata**: Optional Ed25519 signature over each header
//!
//! # Invariants
//!
//! - Append-only: blocks are never modified or deleted
//! - Contiguous: block `n` is written only after block `n - 1`
//! - Linked: `block[n].previous_hash == hash(block[n - 1].header)`

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod storage;
pub mod ledger;
pub mod crypto;
pub mod error;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, Result};
pub use types::{Block, BlockData, BlockHeader, BlockMetadata, Signature};
pub use storage::Storage;
pub use ledger::Ledger;
pub use config::Config;
