//! Main ledger orchestration layer
//!
//! Ties together storage, hashing, and signing into the block-append API
//! used by the ordering service.
//!
//! # Example
//!
//! ```no_run
//! use ledger_core::{Config, Ledger};
//!
//! fn main() -> ledger_core::Result<()> {
//!     let ledger = Ledger::open(Config::default())?;
//!
//!     let block = ledger.create_next_block(vec![b"tx".to_vec()]);
//!     ledger.write_block(block)?;
//!     assert_eq!(ledger.height(), 1);
//!
//!     Ok(())
//! }
//! ```

use crate::{
    crypto::KeyPair,
    metrics::Metrics,
    types::{Block, BlockData, BlockHeader},
    Config, Error, Result, Storage,
};
use chrono::Utc;
use parking_lot::RwLock;
use std::time::Duration;

/// Main ledger interface
#[derive(Debug)]
pub struct Ledger {
    /// Block store
    storage: Storage,

    /// Header of the last written block (`None` before genesis)
    tip: RwLock<Option<BlockHeader>>,

    /// Key pair for signing (if enabled)
    keypair: Option<KeyPair>,

    /// Metrics
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open ledger with configuration
    pub fn open(config: Config) -> Result<Self> {
        let storage = Storage::open(&config)?;
        let tip = storage.get_latest_block()?.map(|block| block.header);
        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("Failed to create metrics: {}", e)))?;

        let ledger = Self {
            storage,
            tip: RwLock::new(tip),
            keypair: None,
            metrics,
            config,
        };

        ledger.metrics.height.set(ledger.height() as i64);
        tracing::info!(height = ledger.height(), "Ledger opened");

        Ok(ledger)
    }

    /// Set signing key pair
    pub fn with_keypair(mut self, keypair: KeyPair) -> Self {
        self.keypair = Some(keypair);
        self
    }

    /// Number of committed blocks (the next block number)
    pub fn height(&self) -> u64 {
        self.tip.read().as_ref().map_or(0, |header| header.number + 1)
    }

    /// Configured batch-cut interval
    pub fn batch_timeout(&self) -> Duration {
        self.config.batch_timeout()
    }

    /// Assemble the next block on top of the current tip
    ///
    /// The block is not persisted until [`Ledger::write_block`] is called.
    pub fn create_next_block(&self, data: Vec<Vec<u8>>) -> Block {
        let tip = self.tip.read();
        let (number, previous_hash) = match tip.as_ref() {
            Some(header) => (header.number + 1, header.hash()),
            None => (0, [0u8; 32]),
        };

        Block::new(number, previous_hash, BlockData::new(data))
    }

    /// Persist a block that extends the current tip
    pub fn write_block(&self, mut block: Block) -> Result<()> {
        // Hold the write lock across the check and the put so writes stay serial
        let mut tip = self.tip.write();

        let (expected_number, expected_previous) = match tip.as_ref() {
            Some(header) => (header.number + 1, header.hash()),
            None => (0, [0u8; 32]),
        };

        if block.header.number != expected_number {
            return Err(Error::InvalidBlock(format!(
                "expected block number {}, got {}",
                expected_number, block.header.number
            )));
        }

        if block.header.previous_hash != expected_previous {
            return Err(Error::InvalidBlock(format!(
                "previous hash mismatch at block {}",
                block.header.number
            )));
        }

        if !block.verify_data_hash() {
            return Err(Error::InvalidBlock(format!(
                "data hash mismatch at block {}",
                block.header.number
            )));
        }

        if let Some(ref keypair) = self.keypair {
            let signature = keypair.sign(&block.hash());
            block.metadata.signature = signature.as_bytes().to_vec();
            block.metadata.signer = keypair.public_key().to_vec();
        }
        block.metadata.written_at = Some(Utc::now());

        self.storage.put_block(&block)?;
        *tip = Some(block.header.clone());

        self.metrics
            .record_block_written(block.data.size_bytes(), block.header.number + 1);

        tracing::info!(
            number = block.header.number,
            tx_count = block.tx_count(),
            "Block written"
        );

        Ok(())
    }

    /// Get block by number
    pub fn get_block(&self, number: u64) -> Result<Block> {
        self.storage.get_block(number)
    }

    /// Get latest block
    pub fn latest_block(&self) -> Result<Option<Block>> {
        self.storage.get_latest_block()
    }

    /// Ledger metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}
