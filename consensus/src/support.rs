//! Ledger access for the chain
//!
//! [`LedgerSupport`] is everything the commit path needs from the ledger.
//! [`ledger_core::Ledger`] is the durable implementation; [`MemorySupport`]
//! keeps blocks in memory and is used for tests and dry runs.

use crate::{envelope::Envelope, Error, Result};
use ledger_core::{Block, BlockData, Ledger};
use parking_lot::Mutex;
use prost::Message;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Ledger operations used by the chain
pub trait LedgerSupport: Send + Sync + 'static {
    /// Number of committed blocks
    fn height(&self) -> u64;

    /// Interval between block cuts
    fn batch_timeout(&self) -> Duration;

    /// Assemble the next block from `txs` without persisting it
    fn create_next_block(&self, txs: &[Envelope]) -> Block;

    /// Persist a block produced by [`LedgerSupport::create_next_block`]
    fn write_block(&self, block: Block) -> Result<()>;
}

fn encode_txs(txs: &[Envelope]) -> Vec<Vec<u8>> {
    txs.iter().map(|tx| tx.encode_to_vec()).collect()
}

impl LedgerSupport for Ledger {
    fn height(&self) -> u64 {
        Ledger::height(self)
    }

    fn batch_timeout(&self) -> Duration {
        Ledger::batch_timeout(self)
    }

    fn create_next_block(&self, txs: &[Envelope]) -> Block {
        Ledger::create_next_block(self, encode_txs(txs))
    }

    fn write_block(&self, block: Block) -> Result<()> {
        Ledger::write_block(self, block)?;
        Ok(())
    }
}

/// In-memory ledger
#[derive(Debug)]
pub struct MemorySupport {
    blocks: Mutex<Vec<Block>>,
    batch_timeout: Duration,
    fail_writes: AtomicBool,
}

impl MemorySupport {
    /// Empty ledger cutting blocks every `batch_timeout`
    pub fn new(batch_timeout: Duration) -> Self {
        Self {
            blocks: Mutex::new(Vec::new()),
            batch_timeout,
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every following `write_block` fail (or succeed again)
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of written blocks
    pub fn blocks(&self) -> Vec<Block> {
        self.blocks.lock().clone()
    }

    /// Envelopes stored in block `number`
    pub fn envelopes(&self, number: u64) -> Result<Vec<Envelope>> {
        let blocks = self.blocks.lock();
        let block = blocks
            .get(number as usize)
            .ok_or_else(|| Error::Persistence(format!("block {} not found", number)))?;

        block
            .data
            .data
            .iter()
            .map(|tx| {
                Envelope::decode(tx.as_slice()).map_err(|e| Error::Persistence(e.to_string()))
            })
            .collect()
    }
}

impl LedgerSupport for MemorySupport {
    fn height(&self) -> u64 {
        self.blocks.lock().len() as u64
    }

    fn batch_timeout(&self) -> Duration {
        self.batch_timeout
    }

    fn create_next_block(&self, txs: &[Envelope]) -> Block {
        let blocks = self.blocks.lock();
        let previous_hash = blocks.last().map_or([0u8; 32], Block::hash);
        Block::new(
            blocks.len() as u64,
            previous_hash,
            BlockData::new(encode_txs(txs)),
        )
    }

    fn write_block(&self, block: Block) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Persistence("write failure injected".to_string()));
        }

        let mut blocks = self.blocks.lock();
        if block.header.number != blocks.len() as u64 {
            return Err(Error::Persistence(format!(
                "expected block number {}, got {}",
                blocks.len(),
                block.header.number
            )));
        }

        blocks.push(block);
        Ok(())
    }
}
