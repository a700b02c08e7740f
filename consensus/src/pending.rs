//! Height-indexed buffer of blocks awaiting commit

use crate::envelope::Envelope;
use std::collections::BTreeMap;

/// Identity of a block opened by the engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingHeader {
    /// Chain the block belongs to
    pub chain_id: String,
    /// Engine height of the block
    pub height: u64,
}

/// Transactions delivered for one engine height
#[derive(Debug, Clone, PartialEq)]
pub struct PendingBlock {
    /// Header the engine opened the block with
    pub header: PendingHeader,
    /// Delivered envelopes in delivery order
    pub txs: Vec<Envelope>,
}

/// Blocks opened by BeginBlock and not yet committed
///
/// Keyed by engine height. Draining yields heights in ascending order so
/// a commit covering several heights writes them in chain order.
#[derive(Debug, Default)]
pub struct PendingBlockStore {
    blocks: BTreeMap<u64, PendingBlock>,
}

impl PendingBlockStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an empty block for `header.height`
    ///
    /// Returns the block previously stored at that height, if any.
    pub fn open(&mut self, header: PendingHeader) -> Option<PendingBlock> {
        let height = header.height;
        self.blocks.insert(
            height,
            PendingBlock {
                header,
                txs: Vec::new(),
            },
        )
    }

    /// Block at `header.height`, opened empty from `header` when absent
    pub fn get_or_open(&mut self, header: PendingHeader) -> &mut PendingBlock {
        self.blocks
            .entry(header.height)
            .or_insert_with(|| PendingBlock {
                header,
                txs: Vec::new(),
            })
    }

    /// Append `txs` to the block at `height`
    ///
    /// Returns the block's transaction count, or hands `txs` back when no
    /// block is open at that height.
    pub fn roll_up(&mut self, height: u64, txs: Vec<Envelope>) -> Result<usize, Vec<Envelope>> {
        match self.blocks.get_mut(&height) {
            Some(block) => {
                block.txs.extend(txs);
                Ok(block.txs.len())
            }
            None => Err(txs),
        }
    }

    /// Remove and return every block, lowest height first
    pub fn drain(&mut self) -> Vec<PendingBlock> {
        std::mem::take(&mut self.blocks).into_values().collect()
    }

    /// Block at `height`
    pub fn get(&self, height: u64) -> Option<&PendingBlock> {
        self.blocks.get(&height)
    }

    /// Number of open blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether no block is open
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
