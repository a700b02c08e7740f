//! Engine-facing handlers for one ledger channel
//!
//! Delivered transactions collect in a transient buffer. EndBlock moves them
//! into the pending block for that height, and Commit turns every pending
//! block into a ledger block.
//!
//! Commit responses carry no status, so a failed write is only visible to
//! the engine through Info: the reported height stays where it was.

use crate::{
    abci::*,
    envelope::{unmarshal_envelope, validate_structure, Envelope, Status},
    metrics::Metrics,
    pending::{PendingBlockStore, PendingHeader},
    signal::ShutdownListener,
    support::LedgerSupport,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Handler state for one chain
#[derive(Debug)]
pub struct ChainApp<S> {
    support: Arc<S>,
    chain_id: String,
    shutdown: ShutdownListener,
    pending: PendingBlockStore,
    delivered: Vec<Envelope>,
    last_block_height: u64,
    last_block_hash: Vec<u8>,
    metrics: Metrics,
}

impl<S: LedgerSupport> ChainApp<S> {
    /// Create handlers writing to `support`
    pub fn new(
        support: Arc<S>,
        chain_id: impl Into<String>,
        shutdown: ShutdownListener,
        metrics: Metrics,
    ) -> Self {
        let last_block_height = support.height();
        Self {
            support,
            chain_id: chain_id.into(),
            shutdown,
            pending: PendingBlockStore::new(),
            delivered: Vec::new(),
            last_block_height,
            last_block_hash: Vec::new(),
            metrics,
        }
    }

    /// Channel this app orders for
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Envelopes delivered since the last EndBlock
    pub fn delivered(&self) -> &[Envelope] {
        &self.delivered
    }

    /// Blocks awaiting commit
    pub fn pending(&self) -> &PendingBlockStore {
        &self.pending
    }

    /// Height after the last successful commit
    pub fn last_block_height(&self) -> u64 {
        self.last_block_height
    }

    fn commit_response(&self) -> ResponseCommit {
        ResponseCommit {
            data: self.last_block_hash.clone().into(),
            ..Default::default()
        }
    }
}

impl<S: LedgerSupport> Application for ChainApp<S> {
    fn info(&self, _request: RequestInfo) -> ResponseInfo {
        ResponseInfo {
            data: self.chain_id.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            last_block_height: to_engine_height(self.support.height()),
            ..Default::default()
        }
    }

    fn begin_block(&mut self, request: RequestBeginBlock) -> ResponseBeginBlock {
        let header = request.header.unwrap_or_default();
        let Some(height) = from_engine_height(header.height) else {
            warn!(height = header.height, "BeginBlock with negative height ignored");
            return ResponseBeginBlock::default();
        };

        let chain_id = if header.chain_id.is_empty() {
            self.chain_id.clone()
        } else {
            header.chain_id
        };

        if let Some(replaced) = self.pending.open(PendingHeader { chain_id, height }) {
            warn!(
                height,
                dropped = replaced.txs.len(),
                "BeginBlock reopened a pending height"
            );
        }
        debug!(height, "Block opened");
        ResponseBeginBlock::default()
    }

    fn check_tx(&self, request: RequestCheckTx) -> ResponseCheckTx {
        match validate_structure(&request.tx) {
            Ok(_) => check_tx_response(Status::Success, ""),
            Err(e) => {
                warn!(error = %e, "CheckTx rejected envelope");
                check_tx_response(Status::BadRequest, e.to_string())
            }
        }
    }

    fn deliver_tx(&mut self, request: RequestDeliverTx) -> ResponseDeliverTx {
        let envelope = match unmarshal_envelope(&request.tx) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "DeliverTx rejected envelope");
                return deliver_tx_response(Status::BadRequest, e.to_string());
            }
        };

        if self.shutdown.is_closed() {
            return deliver_tx_response(Status::InternalServerError, "chain halted");
        }

        self.delivered.push(envelope);
        deliver_tx_response(Status::Success, "")
    }

    fn end_block(&mut self, request: RequestEndBlock) -> ResponseEndBlock {
        let Some(height) = from_engine_height(request.height) else {
            warn!(height = request.height, "EndBlock with negative height ignored");
            return ResponseEndBlock::default();
        };
        let txs = std::mem::take(&mut self.delivered);

        let tx_count = match self.pending.roll_up(height, txs) {
            Ok(count) => count,
            Err(txs) => {
                warn!(height, "EndBlock for a height that was never opened");
                let block = self.pending.get_or_open(PendingHeader {
                    chain_id: self.chain_id.clone(),
                    height,
                });
                block.txs.extend(txs);
                block.txs.len()
            }
        };

        debug!(height, tx_count, "Block closed");
        ResponseEndBlock::default()
    }

    fn commit(&mut self) -> ResponseCommit {
        self.delivered.clear();

        for block in self.pending.drain() {
            let height = block.header.height;
            let tx_count = block.txs.len();
            let next = self.support.create_next_block(&block.txs);
            let number = next.header.number;
            let hash = next.hash();

            if let Err(e) = self.support.write_block(next) {
                // Later heights are dropped with this one; the engine sees
                // an unchanged height and halts.
                error!(height, number, error = %e, "Failed to write block");
                return self.commit_response();
            }

            self.last_block_height = number + 1;
            self.last_block_hash = hash.to_vec();
            self.metrics.record_commit(tx_count);

            info!(height, number, tx_count, "Block committed");
        }

        self.commit_response()
    }
}
