//! Prometheus metrics for the block pipeline
//!
//! # Metrics
//!
//! - `consensus_envelopes_received_total` - Envelopes taken off the submission channel
//! - `consensus_check_tx_rejected_total` - Envelopes rejected by CheckTx
//! - `consensus_deliver_tx_rejected_total` - Envelopes rejected by DeliverTx
//! - `consensus_blocks_committed_total` - Blocks written by Commit
//! - `consensus_block_tx_count` - Transactions per committed block

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Envelopes received by the worker
    pub envelopes_received: IntCounter,

    /// CheckTx rejections
    pub check_tx_rejected: IntCounter,

    /// DeliverTx rejections
    pub deliver_tx_rejected: IntCounter,

    /// Committed blocks
    pub blocks_committed: IntCounter,

    /// Transactions per block
    pub block_tx_count: Histogram,

    registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("envelopes_received", &self.envelopes_received.get())
            .field("blocks_committed", &self.blocks_committed.get())
            .finish()
    }
}

fn counter(registry: &Registry, name: &str, help: &str) -> prometheus::Result<IntCounter> {
    let counter = IntCounter::new(name, help)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl Metrics {
    /// Create a collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let envelopes_received = counter(
            &registry,
            "consensus_envelopes_received_total",
            "Envelopes taken off the submission channel",
        )?;
        let check_tx_rejected = counter(
            &registry,
            "consensus_check_tx_rejected_total",
            "Envelopes rejected by CheckTx",
        )?;
        let deliver_tx_rejected = counter(
            &registry,
            "consensus_deliver_tx_rejected_total",
            "Envelopes rejected by DeliverTx",
        )?;
        let blocks_committed = counter(
            &registry,
            "consensus_blocks_committed_total",
            "Blocks written by Commit",
        )?;

        let block_tx_count = Histogram::with_opts(
            HistogramOpts::new("consensus_block_tx_count", "Transactions per committed block")
                .buckets(vec![0.0, 1.0, 10.0, 100.0, 500.0, 1000.0, 5000.0]),
        )?;
        registry.register(Box::new(block_tx_count.clone()))?;

        Ok(Self {
            envelopes_received,
            check_tx_rejected,
            deliver_tx_rejected,
            blocks_committed,
            block_tx_count,
            registry,
        })
    }

    /// Record a committed block
    pub fn record_commit(&self, tx_count: usize) {
        self.blocks_committed.inc();
        self.block_tx_count.observe(tx_count as f64);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Export all metrics in Prometheus text format
    pub fn export(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
