//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `ledger_blocks_written_total` - Total number of blocks written
//! - `ledger_block_size_bytes` - Histogram of block payload sizes
//! - `ledger_height` - Number of committed blocks

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Total blocks written
    pub blocks_written: IntCounter,

    /// Block payload size histogram
    pub block_size: Histogram,

    /// Current height
    pub height: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("blocks_written", &self.blocks_written.get())
            .field("height", &self.height.get())
            .finish()
    }
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let blocks_written =
            IntCounter::new("ledger_blocks_written_total", "Total number of blocks written")?;
        registry.register(Box::new(blocks_written.clone()))?;

        let block_size = Histogram::with_opts(
            HistogramOpts::new("ledger_block_size_bytes", "Histogram of block payload sizes")
                .buckets(vec![
                    0.0, 1024.0, 16384.0, 131072.0, 1048576.0, 8388608.0, 67108864.0,
                ]),
        )?;
        registry.register(Box::new(block_size.clone()))?;

        let height = IntGauge::new("ledger_height", "Number of committed blocks")?;
        registry.register(Box::new(height.clone()))?;

        Ok(Self {
            blocks_written,
            block_size,
            height,
            registry,
        })
    }

    /// Record a written block
    pub fn record_block_written(&self, size_bytes: usize, height: u64) {
        self.blocks_written.inc();
        self.block_size.observe(size_bytes as f64);
        self.height.set(i64::try_from(height).unwrap_or(i64::MAX));
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
