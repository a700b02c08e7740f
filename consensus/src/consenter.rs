//! Chain factory

use crate::{
    app::ChainApp,
    chain::{Chain, ChainOptions},
    client::{LocalClient, RemoteClient},
    metrics::Metrics,
    signal::ShutdownSignal,
    support::LedgerSupport,
    Config, Result,
};
use std::sync::Arc;

/// Chain driven by an in-process engine client
pub type LocalChain<S> = Chain<LocalClient<ChainApp<S>>>;

/// Chain driven over an ABCI socket
pub type RemoteChain = Chain<RemoteClient>;

/// Builds chains that share configuration and metrics
#[derive(Debug, Clone)]
pub struct Consenter {
    config: Config,
    metrics: Metrics,
}

impl Consenter {
    /// Create a consenter
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            config,
            metrics: Metrics::new()?,
        })
    }

    /// Metrics shared by every chain this consenter builds
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    fn options<S: LedgerSupport>(&self, support: &S, chain_id: &str) -> ChainOptions {
        ChainOptions {
            chain_id: chain_id.to_string(),
            batch_timeout: self
                .config
                .batch_timeout()
                .unwrap_or_else(|| support.batch_timeout()),
            cut_empty_blocks: self.config.cut_empty_blocks,
        }
    }

    /// Engine handlers for `chain_id` writing to `support`
    pub fn chain_app<S: LedgerSupport>(
        &self,
        support: Arc<S>,
        chain_id: &str,
        shutdown: &ShutdownSignal,
    ) -> ChainApp<S> {
        ChainApp::new(support, chain_id, shutdown.listener(), self.metrics.clone())
    }

    /// Build an unstarted chain for `chain_id` on top of `support`
    pub fn handle_chain<S: LedgerSupport>(
        &self,
        support: Arc<S>,
        chain_id: &str,
    ) -> Result<LocalChain<S>> {
        let shutdown = ShutdownSignal::new();
        let options = self.options(support.as_ref(), chain_id);
        let app = self.chain_app(support, chain_id, &shutdown);
        Chain::new(LocalClient::new(app), options, shutdown, self.metrics.clone())
    }

    /// Build an unstarted chain for `chain_id` driving the ABCI server at
    /// `addr`
    ///
    /// `support` only supplies the default batch timeout; blocks are written
    /// by whatever application the server hosts.
    pub fn handle_remote_chain<S: LedgerSupport>(
        &self,
        support: &S,
        chain_id: &str,
        addr: &str,
    ) -> Result<RemoteChain> {
        let options = self.options(support, chain_id);
        let client = RemoteClient::connect(addr)?;
        Chain::new(client, options, ShutdownSignal::new(), self.metrics.clone())
    }
}
