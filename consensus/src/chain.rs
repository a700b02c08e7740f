//! Chain lifecycle and the block-cutting worker
//!
//! A [`Chain`] owns one worker task that exclusively drives the engine
//! client. Producers talk to the worker through a [`ChainHandle`]: a
//! rendezvous-style submission channel plus the chain's shutdown signal.
//!
//! The worker cycles through
//!
//! ```text
//! BeginBlock(h+1) -> { CheckTx, DeliverTx }* -> tick -> EndBlock -> Commit -> BeginBlock(h+2) ...
//! ```
//!
//! Per-transaction failures drop the envelope and keep going. Failures of
//! Info, BeginBlock, EndBlock or Commit stop the worker: the shutdown signal
//! is closed and the error is returned through the task's `JoinHandle`.
//!
//! Commit responses carry no height, so after each Commit the worker reads
//! the height back through Info. It must advance by exactly one.

use crate::{
    abci::*,
    client::EngineClient,
    envelope::{marshal_envelope, Envelope},
    error::EngineError,
    metrics::Metrics,
    signal::{ShutdownListener, ShutdownSignal},
    Error, Result,
};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

/// Envelope in transit to the worker
#[derive(Debug)]
struct Submission {
    envelope: Envelope,
    accepted: oneshot::Sender<()>,
}

/// Chain tuning
#[derive(Debug, Clone)]
pub struct ChainOptions {
    /// Ledger channel the chain orders for
    pub chain_id: String,
    /// Interval between block cuts
    pub batch_timeout: Duration,
    /// Cut a block on ticks where nothing was delivered
    pub cut_empty_blocks: bool,
}

/// Producer-side handle to a chain
#[derive(Debug, Clone)]
pub struct ChainHandle {
    sender: mpsc::Sender<Submission>,
    shutdown: ShutdownSignal,
}

impl ChainHandle {
    /// Hand an envelope to the worker
    ///
    /// Waits until the worker has taken the envelope (`true`) or the chain
    /// has halted (`false`). An envelope for which `false` is returned
    /// never reaches the engine.
    pub async fn enqueue(&self, envelope: Envelope) -> bool {
        let mut shutdown = self.shutdown.listener();
        if shutdown.is_closed() {
            return false;
        }

        let (accepted, mut accepted_rx) = oneshot::channel();
        let submission = Submission { envelope, accepted };

        tokio::select! {
            biased;
            _ = shutdown.closed() => return false,
            sent = self.sender.send(submission) => {
                if sent.is_err() {
                    return false;
                }
            }
        }

        tokio::select! {
            biased;
            ack = &mut accepted_rx => ack.is_ok(),
            _ = shutdown.closed() => {
                // Closing first settles the race: either the worker already
                // acknowledged, or its acknowledgement now fails and it drops
                // the envelope.
                accepted_rx.close();
                accepted_rx.try_recv().is_ok()
            }
        }
    }

    /// Stop the chain; repeated calls are no-ops
    pub fn halt(&self) {
        if self.shutdown.close() {
            debug!("Halt requested");
        }
    }

    /// Listener that closes once the chain has halted or failed
    pub fn errored(&self) -> ShutdownListener {
        self.shutdown.listener()
    }
}

/// Block-cutting chain over an engine client
#[derive(Debug)]
pub struct Chain<C> {
    handle: ChainHandle,
    worker: Option<ChainWorker<C>>,
}

impl<C: EngineClient> Chain<C> {
    /// Create a chain and seed its height from the engine
    ///
    /// Fails when the engine cannot report its height.
    pub fn new(
        mut client: C,
        options: ChainOptions,
        shutdown: ShutdownSignal,
        metrics: Metrics,
    ) -> Result<Self> {
        if options.batch_timeout.is_zero() {
            return Err(Error::Config("batch timeout must be positive".to_string()));
        }

        let span = info_span!("chain", channel = %options.chain_id);
        let last_block_height = span.in_scope(|| engine_height(&mut client))?;

        span.in_scope(|| {
            info!(
                height = last_block_height,
                batch_timeout_ms = options.batch_timeout.as_millis() as u64,
                "Chain created"
            )
        });

        let (sender, receiver) = mpsc::channel(1);
        let handle = ChainHandle {
            sender,
            shutdown: shutdown.clone(),
        };

        let worker = ChainWorker {
            client,
            receiver,
            listener: shutdown.listener(),
            shutdown,
            options,
            last_block_height,
            delivered: 0,
            metrics,
            span,
        };

        Ok(Self {
            handle,
            worker: Some(worker),
        })
    }

    /// Log inside `span` instead of the default `chain` span
    pub fn with_span(mut self, span: Span) -> Self {
        if let Some(worker) = self.worker.as_mut() {
            worker.span = span;
        }
        self
    }

    /// Spawn the worker on the current tokio runtime
    pub fn start(&mut self) -> Result<JoinHandle<Result<()>>> {
        let worker = self.worker.take().ok_or(Error::AlreadyStarted)?;
        let span = worker.span.clone();
        Ok(tokio::spawn(worker.run().instrument(span)))
    }

    /// Stop the chain; repeated calls are no-ops
    pub fn halt(&self) {
        self.handle.halt()
    }

    /// Hand an envelope to the worker (see [`ChainHandle::enqueue`])
    pub async fn enqueue(&self, envelope: Envelope) -> bool {
        self.handle.enqueue(envelope).await
    }

    /// Listener that closes once the chain has halted or failed
    pub fn errored(&self) -> ShutdownListener {
        self.handle.errored()
    }

    /// Clonable producer handle
    pub fn handle(&self) -> ChainHandle {
        self.handle.clone()
    }
}

#[derive(Debug)]
struct ChainWorker<C> {
    client: C,
    receiver: mpsc::Receiver<Submission>,
    shutdown: ShutdownSignal,
    listener: ShutdownListener,
    options: ChainOptions,
    /// Last committed engine height
    last_block_height: u64,
    /// Transactions delivered into the open block
    delivered: usize,
    metrics: Metrics,
    span: Span,
}

impl<C: EngineClient> ChainWorker<C> {
    async fn run(mut self) -> Result<()> {
        let result = self.process().await;
        if let Err(ref e) = result {
            error!(error = %e, height = self.last_block_height, "Chain worker failed");
        }

        self.shutdown.close();
        info!(height = self.last_block_height, "Chain worker exited");
        result
    }

    async fn process(&mut self) -> Result<()> {
        let timeout = self.options.batch_timeout;
        let mut ticker = interval_at(Instant::now() + timeout, timeout);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if self.listener.is_closed() {
            return Ok(());
        }
        self.begin_block()?;

        loop {
            if self.listener.is_closed() {
                return Ok(());
            }

            tokio::select! {
                submission = self.receiver.recv() => match submission {
                    Some(submission) => self.handle_submission(submission),
                    None => {
                        debug!("All producer handles dropped");
                        return Ok(());
                    }
                },
                _ = ticker.tick() => self.cut_block()?,
                _ = self.listener.closed() => return Ok(()),
            }
        }
    }

    fn begin_block(&mut self) -> Result<()> {
        let height = self.last_block_height + 1;
        self.client
            .begin_block_sync(begin_block_request(&self.options.chain_id, height))?;
        self.delivered = 0;
        debug!(height, "BeginBlock");
        Ok(())
    }

    fn handle_submission(&mut self, submission: Submission) {
        let Submission { envelope, accepted } = submission;

        if self.listener.is_closed() || accepted.send(()).is_err() {
            debug!("Dropping envelope submitted during shutdown");
            return;
        }
        self.metrics.envelopes_received.inc();

        let tx = match marshal_envelope(&envelope) {
            Ok(tx) => tx,
            Err(e) => {
                warn!(error = %e, "Dropping envelope that failed to marshal");
                return;
            }
        };

        let check = RequestCheckTx {
            tx: tx.clone().into(),
            ..Default::default()
        };
        match self.client.check_tx_sync(check) {
            Ok(response) if is_success(response.code) => {}
            Ok(response) => {
                self.metrics.check_tx_rejected.inc();
                warn!(code = response.code, log = %response.log, "CheckTx rejected envelope");
                return;
            }
            Err(e) => {
                self.metrics.check_tx_rejected.inc();
                warn!(error = %e, "CheckTx failed");
                return;
            }
        }

        match self.client.deliver_tx_sync(RequestDeliverTx { tx: tx.into() }) {
            Ok(response) if is_success(response.code) => self.delivered += 1,
            Ok(response) => {
                self.metrics.deliver_tx_rejected.inc();
                warn!(code = response.code, log = %response.log, "DeliverTx rejected envelope");
            }
            Err(e) => {
                self.metrics.deliver_tx_rejected.inc();
                warn!(error = %e, "DeliverTx failed");
            }
        }
    }

    fn cut_block(&mut self) -> Result<()> {
        if self.delivered == 0 && !self.options.cut_empty_blocks {
            return Ok(());
        }

        let height = self.last_block_height + 1;
        self.client.end_block_sync(RequestEndBlock {
            height: to_engine_height(height),
        })?;
        self.client.commit_sync()?;

        let committed = engine_height(&mut self.client)?;
        if committed == self.last_block_height {
            return Err(Error::CommitRejected { height });
        }
        if committed != height {
            return Err(EngineError::Protocol(format!(
                "commit moved height from {} to {}",
                self.last_block_height, committed
            ))
            .into());
        }

        self.last_block_height = committed;
        debug!(height, tx_count = self.delivered, "Block cut");

        self.begin_block()
    }
}

/// Last committed height as reported by Info
fn engine_height<C: EngineClient>(client: &mut C) -> Result<u64> {
    let info = client.info_sync(RequestInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        ..Default::default()
    })?;

    from_engine_height(info.last_block_height).ok_or_else(|| {
        EngineError::Protocol(format!(
            "negative last block height {}",
            info.last_block_height
        ))
        .into()
    })
}
