//! Shared fixtures for chain integration tests

#![allow(dead_code)]

use consensus::{
    abci::*,
    client::EngineResult,
    envelope::{marshal_envelope, Payload},
    metrics::Metrics,
    Chain, ChainApp, ChainOptions, EngineClient, EngineError, Envelope, LedgerSupport,
    LocalClient, MemorySupport, ShutdownSignal,
};
use parking_lot::Mutex;
use prost::Message;
use std::sync::{mpsc, Arc};
use std::time::Duration;

pub const CHAIN_ID: &str = "testchain";
pub const BATCH_TIMEOUT: Duration = Duration::from_secs(1);

/// Chain under test
pub type TestChain = Chain<RecordingClient<LocalClient<ChainApp<MemorySupport>>>>;

/// Well-formed envelope whose payload data is `id`
pub fn envelope(id: &str) -> Envelope {
    Envelope::for_channel(CHAIN_ID, id, id.as_bytes().to_vec())
}

/// Envelope whose payload has no header
pub fn headerless(id: &str) -> Envelope {
    let payload = Payload {
        header: None,
        data: id.as_bytes().to_vec(),
    };
    Envelope {
        payload: payload.encode_to_vec(),
        signature: Vec::new(),
    }
}

/// Payload data of an envelope
pub fn payload_data(envelope: &Envelope) -> Vec<u8> {
    Payload::decode(envelope.payload.as_slice()).unwrap().data
}

/// Payload data of every envelope in block `number`
pub fn block_ids(support: &MemorySupport, number: u64) -> Vec<String> {
    support
        .envelopes(number)
        .unwrap()
        .iter()
        .map(|e| String::from_utf8(payload_data(e)).unwrap())
        .collect()
}

/// Calls observed by a [`RecordingClient`]
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    check_tx: Arc<Mutex<Vec<Vec<u8>>>>,
    begin_heights: Arc<Mutex<Vec<u64>>>,
}

impl Recorder {
    /// Transactions presented to CheckTx, in order
    pub fn check_tx(&self) -> Vec<Vec<u8>> {
        self.check_tx.lock().clone()
    }

    /// Heights opened with BeginBlock, in order
    pub fn begin_heights(&self) -> Vec<u64> {
        self.begin_heights.lock().clone()
    }
}

/// Faults a [`RecordingClient`] injects
#[derive(Debug, Default)]
pub struct Faults {
    /// Fail Info
    pub fail_info: bool,
    /// Fail BeginBlock from this height on
    pub fail_begin_block_at: Option<u64>,
    /// Block every CheckTx until a message arrives (or the sender drops)
    pub check_tx_gate: Option<mpsc::Receiver<()>>,
    /// Fail EndBlock
    pub fail_end_block: bool,
    /// Fail Commit before it reaches the application
    pub fail_commit: bool,
    /// Height Info reports once a commit has gone through
    pub height_after_commit: Option<i64>,
}

/// Engine client that records traffic and injects faults
#[derive(Debug)]
pub struct RecordingClient<C> {
    inner: C,
    recorder: Recorder,
    faults: Faults,
    committed: bool,
}

impl<C: EngineClient> RecordingClient<C> {
    pub fn new(inner: C, recorder: Recorder, faults: Faults) -> Self {
        Self {
            inner,
            recorder,
            faults,
            committed: false,
        }
    }
}

impl<C: EngineClient> EngineClient for RecordingClient<C> {
    fn info_sync(&mut self, request: RequestInfo) -> EngineResult<ResponseInfo> {
        if self.faults.fail_info {
            return Err(EngineError::Transport("connection refused".to_string()));
        }
        let mut response = self.inner.info_sync(request)?;
        if let (true, Some(height)) = (self.committed, self.faults.height_after_commit) {
            response.last_block_height = height;
        }
        Ok(response)
    }

    fn begin_block_sync(&mut self, request: RequestBeginBlock) -> EngineResult<ResponseBeginBlock> {
        let height = request.header.as_ref().map_or(0, |h| h.height as u64);
        if matches!(self.faults.fail_begin_block_at, Some(at) if height >= at) {
            return Err(EngineError::Protocol(format!("refused height {}", height)));
        }
        self.recorder.begin_heights.lock().push(height);
        self.inner.begin_block_sync(request)
    }

    fn check_tx_sync(&mut self, request: RequestCheckTx) -> EngineResult<ResponseCheckTx> {
        if let Some(gate) = self.faults.check_tx_gate.as_ref() {
            let _ = gate.recv();
        }
        self.recorder.check_tx.lock().push(request.tx.to_vec());
        self.inner.check_tx_sync(request)
    }

    fn deliver_tx_sync(&mut self, request: RequestDeliverTx) -> EngineResult<ResponseDeliverTx> {
        self.inner.deliver_tx_sync(request)
    }

    fn end_block_sync(&mut self, request: RequestEndBlock) -> EngineResult<ResponseEndBlock> {
        if self.faults.fail_end_block {
            return Err(EngineError::Transport("connection reset".to_string()));
        }
        self.inner.end_block_sync(request)
    }

    fn commit_sync(&mut self) -> EngineResult<ResponseCommit> {
        if self.faults.fail_commit {
            return Err(EngineError::Transport("connection reset".to_string()));
        }
        let response = self.inner.commit_sync()?;
        self.committed = true;
        Ok(response)
    }
}

/// Build an unstarted chain over `support` with recording and faults
pub fn recording_chain(
    support: Arc<MemorySupport>,
    cut_empty_blocks: bool,
    faults: Faults,
) -> consensus::Result<(TestChain, Recorder)> {
    let shutdown = ShutdownSignal::new();
    let metrics = Metrics::new()?;
    let recorder = Recorder::default();

    let options = ChainOptions {
        chain_id: CHAIN_ID.to_string(),
        batch_timeout: support.batch_timeout(),
        cut_empty_blocks,
    };
    let app = ChainApp::new(support, CHAIN_ID, shutdown.listener(), metrics.clone());
    let client = RecordingClient::new(LocalClient::new(app), recorder.clone(), faults);

    let chain = Chain::new(client, options, shutdown, metrics)?;
    Ok((chain, recorder))
}

/// Marshaled form of `envelope`, as CheckTx sees it
pub fn wire(envelope: &Envelope) -> Vec<u8> {
    marshal_envelope(envelope).unwrap()
}
