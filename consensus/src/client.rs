//! Synchronous engine clients
//!
//! [`EngineClient`] is the request side of the engine protocol. The chain
//! worker owns exactly one client and issues one call at a time.
//! [`LocalClient`] answers those calls in-process by dispatching straight
//! into an [`Application`]; [`RemoteClient`] sends them over an ABCI socket.

use crate::abci::*;
use crate::error::EngineError;
use std::fmt;
use tendermint_abci::{Client, ClientBuilder};
use tracing::info;

/// Result of an engine call
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Blocking request/response connection to the consensus engine
pub trait EngineClient: Send + 'static {
    /// Query application info
    fn info_sync(&mut self, request: RequestInfo) -> EngineResult<ResponseInfo>;

    /// Open a block
    fn begin_block_sync(&mut self, request: RequestBeginBlock) -> EngineResult<ResponseBeginBlock>;

    /// Validate a transaction
    fn check_tx_sync(&mut self, request: RequestCheckTx) -> EngineResult<ResponseCheckTx>;

    /// Deliver a transaction into the open block
    fn deliver_tx_sync(&mut self, request: RequestDeliverTx) -> EngineResult<ResponseDeliverTx>;

    /// Close the open block
    fn end_block_sync(&mut self, request: RequestEndBlock) -> EngineResult<ResponseEndBlock>;

    /// Commit closed blocks
    fn commit_sync(&mut self) -> EngineResult<ResponseCommit>;
}

/// In-process client bound to an application
#[derive(Debug)]
pub struct LocalClient<A> {
    app: A,
}

impl<A: Application> LocalClient<A> {
    /// Bind a client to `app`
    pub fn new(app: A) -> Self {
        Self { app }
    }

    /// Bound application
    pub fn app(&self) -> &A {
        &self.app
    }

    /// Bound application, mutably
    pub fn app_mut(&mut self) -> &mut A {
        &mut self.app
    }

    /// Unbind and return the application
    pub fn into_inner(self) -> A {
        self.app
    }
}

impl<A: Application + 'static> EngineClient for LocalClient<A> {
    fn info_sync(&mut self, request: RequestInfo) -> EngineResult<ResponseInfo> {
        Ok(self.app.info(request))
    }

    fn begin_block_sync(&mut self, request: RequestBeginBlock) -> EngineResult<ResponseBeginBlock> {
        Ok(self.app.begin_block(request))
    }

    fn check_tx_sync(&mut self, request: RequestCheckTx) -> EngineResult<ResponseCheckTx> {
        Ok(self.app.check_tx(request))
    }

    fn deliver_tx_sync(&mut self, request: RequestDeliverTx) -> EngineResult<ResponseDeliverTx> {
        Ok(self.app.deliver_tx(request))
    }

    fn end_block_sync(&mut self, request: RequestEndBlock) -> EngineResult<ResponseEndBlock> {
        Ok(self.app.end_block(request))
    }

    fn commit_sync(&mut self) -> EngineResult<ResponseCommit> {
        Ok(self.app.commit())
    }
}

/// Client speaking ABCI over TCP to an application server
pub struct RemoteClient {
    client: Client,
    addr: String,
}

impl RemoteClient {
    /// Connect to the ABCI server at `addr` (`host:port`)
    pub fn connect(addr: &str) -> EngineResult<Self> {
        let addr = addr.trim_start_matches("tcp://").to_string();
        let client = ClientBuilder::default()
            .connect(addr.as_str())
            .map_err(|e| transport(&addr, e))?;

        info!(addr = %addr, "Connected to ABCI server");
        Ok(Self { client, addr })
    }

    /// Server address
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteClient")
            .field("addr", &self.addr)
            .finish()
    }
}

fn transport(addr: &str, e: tendermint_abci::Error) -> EngineError {
    EngineError::Transport(format!("{}: {}", addr, e))
}

impl EngineClient for RemoteClient {
    fn info_sync(&mut self, request: RequestInfo) -> EngineResult<ResponseInfo> {
        self.client
            .info(request)
            .map_err(|e| transport(&self.addr, e))
    }

    fn begin_block_sync(&mut self, request: RequestBeginBlock) -> EngineResult<ResponseBeginBlock> {
        self.client
            .begin_block(request)
            .map_err(|e| transport(&self.addr, e))
    }

    fn check_tx_sync(&mut self, request: RequestCheckTx) -> EngineResult<ResponseCheckTx> {
        self.client
            .check_tx(request)
            .map_err(|e| transport(&self.addr, e))
    }

    fn deliver_tx_sync(&mut self, request: RequestDeliverTx) -> EngineResult<ResponseDeliverTx> {
        self.client
            .deliver_tx(request)
            .map_err(|e| transport(&self.addr, e))
    }

    fn end_block_sync(&mut self, request: RequestEndBlock) -> EngineResult<ResponseEndBlock> {
        self.client
            .end_block(request)
            .map_err(|e| transport(&self.addr, e))
    }

    fn commit_sync(&mut self) -> EngineResult<ResponseCommit> {
        self.client.commit().map_err(|e| transport(&self.addr, e))
    }
}
