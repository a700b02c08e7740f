//! ABCI socket server
//!
//! Exposes an [`Application`] to an external consensus engine through
//! `tendermint_abci::Server`. The server hands every connection its own
//! clone of the service, so the application sits behind a shared mutex and
//! the engine's calls are applied one at a time.

use crate::abci::*;
use crate::{error::EngineError, Result};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tendermint_abci::{Server, ServerBuilder};
use tracing::info;

/// Shared handle to an application served over ABCI
pub struct AbciService<A> {
    app: Arc<Mutex<A>>,
}

impl<A> AbciService<A> {
    /// Wrap `app` for serving
    pub fn new(app: A) -> Self {
        Self {
            app: Arc::new(Mutex::new(app)),
        }
    }

    /// Shared application
    pub fn app(&self) -> Arc<Mutex<A>> {
        self.app.clone()
    }
}

impl<A> Clone for AbciService<A> {
    fn clone(&self) -> Self {
        Self {
            app: self.app.clone(),
        }
    }
}

impl<A> fmt::Debug for AbciService<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbciService").finish_non_exhaustive()
    }
}

impl<A: Application + 'static> tendermint_abci::Application for AbciService<A> {
    fn info(&self, request: RequestInfo) -> ResponseInfo {
        self.app.lock().info(request)
    }

    fn check_tx(&self, request: RequestCheckTx) -> ResponseCheckTx {
        self.app.lock().check_tx(request)
    }

    fn begin_block(&self, request: RequestBeginBlock) -> ResponseBeginBlock {
        self.app.lock().begin_block(request)
    }

    fn deliver_tx(&self, request: RequestDeliverTx) -> ResponseDeliverTx {
        self.app.lock().deliver_tx(request)
    }

    fn end_block(&self, request: RequestEndBlock) -> ResponseEndBlock {
        self.app.lock().end_block(request)
    }

    fn commit(&self) -> ResponseCommit {
        self.app.lock().commit()
    }
}

/// Bind an ABCI server for `service` at `addr` (`host:port`)
///
/// The returned server accepts nothing until `listen` is called, which
/// blocks the calling thread.
pub fn bind<A: Application + 'static>(
    addr: &str,
    service: AbciService<A>,
) -> Result<Server<AbciService<A>>> {
    let addr = addr.trim_start_matches("tcp://");
    let server = ServerBuilder::default()
        .bind(addr, service)
        .map_err(|e| EngineError::Transport(format!("bind {}: {}", addr, e)))?;

    info!(addr = %server.local_addr(), "ABCI server bound");
    Ok(server)
}
