//! BFT block production for the ordering service
//!
//! Drives an external Byzantine-fault-tolerant consensus engine through its
//! synchronous request/response protocol and turns the agreed transaction
//! order into ledger blocks.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Producers                         │
//! │          Chain::enqueue(envelope) -> bool            │
//! └────────────────────┬────────────────────────────────┘
//!                      │ submission channel
//!                      ↓
//! ┌─────────────────────────────────────────────────────┐
//! │                  Chain worker                        │
//! │  BeginBlock → CheckTx/DeliverTx → EndBlock → Commit │
//! └────────────────────┬────────────────────────────────┘
//!                      │ EngineClient (in-process or ABCI socket)
//!                      ↓
//! ┌─────────────────────────────────────────────────────┐
//! │          ChainApp (engine handlers)                  │
//! │  transient buffer → PendingBlockStore → ledger block │
//! └────────────────────┬────────────────────────────────┘
//!                      │ LedgerSupport
//!                      ↓
//! ┌─────────────────────────────────────────────────────┐
//! │                  Ledger Core                         │
//! │      Chained, hashed, optionally signed blocks       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Engine methods
//!
//! - **Info**: seeds the chain height at construction and confirms each commit
//! - **BeginBlock**: opens the next height
//! - **CheckTx**: structural envelope validation
//! - **DeliverTx**: buffers a transaction for the open height
//! - **EndBlock**: seals the open height
//! - **Commit**: writes sealed heights to the ledger
//!
//! # Failure model
//!
//! - Malformed or late transactions are dropped, the chain keeps running
//! - BeginBlock, EndBlock and Commit failures halt the chain, as does a
//!   commit after which the reported height did not advance by one
//! - Halting is cooperative and never interrupts an engine call

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod abci;
pub mod app;
pub mod chain;
pub mod client;
pub mod config;
pub mod consenter;
pub mod envelope;
pub mod error;
pub mod metrics;
pub mod pending;
pub mod server;
pub mod signal;
pub mod support;

// Re-exports
pub use app::ChainApp;
pub use chain::{Chain, ChainHandle, ChainOptions};
pub use client::{EngineClient, LocalClient, RemoteClient};
pub use config::Config;
pub use consenter::{Consenter, LocalChain, RemoteChain};
pub use envelope::{Envelope, Status, ValidationError};
pub use error::{EngineError, Error, Result};
pub use server::AbciService;
pub use signal::{ShutdownListener, ShutdownSignal};
pub use support::{LedgerSupport, MemorySupport};
