//! Engine protocol
//!
//! Messages are the ABCI types from `tendermint-proto`. [`Application`]
//! lists the six handlers the block pipeline uses; the helpers below build
//! the status-coded responses those handlers return.

pub use tendermint_proto::abci::{
    RequestBeginBlock, RequestCheckTx, RequestDeliverTx, RequestEndBlock, RequestInfo,
    ResponseBeginBlock, ResponseCheckTx, ResponseCommit, ResponseDeliverTx, ResponseEndBlock,
    ResponseInfo,
};
pub use tendermint_proto::types::Header as BlockHeader;

use crate::envelope::Status;

/// Handlers the consensus engine invokes on the ordering side
///
/// Calls arrive one at a time from a single engine connection, so
/// mutating handlers take `&mut self` and need no interior locking.
pub trait Application: Send {
    /// Report the last committed height
    fn info(&self, request: RequestInfo) -> ResponseInfo;

    /// Open a pending block for the header's height
    fn begin_block(&mut self, request: RequestBeginBlock) -> ResponseBeginBlock;

    /// Validate a transaction without changing any state
    fn check_tx(&self, request: RequestCheckTx) -> ResponseCheckTx;

    /// Accept a transaction into the current block
    fn deliver_tx(&mut self, request: RequestDeliverTx) -> ResponseDeliverTx;

    /// Close the block at `request.height`
    fn end_block(&mut self, request: RequestEndBlock) -> ResponseEndBlock;

    /// Persist every closed block
    fn commit(&mut self) -> ResponseCommit;
}

/// Whether a response code is [`Status::Success`]
pub fn is_success(code: u32) -> bool {
    code == Status::Success.code()
}

/// CheckTx response carrying `status`
pub fn check_tx_response(status: Status, log: impl Into<String>) -> ResponseCheckTx {
    ResponseCheckTx {
        code: status.code(),
        log: log.into(),
        ..Default::default()
    }
}

/// DeliverTx response carrying `status`
pub fn deliver_tx_response(status: Status, log: impl Into<String>) -> ResponseDeliverTx {
    ResponseDeliverTx {
        code: status.code(),
        log: log.into(),
        ..Default::default()
    }
}

/// BeginBlock request opening `height` of `chain_id`
pub fn begin_block_request(chain_id: &str, height: u64) -> RequestBeginBlock {
    RequestBeginBlock {
        header: Some(BlockHeader {
            chain_id: chain_id.to_string(),
            height: to_engine_height(height),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Ledger height as carried on the wire
pub fn to_engine_height(height: u64) -> i64 {
    i64::try_from(height).unwrap_or(i64::MAX)
}

/// Wire height as a ledger height; `None` when negative
pub fn from_engine_height(height: i64) -> Option<u64> {
    u64::try_from(height).ok()
}
