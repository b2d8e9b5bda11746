//! Plain data types shared by the read cache, the scheduler and the
//! transaction pipeline.

mod call;
mod call_result;
mod call_state;
mod chain_id;
mod transaction;

pub use call::{Call, CallKey, DEFAULT_GAS_REQUIRED, InvalidCallError};
pub use call_result::CallResult;
pub use call_state::{CallState, DecodeError};
pub use chain_id::ChainId;
pub use transaction::{
    PendingTransaction, TransactionInfo, TransactionKind, TxHash, TxPayload, TxReceipt,
};
