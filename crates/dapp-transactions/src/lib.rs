//! Write path: build a transaction, estimate (falling back to a simulated
//! call for the revert reason), submit, then track it until a receipt lands.

mod builder;
mod error;
mod executor;
mod tracker;

pub use builder::{ContractCall, build_call};
pub use error::{BuildError, TrackError, TxError};
pub use executor::{DEFAULT_GAS_MARGIN_BPS, TransactionExecutor, apply_gas_margin};
pub use tracker::{PendingTransactions, RECENT_WINDOW, check_interval_blocks};
