//! Batched, block-driven contract reads.
//!
//! Feature code subscribes calls through [`ChainReader`]; the
//! [`ListenerRegistry`] ref-counts them; a per-chain [`RefreshScheduler`]
//! turns each new block into as few aggregated reads as the gas budget allows
//! and stores the raw results in the [`CallCache`]; [`ResultDecoder`]s turn
//! those results into [`CallState`](dapp_domain::CallState)s on demand.

mod cache;
mod decoder;
mod listeners;
mod reader;
mod scheduler;

pub use cache::{CachedCall, CallCache};
pub use decoder::{
    CallStates, ResultDecoder, SolCallDecoder, syncing_block_number, to_call_state,
    to_call_states,
};
pub use listeners::{CallSubscription, ListenerOptions, ListenerRegistry};
pub use reader::{CallsHandle, ChainReader};
pub use scheduler::{RefreshScheduler, SchedulerConfig, SchedulerPhase, TickOutcome};
