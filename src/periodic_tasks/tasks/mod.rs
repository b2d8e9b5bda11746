pub(crate) mod block_watcher;
pub(crate) mod pending_expiry;
pub(crate) mod watched_calls;
