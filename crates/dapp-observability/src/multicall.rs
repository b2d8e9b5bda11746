use std::time::Duration;

use metrics::{counter, gauge, histogram};

pub fn record_multicall_batch(chain_id: u64, status: &str, calls: usize, duration: Duration) {
    counter!(
        "dapp_multicall_batch_total",
        "chain_id" => chain_id.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "dapp_multicall_batch_duration_seconds",
        "chain_id" => chain_id.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());
    histogram!(
        "dapp_multicall_batch_calls",
        "chain_id" => chain_id.to_string(),
        "status" => status.to_string()
    )
    .record(calls as f64);
}

pub fn record_multicall_tick(chain_id: u64, outdated_keys: usize, batches: usize) {
    histogram!(
        "dapp_multicall_tick_outdated_keys",
        "chain_id" => chain_id.to_string()
    )
    .record(outdated_keys as f64);
    histogram!(
        "dapp_multicall_tick_batches",
        "chain_id" => chain_id.to_string()
    )
    .record(batches as f64);
}

pub fn record_multicall_listeners(chain_id: u64, listened_keys: usize) {
    gauge!(
        "dapp_multicall_listened_keys",
        "chain_id" => chain_id.to_string()
    )
    .set(listened_keys as f64);
}
