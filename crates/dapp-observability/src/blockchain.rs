use std::time::Duration;

use metrics::{counter, gauge, histogram};

pub fn record_blockchain_rpc_call(chain_id: u64, operation: &str, status: &str, duration: Duration) {
    counter!(
        "dapp_blockchain_rpc_total",
        "chain_id" => chain_id.to_string(),
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "dapp_blockchain_rpc_duration_seconds",
        "chain_id" => chain_id.to_string(),
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_blockchain_rpc_retry(chain_id: u64, operation: &str) {
    counter!(
        "dapp_blockchain_rpc_retries_total",
        "chain_id" => chain_id.to_string(),
        "operation" => operation.to_string()
    )
    .increment(1);
}

pub fn record_block_observed(chain_id: u64, block_number: u64) {
    gauge!(
        "dapp_blockchain_latest_block",
        "chain_id" => chain_id.to_string()
    )
    .set(block_number as f64);
}
