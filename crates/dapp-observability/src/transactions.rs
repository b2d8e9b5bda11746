use std::time::Duration;

use metrics::{counter, gauge, histogram};

pub fn record_blockchain_tx_stage(
    chain_id: u64,
    kind: &str,
    stage: &str,
    status: &str,
    duration: Duration,
) {
    counter!(
        "dapp_blockchain_tx_stage_total",
        "chain_id" => chain_id.to_string(),
        "kind" => kind.to_string(),
        "stage" => stage.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "dapp_blockchain_tx_stage_duration_seconds",
        "chain_id" => chain_id.to_string(),
        "kind" => kind.to_string(),
        "stage" => stage.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_pending_tx_finalized(chain_id: u64, status: &str, pending_for: Duration) {
    counter!(
        "dapp_pending_tx_finalized_total",
        "chain_id" => chain_id.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "dapp_pending_tx_confirmation_seconds",
        "chain_id" => chain_id.to_string(),
        "status" => status.to_string()
    )
    .record(pending_for.as_secs_f64());
}

pub fn record_pending_tx_snapshot(chain_id: u64, pending: usize) {
    gauge!(
        "dapp_pending_tx_open",
        "chain_id" => chain_id.to_string()
    )
    .set(pending as f64);
}
