use std::time::Duration;

use metrics::{counter, histogram};

pub fn record_task_run(task: &str, status: &str, duration: Duration) {
    counter!(
        "dapp_task_runs_total",
        "task" => task.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "dapp_task_duration_seconds",
        "task" => task.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());
}
