//! Logger initialization module.
//!
//! Configures tracing-based logging with support for:
//! - Pretty (human-readable) or JSON output formats
//! - Configurable log levels via config file, overridden by `RUST_LOG`
//! - Optional Prometheus metrics export

mod config;

use std::net::SocketAddr;

pub(crate) use config::{LogFormat, LoggerConfig, TelemetryConfig, TelemetryMetricsConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global logger and metrics exporter.
///
/// The `RUST_LOG` environment variable takes precedence over the config file setting.
pub(crate) fn initialize(logger_config: &LoggerConfig, telemetry_config: &TelemetryConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logger_config.level));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match logger_config.format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init(),
    };
    if let Err(error) = installed {
        eprintln!("Global logger already installed: {error}");
    }

    initialize_metrics(&telemetry_config.metrics);
}

fn metrics_bind_address(metrics_config: &TelemetryMetricsConfig) -> Option<SocketAddr> {
    if !metrics_config.enabled {
        return None;
    }

    match metrics_config.bind_address.parse() {
        Ok(address) => Some(address),
        Err(error) => {
            tracing::warn!(
                bind_address = %metrics_config.bind_address,
                error = %error,
                "Invalid metrics bind address; metrics exporter disabled"
            );
            None
        }
    }
}

fn initialize_metrics(metrics_config: &TelemetryMetricsConfig) {
    let Some(bind_address) = metrics_bind_address(metrics_config) else {
        return;
    };

    match PrometheusBuilder::new()
        .with_http_listener(bind_address)
        .install()
    {
        Ok(()) => tracing::info!(
            bind_address = %bind_address,
            "Prometheus metrics exporter enabled"
        ),
        Err(error) => tracing::warn!(
            bind_address = %bind_address,
            error = %error,
            "Failed to initialize Prometheus metrics exporter"
        ),
    }
}
