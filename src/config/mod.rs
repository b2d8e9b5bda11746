mod defaults;
mod error;
mod loader;
mod raw;

pub use error::ConfigError;
pub(crate) use loader::{current_env, initialize_configuration};
pub(crate) use raw::{Config, ConfigRaw, TrackerConfig, WatchedCall, WatchedCallConfig};
