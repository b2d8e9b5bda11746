#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required secret: {0}")]
    MissingSecret(String),

    #[error("Invalid chain configuration: {0}")]
    InvalidConfig(String),
}
