use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
///
/// Envelope statuses use 0, 3 and 4, so these stay clear of them.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] tickfuse_core::ValidationError),

    #[error("usage error: {0}")]
    Usage(String),

    #[error(transparent)]
    Config(#[from] tickfuse_core::ConfigError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Usage(_) => 2,
            Self::Config(_) => 5,
            Self::Serialization(_) => 6,
            Self::Io(_) => 10,
        }
    }
}
