use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] stockwatch_core::ValidationError),

    #[error(transparent)]
    Config(#[from] stockwatch_core::ConfigError),

    #[error("no listing found for '{0}'")]
    SymbolNotFound(String),

    #[error("command error: {0}")]
    Command(String),

    #[error("{}", .0.user_message())]
    Provider(#[from] stockwatch_core::MarketDataError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Persistence(#[from] stockwatch_core::PersistenceError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Config(_) => 2,
            Self::SymbolNotFound(_) => 2,
            Self::Command(_) => 2,
            Self::Provider(_) => 3,
            Self::Serialization(_) => 4,
            Self::Persistence(_) => 10,
            Self::Io(_) => 10,
        }
    }
}
