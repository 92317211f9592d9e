//! Error types for stride.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpdaterError {
    /// Invalid static parameters, raised when an updater is constructed.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Required configuration was never supplied.
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    /// Parameters are valid but the deployment mode cannot honour them.
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    /// The state makes the operation undefined for this firing. Updaters
    /// absorb this and skip the firing.
    #[error("Degenerate state: {0}")]
    DegenerateState(String),

    /// A caller broke an internal contract.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("RON parse error: {0}")]
    Config(#[from] ron::error::SpannedError),

    #[error("RON serialization error: {0}")]
    Serialize(#[from] ron::Error),
}

impl UpdaterError {
    /// True for the configuration flavours raised at construction time.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            UpdaterError::Configuration(_) | UpdaterError::MissingParameter(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, UpdaterError>;
