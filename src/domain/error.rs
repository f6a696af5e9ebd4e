//! Domain error types.

/// Top-level error type for ethsignal.
#[derive(Debug, thiserror::Error)]
pub enum EthSignalError {
    #[error("insufficient history: have {have} points, need {need}")]
    InsufficientHistory { have: usize, need: usize },

    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("missing required column (accepted names: {})", accepted.join(", "))]
    MissingRequiredColumn { accepted: Vec<String> },

    #[error("price series is empty")]
    EmptySeries,

    #[error("initial cash must be positive, got {value}")]
    NegativeInitialCash { value: f64 },

    #[error("timestamp at index {index} is not after its predecessor")]
    UnorderedTimestamps { index: usize },

    #[error("invalid close price at index {index}: {value}")]
    InvalidPrice { index: usize, value: f64 },

    #[error("signal stream has {signals} entries but price series has {prices}")]
    SignalStreamMismatch { prices: usize, signals: usize },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("{source_name} data source error: {reason}")]
    DataSource { source_name: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EthSignalError {
    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        EthSignalError::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    pub(crate) fn data_source(source_name: &str, reason: impl Into<String>) -> Self {
        EthSignalError::DataSource {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&EthSignalError> for std::process::ExitCode {
    fn from(err: &EthSignalError) -> Self {
        let code: u8 = match err {
            EthSignalError::Io(_) => 1,
            EthSignalError::ConfigParse { .. }
            | EthSignalError::ConfigMissing { .. }
            | EthSignalError::ConfigInvalid { .. } => 2,
            EthSignalError::DataSource { .. } | EthSignalError::MissingRequiredColumn { .. } => 3,
            EthSignalError::InvalidConfiguration { .. }
            | EthSignalError::NegativeInitialCash { .. } => 4,
            EthSignalError::InsufficientHistory { .. }
            | EthSignalError::EmptySeries
            | EthSignalError::UnorderedTimestamps { .. }
            | EthSignalError::InvalidPrice { .. }
            | EthSignalError::SignalStreamMismatch { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
