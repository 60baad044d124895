//! Domain error types.

/// Top-level error type for indexcast.
///
/// Every failure is terminal for the current run: there is no retry or
/// partial-recovery path anywhere in the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum IndexcastError {
    #[error("fetch failed for {symbol}: {reason}")]
    Fetch { symbol: String, reason: String },

    #[error("empty response for {symbol}")]
    EmptyResponse { symbol: String },

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

    #[error("data store error: {reason}")]
    Store { reason: String },

    #[error("insufficient data: have {rows} usable rows, need {minimum}")]
    InsufficientData { rows: usize, minimum: usize },

    #[error("failed to load model artifact {path}: {reason}")]
    ArtifactLoad { path: String, reason: String },

    #[error("feature mismatch: {reason}")]
    FeatureMismatch { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&IndexcastError> for std::process::ExitCode {
    fn from(err: &IndexcastError) -> Self {
        let code: u8 = match err {
            IndexcastError::Io(_) => 1,
            IndexcastError::ConfigParse { .. }
            | IndexcastError::ConfigMissing { .. }
            | IndexcastError::ConfigInvalid { .. } => 2,
            IndexcastError::Fetch { .. }
            | IndexcastError::EmptyResponse { .. }
            | IndexcastError::Store { .. } => 3,
            IndexcastError::ArtifactLoad { .. } | IndexcastError::FeatureMismatch { .. } => 4,
            IndexcastError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
