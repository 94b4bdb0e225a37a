//! Domain error types.

/// Top-level error type for tradesim.
#[derive(Debug, thiserror::Error)]
pub enum TradesimError {
    #[error("invalid configuration {field}: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TradesimError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        TradesimError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn invalid_config(field: &str, reason: impl Into<String>) -> Self {
        TradesimError::InvalidConfiguration {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&TradesimError> for std::process::ExitCode {
    fn from(err: &TradesimError) -> Self {
        let code: u8 = match err {
            TradesimError::Io(_) => 1,
            TradesimError::InvalidConfiguration { .. }
            | TradesimError::ConfigParse { .. }
            | TradesimError::ConfigMissing { .. } => 2,
            TradesimError::Data { .. } => 3,
            TradesimError::InvalidInput { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
