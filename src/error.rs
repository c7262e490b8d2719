use std::path::PathBuf;

/// Errors surfaced by the decomposition pipeline.
///
/// Every variant carries enough context (which array, which constraint, which
/// file) to debug a failing fit without re-running it.
#[derive(Debug, thiserror::Error)]
pub enum SedError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unknown filter '{0}'")]
    UnknownFilter(String),
    #[error("resource error: {0}")]
    Resource(String),
    #[error(
        "filter {filter} passband [{lo:.3}, {hi:.3}] um does not overlap \
         the redshifted model grid [{grid_lo:.3}, {grid_hi:.3}] um"
    )]
    FilterOutOfRange {
        filter: String,
        lo: f64,
        hi: f64,
        grid_lo: f64,
        grid_hi: f64,
    },
    #[error("failed to access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("numerical failure: {0}")]
    Numerical(String),
    #[error("insufficient data: {0}")]
    InsufficientData(String),
}

impl SedError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn resource(message: impl Into<String>) -> Self {
        Self::Resource(message.into())
    }

    pub fn numerical(message: impl Into<String>) -> Self {
        Self::Numerical(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for the binary.
    ///
    /// 2 = bad input or resources, 3 = not enough data to fit anything,
    /// 4 = numerical failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidInput(_)
            | Self::UnknownFilter(_)
            | Self::Resource(_)
            | Self::FilterOutOfRange { .. }
            | Self::Io { .. }
            | Self::Csv(_)
            | Self::Json(_) => 2,
            Self::InsufficientData(_) => 3,
            Self::Numerical(_) => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_taxonomy() {
        assert_eq!(SedError::invalid("x").exit_code(), 2);
        assert_eq!(SedError::UnknownFilter("FOO".into()).exit_code(), 2);
        assert_eq!(SedError::InsufficientData("x".into()).exit_code(), 3);
        assert_eq!(SedError::numerical("x").exit_code(), 4);
    }

    #[test]
    fn invalid_input_message_is_specific() {
        let err = SedError::invalid("photometry wavelengths must be in ascending order");
        assert!(err.to_string().contains("ascending order"));
    }
}
