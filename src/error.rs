//! Crate-wide error types.
//!
//! Every fallible operation returns [`BoostError`]. The variants follow the
//! failure classes a caller can act on: bad parameters, shape mismatches,
//! corrupt model bytes, unreachable storage and out-of-range indices.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = BoostError> = std::result::Result<T, E>;

// ============================================================================
// BoostError
// ============================================================================

/// Top-level error for all public operations.
#[derive(Debug, Error)]
pub enum BoostError {
    /// Invalid or contradictory parameters.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Feature or row count mismatch.
    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    Dimension {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Serialized model state is corrupt or unreadable.
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    /// Storage location could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Index outside a sequence (feature names, boosting rounds).
    #[error("index {index} out of range for {what} of length {len}")]
    Index {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// The grow collaborator failed; nothing from the round was committed.
    #[error("tree growth failed at round {round}: {source}")]
    Grow {
        round: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl BoostError {
    pub(crate) fn dimension(context: &'static str, expected: usize, actual: usize) -> Self {
        Self::Dimension {
            context,
            expected,
            actual,
        }
    }

    /// `n_rows * n_features` as a buffer length, rejecting overflow.
    pub(crate) fn buffer_len(
        context: &'static str,
        n_rows: usize,
        n_features: usize,
        actual: usize,
    ) -> Result<usize> {
        n_rows
            .checked_mul(n_features)
            .ok_or_else(|| Self::dimension(context, usize::MAX, actual))
    }
}

// ============================================================================
// ConfigError
// ============================================================================

/// Invalid or contradictory configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown objective '{0}'")]
    UnknownObjective(String),

    #[error("invalid value '{value}' for parameter '{key}': expected {expected}")]
    InvalidParam {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("unknown evaluation metric '{0}'")]
    UnknownMetric(String),

    #[error("early stopping requires a non-empty watch-list")]
    EarlyStoppingWithoutWatchList,

    #[error("metric '{metric}' requires labels but dataset '{dataset}' has none")]
    MissingLabels { dataset: String, metric: String },

    #[error("cannot change output groups from {current} to {requested} on a non-empty ensemble")]
    GroupChange { current: u32, requested: u32 },

    #[error("{0}")]
    Invalid(String),
}

// ============================================================================
// FormatError
// ============================================================================

/// Errors decoding or encoding the binary model format.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("not a treeboost model (bad magic bytes)")]
    NotAModel,

    #[error("model format {major}.{minor} is newer than this build supports")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("input truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    #[error("payload encoding failed: {0}")]
    Encoding(#[from] postcard::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = BoostError::dimension("inplace_predict", 4, 3);
        assert_eq!(
            err.to_string(),
            "dimension mismatch in inplace_predict: expected 4, got 3"
        );

        let err: BoostError = ConfigError::EarlyStoppingWithoutWatchList.into();
        assert!(err.to_string().contains("non-empty watch-list"));
    }

    #[test]
    fn format_errors_convert() {
        let err: BoostError = FormatError::NotAModel.into();
        assert!(matches!(err, BoostError::Format(FormatError::NotAModel)));
    }
}
