use thiserror::Error;

/// Where an offending embedding came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Gallery(usize),
    Probe,
    Input,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Gallery(i) => write!(f, "gallery entry {}", i),
            Source::Probe => f.write_str("probe"),
            Source::Input => f.write_str("input vector"),
        }
    }
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid embedding ({source_of}): expected {expected} values, got {actual}")]
    DimensionMismatch {
        source_of: Source,
        expected: usize,
        actual: usize,
    },

    #[error("invalid embedding ({source_of}): non-finite value at index {index}")]
    NonFinite { source_of: Source, index: usize },

    #[error("degenerate vector ({source_of}): {reason}")]
    DegenerateVector {
        source_of: Source,
        reason: &'static str,
    },
}

impl MatchError {
    /// True for both length and content problems with an embedding.
    pub fn is_invalid_embedding(&self) -> bool {
        matches!(
            self,
            MatchError::DimensionMismatch { .. } | MatchError::NonFinite { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, MatchError>;
