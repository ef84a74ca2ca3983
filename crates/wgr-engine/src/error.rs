// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Rejections the engine can produce. None of them imply a store mutation:
/// every check runs before any derived record is handed to the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Missing or malformed input field.
    Validation { field: String, reason: String },
    /// No pending game/record matches the supplied criteria.
    NotFound { what: String },
    /// The reported winner matched none, or all, of the matched records.
    Partition {
        winner: String,
        matched: usize,
        winners: usize,
    },
}

impl LedgerError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::validation(field, "required field is missing")
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Stable machine-readable tag used by the HTTP layer.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Partition { .. } => "partition",
        }
    }
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation { field, reason } => {
                write!(f, "invalid input: {field}: {reason}")
            }
            Self::NotFound { what } => write!(f, "no matching {what}"),
            Self::Partition {
                winner,
                matched,
                winners,
            } => write!(
                f,
                "winner '{winner}' matched {winners} of {matched} records; \
                 need at least one winner and one loser"
            ),
        }
    }
}

impl std::error::Error for LedgerError {}
