use wgr_engine::LedgerError;
use wgr_store::StoreError;

/// Everything a ledger operation can fail with.
#[derive(Debug)]
pub enum RuntimeError {
    /// Rejected before any mutation.
    Ledger(LedgerError),
    Store(StoreError),
    /// The journal could not be written; the operation did not proceed past
    /// the failed event.
    Journal(anyhow::Error),
}

impl RuntimeError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ledger(e) => e.kind(),
            Self::Store(e) => e.kind(),
            Self::Journal(_) => "journal_io",
        }
    }

    /// True for caller mistakes (bad input, nothing matched); false for
    /// failures of the ledger itself.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Ledger(_))
    }
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ledger(e) => write!(f, "{e}"),
            Self::Store(e) => write!(f, "{e}"),
            Self::Journal(e) => write!(f, "journal: {e:#}"),
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Ledger(e) => Some(e),
            Self::Store(e) => Some(e),
            Self::Journal(e) => Some(e.as_ref()),
        }
    }
}

impl From<LedgerError> for RuntimeError {
    fn from(e: LedgerError) -> Self {
        Self::Ledger(e)
    }
}

impl From<StoreError> for RuntimeError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}
