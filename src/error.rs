//! Error types for document and batch ingestion.

use crate::app::batch::BatchReport;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a single document. Always document-fatal: the document's
/// transaction is rolled back and the batch moves on.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Retrieval failed; keeps the collaborator's message.
    #[error("{0}")]
    Read(BoxError),

    #[error("file is empty")]
    EmptyDocument,

    #[error("XML parse error: {0}")]
    Parse(String),

    #[error("root element `{0}` is missing or not an element with children")]
    MissingRoot(String),

    #[error("root element `{0}` has no fileName")]
    MissingFileName(String),

    #[error("invalid SQL identifier `{0}`")]
    InvalidIdentifier(String),

    /// A row insert failed; carries the statement that was executed.
    #[error("{source}: {statement}")]
    Insert {
        statement: String,
        #[source]
        source: BoxError,
    },

    #[error("ledger lookup failed: {0}")]
    Ledger(BoxError),

    #[error("transaction control failed: {0}")]
    Transaction(BoxError),
}

/// Flattens an `anyhow` chain into one message so the root cause survives
/// `Display`.
fn with_causes(err: anyhow::Error) -> BoxError {
    format!("{:#}", err).into()
}

impl IngestError {
    pub fn read(err: anyhow::Error) -> Self {
        IngestError::Read(with_causes(err))
    }

    pub fn insert(statement: impl Into<String>, err: anyhow::Error) -> Self {
        IngestError::Insert {
            statement: statement.into(),
            source: with_causes(err),
        }
    }

    pub fn ledger(err: anyhow::Error) -> Self {
        IngestError::Ledger(with_causes(err))
    }

    pub fn transaction(err: anyhow::Error) -> Self {
        IngestError::Transaction(with_causes(err))
    }
}

/// Failure of a whole batch run.
#[derive(Error, Debug)]
pub enum BatchError {
    /// Enumeration failed before any document was attempted.
    #[error("failed to list documents: {0}")]
    Listing(BoxError),

    /// One or more documents failed. The message is the complete report.
    #[error("{report}")]
    DocumentsFailed { failed: usize, report: BatchReport },
}

impl BatchError {
    pub fn report(&self) -> Option<&BatchReport> {
        match self {
            BatchError::Listing(_) => None,
            BatchError::DocumentsFailed { report, .. } => Some(report),
        }
    }
}
