//! Exactly-once check against the ingestion ledger.

use crate::domain::mapping::FILE_NAME_COLUMN;
use crate::domain::node::Scalar;
use crate::error::IngestError;
use crate::storage::{CountQuery, Session};

/// The ledger is the root table: every ingested document leaves exactly one
/// root row keyed by its `fileName`.
///
/// The lookup and the later ledger insert are not atomic with each other, so two
/// concurrent batches can still ingest the same document twice.
#[derive(Debug, Clone)]
pub struct IngestionGuard {
    ledger_table: String,
    ledger_column: String,
}

impl IngestionGuard {
    pub fn new(ledger_table: impl Into<String>) -> Self {
        Self {
            ledger_table: ledger_table.into(),
            ledger_column: FILE_NAME_COLUMN.to_string(),
        }
    }

    pub fn ledger_table(&self) -> &str {
        &self.ledger_table
    }

    /// How many times `document_id` was ingested before. Zero means proceed.
    pub async fn already_ingested<Q>(&self, session: &mut Q, document_id: &str) -> Result<i64, IngestError>
    where
        Q: Session + ?Sized,
    {
        let query = CountQuery {
            table: self.ledger_table.clone(),
            column: self.ledger_column.clone(),
            value: Scalar::Text(document_id.to_string()),
        };
        session
            .count(&query)
            .await
            .map_err(IngestError::ledger)
    }
}
