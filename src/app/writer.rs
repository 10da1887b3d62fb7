//! Per-document transactional envelope.

use crate::domain::mapping::{InsertStatement, RelationalMapper};
use crate::domain::Document;
use crate::error::IngestError;
use crate::storage::Session;
use tracing::{debug, warn};

/// Writes one document's rows inside a single transaction.
///
/// Either every row of the document commits or none does. On failure the
/// original error is returned unchanged after the rollback.
pub struct TransactionalWriter<'a, Q: Session + ?Sized> {
    session: &'a mut Q,
    mapper: &'a RelationalMapper,
    root_element: &'a str,
    root_table: &'a str,
}

impl<'a, Q: Session + ?Sized> TransactionalWriter<'a, Q> {
    pub fn new(
        session: &'a mut Q,
        mapper: &'a RelationalMapper,
        root_element: &'a str,
        root_table: &'a str,
    ) -> Self {
        Self {
            session,
            mapper,
            root_element,
            root_table,
        }
    }

    /// Maps the document's root element into the root table and persists the
    /// rows. Returns the rows inserted.
    ///
    /// Every statement is built before the transaction opens, so an invalid
    /// table or column name fails the document without running any SQL.
    pub async fn ingest(&mut self, document: &Document) -> Result<usize, IngestError> {
        let body = document.body(self.root_element)?;
        let file_name = document.file_name(self.root_element)?;
        let document_id = file_name.as_str();

        let statements = self
            .mapper
            .map(body, self.root_table, document_id, None)
            .iter()
            .map(|row| row.to_insert())
            .collect::<Result<Vec<_>, _>>()?;

        self.session.begin().await.map_err(IngestError::transaction)?;

        match self.write_all(&statements).await {
            Ok(inserted) => {
                self.session.commit().await.map_err(IngestError::transaction)?;
                debug!(document = document_id, rows = inserted, "rows written");
                Ok(inserted)
            }
            Err(err) => {
                if let Err(rollback_err) = self.session.rollback().await {
                    warn!(document = document_id, error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn write_all(&mut self, statements: &[InsertStatement]) -> Result<usize, IngestError> {
        for statement in statements {
            self.session
                .insert(statement)
                .await
                .map_err(|e| IngestError::insert(statement.sql(), e))?;
        }
        Ok(statements.len())
    }
}
