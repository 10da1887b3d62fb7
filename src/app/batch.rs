//! Batch coordinator: runs every document through guard and writer, isolates
//! per-document failures and folds the outcomes into one report.

use crate::app::writer::TransactionalWriter;
use crate::domain::{Document, IngestionGuard, RelationalMapper};
use crate::error::{BatchError, IngestError};
use crate::infra::config::IngestConfig;
use crate::infra::source::DocumentSource;
use crate::infra::xml;
use crate::storage::Session;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::{error, info, info_span, warn, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Ingested,
    Skipped { times: i64 },
    Failed,
}

/// Result of one document within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionOutcome {
    pub document_id: String,
    pub rows_inserted: usize,
    /// Empty on success; otherwise the skip reason or the error.
    pub message: String,
    pub status: OutcomeStatus,
}

impl IngestionOutcome {
    fn from_result(document_id: &str, result: Result<DocumentResult, IngestError>) -> Self {
        let (rows_inserted, message, status) = match result {
            Ok(DocumentResult::Ingested(rows)) => (rows, String::new(), OutcomeStatus::Ingested),
            Ok(DocumentResult::AlreadyIngested(times)) => (
                0,
                format!("file was already ingested times={}", times),
                OutcomeStatus::Skipped { times },
            ),
            Err(err) => (0, err.to_string(), OutcomeStatus::Failed),
        };
        Self {
            document_id: document_id.to_string(),
            rows_inserted,
            message,
            status,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == OutcomeStatus::Failed
    }
}

impl fmt::Display for IngestionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} rows | {}", self.document_id, self.rows_inserted, self.message)
    }
}

/// Outcomes of one batch run, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<IngestionOutcome>,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, OutcomeStatus::Skipped { .. }))
            .count()
    }

    pub fn rows_inserted(&self) -> usize {
        self.outcomes.iter().map(|o| o.rows_inserted).sum()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Results:")?;
        for outcome in &self.outcomes {
            writeln!(f, "{}", outcome)?;
        }
        write!(
            f,
            "{} documents, {} rows inserted, {} skipped, {} failed",
            self.outcomes.len(),
            self.rows_inserted(),
            self.skipped(),
            self.failed()
        )
    }
}

enum DocumentResult {
    Ingested(usize),
    AlreadyIngested(i64),
}

/// Drives a batch over a document source and a SQL session.
///
/// Documents are processed strictly one after another on the one session; each
/// gets its own transaction.
pub struct BatchCoordinator<S, Q> {
    config: IngestConfig,
    source: S,
    session: Q,
    mapper: RelationalMapper,
    guard: IngestionGuard,
}

impl<S: DocumentSource, Q: Session> BatchCoordinator<S, Q> {
    pub fn new(config: IngestConfig, source: S, session: Q) -> Self {
        let guard = IngestionGuard::new(config.root_table.clone());
        Self {
            config,
            source,
            session,
            mapper: RelationalMapper::default(),
            guard,
        }
    }

    pub fn with_mapper(mut self, mapper: RelationalMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn session(&self) -> &Q {
        &self.session
    }

    /// Lists every document in the source and runs the batch over them.
    pub async fn run(&mut self) -> Result<BatchReport, BatchError> {
        let ids = self
            .source
            .list_documents()
            .await
            .map_err(|e| BatchError::Listing(e.into()))?;
        info!(documents = ids.len(), "processing");
        self.run_batch(&ids).await
    }

    /// Ingests `document_ids` in order. One document's failure never stops the
    /// others; the batch fails afterwards if any document failed.
    pub async fn run_batch(&mut self, document_ids: &[String]) -> Result<BatchReport, BatchError> {
        let started_at = Utc::now();
        let mut outcomes = Vec::with_capacity(document_ids.len());

        for document_id in document_ids {
            let span = info_span!("document", id = %document_id);
            let result = self.ingest_one(document_id).instrument(span.clone()).await;
            let outcome = IngestionOutcome::from_result(document_id, result);

            span.in_scope(|| match outcome.status {
                OutcomeStatus::Ingested => info!(rows = outcome.rows_inserted, "committed"),
                OutcomeStatus::Skipped { times } => warn!(times, "already ingested, skipping"),
                OutcomeStatus::Failed => error!(error = %outcome.message, "document failed"),
            });
            outcomes.push(outcome);
        }

        let report = BatchReport {
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        let failed = report.failed();
        info!(
            documents = report.outcomes.len(),
            rows = report.rows_inserted(),
            skipped = report.skipped(),
            failed,
            elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
            "batch finished"
        );

        if failed > 0 {
            return Err(BatchError::DocumentsFailed { failed, report });
        }
        Ok(report)
    }

    async fn load(&self, document_id: &str) -> Result<Document, IngestError> {
        let content = self
            .source
            .read_document(document_id)
            .await
            .map_err(IngestError::read)?;
        if content.is_empty() {
            return Err(IngestError::EmptyDocument);
        }
        let root = xml::parse(&content)?;
        Ok(Document::new(document_id, content, root))
    }

    async fn ingest_one(&mut self, document_id: &str) -> Result<DocumentResult, IngestError> {
        let document = self.load(document_id).await?;
        let file_name = document.file_name(&self.config.root_element)?;

        let times = self.guard.already_ingested(&mut self.session, &file_name).await?;
        if times > 0 {
            return Ok(DocumentResult::AlreadyIngested(times));
        }

        let mut writer = TransactionalWriter::new(
            &mut self.session,
            &self.mapper,
            &self.config.root_element,
            &self.config.root_table,
        );
        let rows = writer.ingest(&document).await?;
        Ok(DocumentResult::Ingested(rows))
    }
}
