pub mod app;
pub mod domain;
pub mod error;
pub mod infra;
pub mod storage;

// Convenience re-exports (keeps call-sites clean)
pub use app::{BatchCoordinator, BatchReport, IngestionOutcome, OutcomeStatus, TransactionalWriter};
pub use domain::{Document, ForeignKeyDeriver, IngestionGuard, Node, RelationalMapper, Scalar};
pub use error::{BatchError, IngestError};
pub use infra::config::IngestConfig;
pub use infra::source::{DocumentSource, LocalDirSource, MemorySource};
pub use storage::{MemorySession, PgSession, Session};
