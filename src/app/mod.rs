pub mod batch;
pub mod writer;

pub use batch::{BatchCoordinator, BatchReport, IngestionOutcome, OutcomeStatus};
pub use writer::TransactionalWriter;
