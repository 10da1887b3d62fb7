//! SQL sessions the ingestion core executes against.

pub mod memory;
pub mod postgres;

pub use memory::MemorySession;
pub use postgres::PgSession;

use crate::domain::mapping::InsertStatement;
use crate::domain::node::Scalar;
use async_trait::async_trait;

/// `SELECT count(*) FROM <table> WHERE <column> = $1`.
#[derive(Debug, Clone, PartialEq)]
pub struct CountQuery {
    pub table: String,
    pub column: String,
    pub value: Scalar,
}

impl CountQuery {
    pub fn sql(&self) -> String {
        format!("SELECT count(*) AS count FROM {} WHERE {} = $1", self.table, self.column)
    }
}

/// A single connection with explicit transaction control.
///
/// At most one transaction is open at a time; `begin` while one is open is an error.
/// Statements issued outside a transaction autocommit.
#[async_trait]
pub trait Session: Send {
    async fn begin(&mut self) -> anyhow::Result<()>;

    async fn commit(&mut self) -> anyhow::Result<()>;

    async fn rollback(&mut self) -> anyhow::Result<()>;

    /// Executes one INSERT; returns the number of affected rows.
    async fn insert(&mut self, statement: &InsertStatement) -> anyhow::Result<u64>;

    async fn count(&mut self, query: &CountQuery) -> anyhow::Result<i64>;
}
