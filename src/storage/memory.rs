//! In-memory session used for dry runs and tests.
//!
//! Tables spring into existence on first insert. Inserts made inside a
//! transaction are staged and only become visible to readers of the committed
//! state on `commit`; `rollback` discards them.

use crate::domain::mapping::InsertStatement;
use crate::domain::node::Scalar;
use crate::storage::{CountQuery, Session};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

pub type StoredRow = Vec<(String, Scalar)>;

type InsertFault = Box<dyn Fn(&InsertStatement, usize) -> bool + Send + Sync>;

#[derive(Default)]
pub struct MemorySession {
    tables: BTreeMap<String, Vec<StoredRow>>,
    pending: Option<Vec<(String, StoredRow)>>,
    unique: HashSet<(String, String)>,
    faults: Vec<InsertFault>,
    /// Inserts attempted since the last `begin`.
    tx_inserts: usize,
    dry_run: bool,
    statements: Vec<String>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session that also logs every statement at info level.
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    /// Rejects inserts that would duplicate a value of `table.column`.
    pub fn with_unique(mut self, table: &str, column: &str) -> Self {
        self.unique.insert((table.to_string(), column.to_string()));
        self
    }

    /// Fails the `n`-th insert (1-based) of every transaction.
    pub fn fail_on_nth_insert(mut self, n: usize) -> Self {
        self.faults.push(Box::new(move |_, idx| idx == n));
        self
    }

    /// Fails inserts for which `predicate` holds.
    pub fn fail_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&InsertStatement) -> bool + Send + Sync + 'static,
    {
        self.faults.push(Box::new(move |stmt, _| predicate(stmt)));
        self
    }

    /// Committed rows of `table`.
    pub fn rows(&self, table: &str) -> &[StoredRow] {
        self.tables.get(table).map(|r| r.as_slice()).unwrap_or(&[])
    }

    /// Committed rows, across all tables, whose `column` equals `value`.
    pub fn count_where(&self, column: &str, value: &str) -> usize {
        self.tables
            .values()
            .flatten()
            .filter(|row| matches_text(row, column, value))
            .count()
    }

    pub fn total_rows(&self) -> usize {
        self.tables.values().map(|r| r.len()).sum()
    }

    /// Every statement executed so far, in order.
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn in_transaction(&self) -> bool {
        self.pending.is_some()
    }

    fn record(&mut self, statement: String) {
        if self.dry_run {
            info!("{}", statement);
        } else {
            debug!("{}", statement);
        }
        self.statements.push(statement);
    }

    fn visible_rows<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a StoredRow> + 'a {
        let staged = self
            .pending
            .iter()
            .flatten()
            .filter(move |(t, _)| t == table)
            .map(|(_, row)| row);
        self.rows(table).iter().chain(staged)
    }

    fn check_unique(&self, statement: &InsertStatement, row: &StoredRow) -> Result<()> {
        for (column, value) in row {
            if !self.unique.contains(&(statement.table.clone(), column.clone())) {
                continue;
            }
            let duplicate = self
                .visible_rows(&statement.table)
                .any(|existing| existing.iter().any(|(c, v)| c == column && v == value));
            if duplicate {
                return Err(anyhow::anyhow!(
                    "duplicate key value violates unique constraint on {}.{} ({})",
                    statement.table,
                    column,
                    value
                ));
            }
        }
        Ok(())
    }
}

fn matches_text(row: &StoredRow, column: &str, value: &str) -> bool {
    row.iter().any(|(c, v)| c == column && v.to_string() == value)
}

#[async_trait]
impl Session for MemorySession {
    async fn begin(&mut self) -> Result<()> {
        if self.pending.is_some() {
            return Err(anyhow::anyhow!("a transaction is already in progress"));
        }
        self.record("BEGIN TRANSACTION".to_string());
        self.pending = Some(Vec::new());
        self.tx_inserts = 0;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let staged = self
            .pending
            .take()
            .ok_or_else(|| anyhow::anyhow!("commit without an open transaction"))?;
        self.record("COMMIT".to_string());
        for (table, row) in staged {
            self.tables.entry(table).or_default().push(row);
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.pending
            .take()
            .ok_or_else(|| anyhow::anyhow!("rollback without an open transaction"))?;
        self.record("ROLLBACK".to_string());
        Ok(())
    }

    async fn insert(&mut self, statement: &InsertStatement) -> Result<u64> {
        self.tx_inserts += 1;
        let sql = statement.sql();
        let params: Vec<String> = statement.values.iter().map(|v| v.to_string()).collect();
        self.record(format!("{} -- [{}]", sql, params.join(", ")));

        if self.faults.iter().any(|fault| fault(statement, self.tx_inserts)) {
            return Err(anyhow::anyhow!("injected failure on insert into {}", statement.table));
        }

        let row: StoredRow = statement
            .columns
            .iter()
            .cloned()
            .zip(statement.values.iter().cloned())
            .collect();
        self.check_unique(statement, &row)?;

        match self.pending.as_mut() {
            Some(staged) => staged.push((statement.table.clone(), row)),
            None => self.tables.entry(statement.table.clone()).or_default().push(row),
        }
        Ok(1)
    }

    async fn count(&mut self, query: &CountQuery) -> Result<i64> {
        self.record(format!("{} -- [{}]", query.sql(), query.value));
        let value = query.value.to_string();
        let count = self
            .visible_rows(&query.table)
            .filter(|row| matches_text(row, &query.column, &value))
            .count();
        Ok(count as i64)
    }
}
