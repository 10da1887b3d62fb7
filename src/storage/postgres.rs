//! Postgres-backed session.

use crate::domain::mapping::InsertStatement;
use crate::domain::node::Scalar;
use crate::storage::{CountQuery, Session};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

/// Runs statements on a pool, inside the open transaction when there is one.
pub struct PgSession {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgSession {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, tx: None }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn bind_scalar<'q>(query: Query<'q, Postgres, PgArguments>, value: &Scalar) -> Query<'q, Postgres, PgArguments> {
    match value {
        Scalar::Null => query.bind(None::<String>),
        Scalar::Bool(b) => query.bind(*b),
        Scalar::Int(i) => query.bind(*i),
        Scalar::Float(f) => query.bind(*f),
        Scalar::Text(s) => query.bind(s.clone()),
    }
}

#[async_trait]
impl Session for PgSession {
    async fn begin(&mut self) -> Result<()> {
        if self.tx.is_some() {
            return Err(anyhow::anyhow!("a transaction is already in progress"));
        }
        self.tx = Some(self.pool.begin().await?);
        debug!("BEGIN");
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| anyhow::anyhow!("commit without an open transaction"))?;
        tx.commit().await?;
        debug!("COMMIT");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| anyhow::anyhow!("rollback without an open transaction"))?;
        tx.rollback().await?;
        debug!("ROLLBACK");
        Ok(())
    }

    async fn insert(&mut self, statement: &InsertStatement) -> Result<u64> {
        let sql = statement.sql();
        debug!(sql = %sql, params = ?statement.values, "execute");

        let mut query = sqlx::query(&sql);
        for value in &statement.values {
            query = bind_scalar(query, value);
        }

        let result = match self.tx.as_mut() {
            Some(tx) => query.execute(tx.as_mut()).await?,
            None => query.execute(&self.pool).await?,
        };
        Ok(result.rows_affected())
    }

    async fn count(&mut self, query: &CountQuery) -> Result<i64> {
        let sql = query.sql();
        debug!(sql = %sql, param = %query.value, "query");

        let q = bind_scalar(sqlx::query(&sql), &query.value);
        let row = match self.tx.as_mut() {
            Some(tx) => q.fetch_one(tx.as_mut()).await?,
            None => q.fetch_one(&self.pool).await?,
        };
        let count: i64 = sqlx::Row::try_get(&row, "count")?;
        Ok(count)
    }
}
