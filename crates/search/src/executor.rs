//! Relational executor edge
//!
//! The executor is the only component that talks SQL to the database, and it
//! accepts nothing but a previously security-validated [`GeneratedQuery`].
//! The query's own row cap is re-applied here as a second line of defense.

use argonaut_common::db::DbPool;
use argonaut_common::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ConnectionTrait, DbBackend, QueryResult, Statement};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::translator::GeneratedQuery;

/// A result row as an ordered column-name/value mapping
pub type Row = Vec<(String, Value)>;

/// Relational execution seam
#[async_trait]
pub trait RelationalExecutor: Send + Sync {
    /// Execute a validated query and return its rows
    async fn execute(&self, query: &GeneratedQuery) -> Result<Vec<Row>>;
}

/// sea-orm backed executor
pub struct SeaOrmExecutor {
    db: Arc<DbPool>,
    row_cap: usize,
}

impl SeaOrmExecutor {
    pub fn new(db: Arc<DbPool>, row_cap: usize) -> Self {
        Self { db, row_cap }
    }

    /// Read one column as JSON, trying the types our templates produce
    fn value_at(row: &QueryResult, column: &str) -> Value {
        if let Ok(v) = row.try_get::<i64>("", column) {
            return Value::from(v);
        }
        if let Ok(v) = row.try_get::<f64>("", column) {
            return Value::from(v);
        }
        if let Ok(v) = row.try_get::<NaiveDate>("", column) {
            return Value::from(v.to_string());
        }
        if let Ok(v) = row.try_get::<DateTime<Utc>>("", column) {
            return Value::from(v.to_rfc3339());
        }
        if let Ok(v) = row.try_get::<String>("", column) {
            return Value::from(v);
        }
        if let Ok(v) = row.try_get::<bool>("", column) {
            return Value::from(v);
        }
        Value::Null
    }
}

#[async_trait]
impl RelationalExecutor for SeaOrmExecutor {
    async fn execute(&self, query: &GeneratedQuery) -> Result<Vec<Row>> {
        if !query.security_validated {
            return Err(AppError::UnsafeQuery {
                reason: "query was not security validated".to_string(),
            });
        }

        let values: Vec<sea_orm::Value> = query
            .bound_parameters
            .iter()
            .map(|p| p.value.to_sea_value())
            .collect();

        let rows = self
            .db
            .read()
            .query_all(Statement::from_sql_and_values(
                DbBackend::Postgres,
                &query.query_text,
                values,
            ))
            .await?;

        let mut results: Vec<Row> = rows
            .iter()
            .map(|row| {
                query
                    .result_columns
                    .iter()
                    .map(|column| (column.clone(), Self::value_at(row, column)))
                    .collect()
            })
            .collect();

        // Second line of defense for the row cap
        if results.len() > self.row_cap {
            results.truncate(self.row_cap);
        }

        debug!(rows = results.len(), kind = ?query.kind, "Structured query executed");

        Ok(results)
    }
}
