//! Query execution with per-scenario result storage
//!
//! A [`QueryCache`] is built once per scenario around whatever connection
//! the scenario managed to open. With no connection it stays usable as a
//! value but every query fails with [`Error::ConnectionUnavailable`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::db::{DbClient, Params, Row};
use crate::{Error, Result};

/// A query result remembered under a caller-chosen key
#[derive(Debug, Clone, Serialize)]
pub struct StoredResult {
    pub query: String,
    pub params: Params,
    pub rows: Vec<Row>,
    pub timestamp: DateTime<Utc>,
}

/// Database wrapper storing results by key
pub struct QueryCache {
    client: Option<Arc<dyn DbClient>>,
    results: HashMap<String, StoredResult>,
    key_counter: u64,
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("connected", &self.is_connected())
            .field("stored", &self.results.len())
            .finish()
    }
}

impl QueryCache {
    pub fn new(client: Option<Arc<dyn DbClient>>) -> Self {
        Self {
            client,
            results: HashMap::new(),
            key_counter: 0,
        }
    }

    fn client(&self) -> Result<&Arc<dyn DbClient>> {
        self.client.as_ref().ok_or(Error::ConnectionUnavailable)
    }

    /// Execute a query and store its rows under `key`
    pub async fn execute_and_store(
        &mut self,
        key: &str,
        query: &str,
        params: Params,
    ) -> Result<Vec<Row>> {
        let rows = match self.client()?.query(query, &params).await {
            Ok(rows) => rows,
            Err(err) => {
                error!("Query failed for key \"{}\": {}", key, err);
                return Err(Error::Query {
                    key: key.to_string(),
                    reason: err.to_string(),
                });
            }
        };
        self.results.insert(
            key.to_string(),
            StoredResult {
                query: query.to_string(),
                params,
                rows: rows.clone(),
                timestamp: Utc::now(),
            },
        );
        Ok(rows)
    }

    /// Execute a query without storing the result
    pub async fn execute(&self, query: &str, params: &Params) -> Result<Vec<Row>> {
        self.client()?.query(query, params).await.map_err(|err| {
            error!("Query execution failed: {}", err);
            err
        })
    }

    /// Execute a query and return its first row
    pub async fn execute_for_one(&self, query: &str, params: &Params) -> Result<Option<Row>> {
        Ok(self.execute(query, params).await?.into_iter().next())
    }

    /// Run an insert and return the first produced row (generated keys)
    pub async fn insert(&self, query: &str, params: &Params) -> Result<Option<Row>> {
        self.execute_for_one(query, params).await
    }

    /// Run an update and return the number of rows it produced
    ///
    /// Counts returned rows, so statements should return the affected rows
    /// (`RETURNING` / `OUTPUT`) for a meaningful count.
    pub async fn update(&self, query: &str, params: &Params) -> Result<usize> {
        let rows = self.client()?.query(query, params).await.map_err(|err| {
            error!("Update query failed: {}", err);
            err
        })?;
        Ok(rows.len())
    }

    pub async fn delete(&self, query: &str, params: &Params) -> Result<usize> {
        self.update(query, params).await
    }

    pub fn result(&self, key: &str) -> Option<&StoredResult> {
        self.results.get(key)
    }

    /// Like [`QueryCache::result`] but a missing key is an error
    pub fn require_result(&self, key: &str) -> Result<&StoredResult> {
        self.result(key)
            .ok_or_else(|| Error::ResultNotFound(key.to_string()))
    }

    pub fn result_rows(&self, key: &str) -> Option<&[Row]> {
        self.results.get(key).map(|r| r.rows.as_slice())
    }

    pub fn result_row(&self, key: &str, index: usize) -> Option<&Row> {
        self.result_rows(key).and_then(|rows| rows.get(index))
    }

    pub fn result_value(&self, key: &str, column: &str, row: usize) -> Option<&Value> {
        self.result_row(key, row).and_then(|r| r.get(column))
    }

    /// Forget every stored result and restart generated keys
    pub fn clear_results(&mut self) {
        self.results.clear();
        self.key_counter = 0;
    }

    pub fn clear_result(&mut self, key: &str) {
        self.results.remove(key);
    }

    /// Snapshot of all stored results
    pub fn all_results(&self) -> HashMap<String, StoredResult> {
        self.results.clone()
    }

    pub fn has_result(&self, key: &str) -> bool {
        self.results.contains_key(key)
    }

    /// Produce `prefix_1`, `prefix_2`, ...
    pub fn generate_result_key(&mut self, prefix: &str) -> String {
        self.key_counter += 1;
        format!("{}_{}", prefix, self.key_counter)
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Close the underlying connection, if any
    pub async fn close(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            client.close().await?;
            info!("Query cache connection closed");
        }
        Ok(())
    }
}
