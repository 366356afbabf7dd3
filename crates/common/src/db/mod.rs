//! Relational database access for step definitions
//!
//! Queries are written with `@name` placeholders and bound from an ordered
//! list of named parameters. Rows come back as ordered JSON objects so steps
//! can read columns by name regardless of backend.

mod pg;
mod sqlite;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::DbConfig;
use crate::Result;

pub use self::pg::{rewrite_named_params, PostgresClient};
pub use self::sqlite::SqliteClient;

/// One result row, keyed by column name in select order
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A bindable parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v.into())
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Named query parameters, kept in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params(Vec<(String, SqlValue)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter referenced as `@name` in the query text
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<SqlValue>) {
        let name = name.into();
        let name = name.trim_start_matches('@').to_string();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Which backend a client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Postgres,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Sqlite => f.write_str("sqlite"),
            Backend::Postgres => f.write_str("postgres"),
        }
    }
}

/// A live, closable database connection
#[async_trait]
pub trait DbClient: Send + Sync {
    /// Execute `sql` with named parameters and return the produced rows
    async fn query(&self, sql: &str, params: &Params) -> Result<Vec<Row>>;

    /// Release the connection. Closing twice is a no-op.
    async fn close(&self) -> Result<()>;

    fn backend(&self) -> Backend;
}

/// Opens database connections from configuration
#[async_trait]
pub trait DbConnector: Send + Sync {
    async fn connect(&self, config: &DbConfig) -> Result<Arc<dyn DbClient>>;
}

/// Picks a backend from the configured host
///
/// `sqlite:<path>` (or `sqlite::memory:`) opens SQLite; anything else is
/// treated as a Postgres server address.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConnector;

#[async_trait]
impl DbConnector for DefaultConnector {
    async fn connect(&self, config: &DbConfig) -> Result<Arc<dyn DbClient>> {
        let client: Arc<dyn DbClient> = match config.host.strip_prefix("sqlite:") {
            Some(path) => Arc::new(SqliteClient::open(path).await?),
            None => Arc::new(PostgresClient::connect(config).await?),
        };
        info!("Opened {} connection to {}", client.backend(), config.host);
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_replace_existing_name() {
        let params = Params::new()
            .with("@email", "a@example.com")
            .with("email", "b@example.com")
            .with("id", 7);
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("email"), Some(&SqlValue::Text("b@example.com".into())));
        assert_eq!(params.get("id"), Some(&SqlValue::Int(7)));
    }

    #[test]
    fn test_option_maps_to_null() {
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some("x")), SqlValue::Text("x".into()));
    }

    #[tokio::test]
    async fn test_default_connector_opens_sqlite_memory() {
        let config = DbConfig {
            host: "sqlite::memory:".to_string(),
            port: None,
            user: String::new(),
            password: String::new(),
            name: String::new(),
            encrypt: false,
            trust_server_certificate: true,
        };
        let client = DefaultConnector.connect(&config).await.unwrap();
        assert_eq!(client.backend(), Backend::Sqlite);
        let rows = client.query("SELECT 1 AS one", &Params::new()).await.unwrap();
        assert_eq!(rows[0]["one"], serde_json::json!(1));
    }
}
