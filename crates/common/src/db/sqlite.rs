//! SQLite backend

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::types::{Value as SqlParam, ValueRef};
use rusqlite::{Connection, OpenFlags};
use serde_json::Value;
use tracing::{debug, info};

use super::{Backend, DbClient, Params, Row, SqlValue};
use crate::{Error, Result};

/// SQLite-backed client
///
/// The connection is taken out of its slot on close, so later queries fail
/// with [`Error::ConnectionUnavailable`].
#[derive(Clone)]
pub struct SqliteClient {
    conn: Arc<Mutex<Option<Connection>>>,
    location: PathBuf,
}

impl SqliteClient {
    /// Open an existing database file (or `:memory:`)
    ///
    /// The file is never created; a missing file means the database is
    /// unreachable.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let location = path.as_ref().to_path_buf();
        let target = location.clone();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection> {
            if target.as_os_str() == ":memory:" {
                return Ok(Connection::open_in_memory()?);
            }
            let conn = Connection::open_with_flags(
                &target,
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.execute_batch("PRAGMA foreign_keys=ON;")?;
            Ok(conn)
        })
        .await??;

        info!("Opened SQLite database at {:?}", location);
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            location,
        })
    }

    pub fn location(&self) -> &Path {
        &self.location
    }
}

#[async_trait]
impl DbClient for SqliteClient {
    async fn query(&self, sql: &str, params: &Params) -> Result<Vec<Row>> {
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let params = params.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            let conn = guard.as_ref().ok_or(Error::ConnectionUnavailable)?;
            run_query(conn, &sql, &params)
        })
        .await?
    }

    async fn close(&self) -> Result<()> {
        let taken = self.conn.lock().take();
        if let Some(conn) = taken {
            conn.close().map_err(|(_, err)| Error::Sqlite(err))?;
            info!("Closed SQLite database at {:?}", self.location);
        }
        Ok(())
    }

    fn backend(&self) -> Backend {
        Backend::Sqlite
    }
}

fn run_query(conn: &Connection, sql: &str, params: &Params) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(sql)?;

    // Bind only the names the statement references
    for (name, value) in params.iter() {
        if let Some(index) = stmt.parameter_index(&format!("@{}", name))? {
            stmt.raw_bind_parameter(index, to_sqlite(value))?;
        }
    }
    for index in 1..=stmt.parameter_count() {
        if let Some(name) = stmt.parameter_name(index) {
            let bare = name.trim_start_matches(['@', ':', '$']);
            if params.get(bare).is_none() {
                return Err(Error::UnboundParameter(bare.to_string()));
            }
        }
    }

    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let mut rows = stmt.raw_query();
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Row::new();
        for (i, column) in columns.iter().enumerate() {
            record.insert(column.clone(), to_json(row.get_ref(i)?));
        }
        out.push(record);
    }

    debug!("SQLite query returned {} row(s)", out.len());
    Ok(out)
}

fn to_sqlite(value: &SqlValue) -> SqlParam {
    match value {
        SqlValue::Null => SqlParam::Null,
        SqlValue::Bool(b) => SqlParam::Integer(i64::from(*b)),
        SqlValue::Int(i) => SqlParam::Integer(*i),
        SqlValue::Float(f) => SqlParam::Real(*f),
        SqlValue::Text(s) => SqlParam::Text(s.clone()),
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    async fn seeded() -> (TempDir, SqliteClient) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("itas.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE Users (Id INTEGER PRIMARY KEY, Email TEXT NOT NULL, Password TEXT, Active INTEGER);
             INSERT INTO Users (Email, Password, Active) VALUES ('a@example.com', 'pw1', 1);
             INSERT INTO Users (Email, Password, Active) VALUES ('b@example.com', 'pw2', 0);",
        )
        .unwrap();
        drop(conn);
        let client = SqliteClient::open(&path).await.unwrap();
        (dir, client)
    }

    #[tokio::test]
    async fn test_named_params_and_column_order() {
        let (_dir, client) = seeded().await;
        let rows = client
            .query(
                "SELECT Email, Id FROM Users WHERE Active = @active",
                &Params::new().with("active", 1),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Email"], json!("a@example.com"));
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys, ["Email", "Id"]);
    }

    #[tokio::test]
    async fn test_extra_params_are_ignored() {
        let (_dir, client) = seeded().await;
        let rows = client
            .query(
                "SELECT COUNT(*) AS n FROM Users",
                &Params::new().with("unused", "x"),
            )
            .await
            .unwrap();
        assert_eq!(rows[0]["n"], json!(2));
    }

    #[tokio::test]
    async fn test_missing_param_is_an_error() {
        let (_dir, client) = seeded().await;
        let err = client
            .query("SELECT * FROM Users WHERE Email = @email", &Params::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnboundParameter(ref n) if n == "email"));
    }

    #[tokio::test]
    async fn test_insert_with_returning() {
        let (_dir, client) = seeded().await;
        let rows = client
            .query(
                "INSERT INTO Users (Email, Password) VALUES (@email, @password) RETURNING Id",
                &Params::new().with("email", "c@example.com").with("password", "pw3"),
            )
            .await
            .unwrap();
        assert_eq!(rows[0]["Id"], json!(3));
    }

    #[tokio::test]
    async fn test_missing_file_is_unreachable() {
        let dir = TempDir::new().unwrap();
        let result = SqliteClient::open(dir.path().join("absent.db")).await;
        assert!(result.is_err());
        assert!(!dir.path().join("absent.db").exists());
    }

    #[tokio::test]
    async fn test_query_after_close_fails() {
        let (_dir, client) = seeded().await;
        client.close().await.unwrap();
        client.close().await.unwrap();
        let err = client.query("SELECT 1", &Params::new()).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionUnavailable));
    }
}
