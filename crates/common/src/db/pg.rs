//! Postgres backend

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use native_tls::TlsConnector;
use postgres::config::SslMode;
use postgres::{Client, NoTls};
use postgres_native_tls::MakeTlsConnector;
use regex::{Captures, Regex};
use serde_json::Value;
use tracing::{debug, info};

use super::{Backend, DbClient, Params, Row, SqlValue};
use crate::config::{DbConfig, TlsMode};
use crate::{Error, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_PORT: u16 = 5432;

/// Quoted literals are matched first so placeholders inside them are left alone
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'(?:[^']|'')*'|@@\w+|@([A-Za-z_][A-Za-z0-9_]*)").expect("placeholder regex")
});

/// Rewrite `@name` placeholders to positional `$n`
///
/// Returns the rewritten SQL and the parameter names in positional order.
/// A name used twice maps to the same position.
pub fn rewrite_named_params(sql: &str) -> (String, Vec<String>) {
    let mut names: Vec<String> = Vec::new();
    let rewritten = PLACEHOLDER.replace_all(sql, |caps: &Captures<'_>| match caps.get(1) {
        Some(name) => {
            let name = name.as_str();
            let position = match names.iter().position(|n| n == name) {
                Some(i) => i + 1,
                None => {
                    names.push(name.to_string());
                    names.len()
                }
            };
            format!("${}", position)
        }
        None => caps[0].to_string(),
    });
    (rewritten.into_owned(), names)
}

fn ssl_mode(mode: TlsMode) -> SslMode {
    match mode {
        TlsMode::Disabled => SslMode::Disable,
        TlsMode::Verified | TlsMode::TrustServerCertificate => SslMode::Require,
    }
}

/// TLS connector for `mode`; `None` when the connection stays in plain text
fn tls_connector(mode: TlsMode) -> Result<Option<MakeTlsConnector>> {
    let trust = match mode {
        TlsMode::Disabled => return Ok(None),
        TlsMode::Verified => false,
        TlsMode::TrustServerCertificate => true,
    };
    let connector = TlsConnector::builder()
        .danger_accept_invalid_certs(trust)
        .danger_accept_invalid_hostnames(trust)
        .build()?;
    Ok(Some(MakeTlsConnector::new(connector)))
}

/// Postgres-backed client
#[derive(Clone)]
pub struct PostgresClient {
    client: Arc<Mutex<Option<Client>>>,
    host: String,
}

impl PostgresClient {
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        let mut pg = postgres::Config::new();
        pg.host(&config.host)
            .port(config.port.unwrap_or(DEFAULT_PORT))
            .user(&config.user)
            .password(&config.password)
            .dbname(&config.name)
            .connect_timeout(CONNECT_TIMEOUT);

        let mode = config.tls_mode();
        pg.ssl_mode(ssl_mode(mode));
        let tls = tls_connector(mode)?;

        let client = tokio::task::spawn_blocking(move || match tls {
            Some(tls) => pg.connect(tls),
            None => pg.connect(NoTls),
        })
        .await??;

        info!("Connected to Postgres at {} ({:?})", config.host, mode);
        Ok(Self {
            client: Arc::new(Mutex::new(Some(client))),
            host: config.host.clone(),
        })
    }
}

#[async_trait]
impl DbClient for PostgresClient {
    async fn query(&self, sql: &str, params: &Params) -> Result<Vec<Row>> {
        let client = self.client.clone();
        let sql = sql.to_string();
        let params = params.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = client.lock();
            let client = guard.as_mut().ok_or(Error::ConnectionUnavailable)?;
            run_query(client, &sql, &params)
        })
        .await?
    }

    async fn close(&self) -> Result<()> {
        let taken = self.client.lock().take();
        if let Some(client) = taken {
            tokio::task::spawn_blocking(move || client.close()).await??;
            info!("Closed Postgres connection to {}", self.host);
        }
        Ok(())
    }

    fn backend(&self) -> Backend {
        Backend::Postgres
    }
}

fn run_query(client: &mut Client, sql: &str, params: &Params) -> Result<Vec<Row>> {
    let (sql, names) = rewrite_named_params(sql);
    let stmt = client.prepare(&sql)?;

    let mut bound: Vec<Box<dyn ToSql + Sync>> = Vec::with_capacity(names.len());
    for (name, ty) in names.iter().zip(stmt.params()) {
        let value = params
            .get(name)
            .ok_or_else(|| Error::UnboundParameter(name.clone()))?;
        bound.push(to_param(value, ty));
    }
    let refs: Vec<&(dyn ToSql + Sync)> = bound.iter().map(|b| b.as_ref()).collect();

    let rows = client.query(&stmt, &refs)?;
    let mut out = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut record = Row::new();
        for (i, column) in row.columns().iter().enumerate() {
            record.insert(column.name().to_string(), column_to_json(row, i, column.type_())?);
        }
        out.push(record);
    }

    debug!("Postgres query returned {} row(s)", out.len());
    Ok(out)
}

/// A NULL accepted by every column type
#[derive(Debug)]
struct AnyNull;

impl ToSql for AnyNull {
    fn to_sql(
        &self,
        _ty: &Type,
        _out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn StdError + Sync + Send>> {
        Ok(IsNull::Yes)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Coerce a parameter to the type the server inferred for its placeholder
fn to_param(value: &SqlValue, ty: &Type) -> Box<dyn ToSql + Sync> {
    let is_text = [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME].contains(ty);
    match value {
        SqlValue::Null => Box::new(AnyNull),
        SqlValue::Bool(b) if is_text => Box::new(b.to_string()),
        SqlValue::Bool(b) => Box::new(*b),
        SqlValue::Int(i) if *ty == Type::INT2 => match i16::try_from(*i) {
            Ok(v) => Box::new(v),
            Err(_) => Box::new(*i),
        },
        SqlValue::Int(i) if *ty == Type::INT4 => match i32::try_from(*i) {
            Ok(v) => Box::new(v),
            Err(_) => Box::new(*i),
        },
        SqlValue::Int(i) if *ty == Type::FLOAT4 => Box::new(*i as f32),
        SqlValue::Int(i) if *ty == Type::FLOAT8 => Box::new(*i as f64),
        SqlValue::Int(i) if is_text => Box::new(i.to_string()),
        SqlValue::Int(i) => Box::new(*i),
        SqlValue::Float(f) if *ty == Type::FLOAT4 => Box::new(*f as f32),
        SqlValue::Float(f) if is_text => Box::new(f.to_string()),
        SqlValue::Float(f) => Box::new(*f),
        SqlValue::Text(s) => text_param(s, ty),
    }
}

fn text_param(s: &str, ty: &Type) -> Box<dyn ToSql + Sync> {
    let parsed: Option<Box<dyn ToSql + Sync>> = if *ty == Type::INT2 {
        s.parse::<i16>().ok().map(|v| Box::new(v) as Box<dyn ToSql + Sync>)
    } else if *ty == Type::INT4 {
        s.parse::<i32>().ok().map(|v| Box::new(v) as Box<dyn ToSql + Sync>)
    } else if *ty == Type::INT8 {
        s.parse::<i64>().ok().map(|v| Box::new(v) as Box<dyn ToSql + Sync>)
    } else if *ty == Type::FLOAT8 {
        s.parse::<f64>().ok().map(|v| Box::new(v) as Box<dyn ToSql + Sync>)
    } else if *ty == Type::BOOL {
        s.parse::<bool>().ok().map(|v| Box::new(v) as Box<dyn ToSql + Sync>)
    } else {
        None
    };
    parsed.unwrap_or_else(|| Box::new(s.to_string()))
}

fn column_to_json(row: &postgres::Row, i: usize, ty: &Type) -> Result<Value> {
    let value = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(i)?.map(Value::from)
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(i)?.map(Value::from)
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(i)?.map(Value::from)
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(i)?.map(Value::from)
    } else if *ty == Type::OID {
        row.try_get::<_, Option<u32>>(i)?.map(Value::from)
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(i)?.map(Value::from)
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(i)?.map(Value::from)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        row.try_get::<_, Option<Value>>(i)?
    } else if *ty == Type::TIMESTAMP {
        row.try_get::<_, Option<chrono::NaiveDateTime>>(i)?
            .map(|v| Value::String(v.to_string()))
    } else if *ty == Type::TIMESTAMPTZ {
        row.try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(i)?
            .map(|v| Value::String(v.to_rfc3339()))
    } else if *ty == Type::DATE {
        row.try_get::<_, Option<chrono::NaiveDate>>(i)?
            .map(|v| Value::String(v.to_string()))
    } else {
        match row.try_get::<_, Option<String>>(i) {
            Ok(v) => v.map(Value::String),
            Err(_) => Some(Value::String(format!("<{}>", ty.name()))),
        }
    };
    Ok(value.unwrap_or(Value::Null))
}
