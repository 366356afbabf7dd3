//! In-process fakes for exercising handles, the world and hooks without a
//! browser or database server

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use parking_lot::Mutex;
use serde_json::{json, Value};

use itas_common::db::{Backend, DbClient, DbConnector, Params, Row};
use itas_common::{DbConfig, Error as DbError};

use crate::browser_path::{HostAccess, HostOs};
use crate::error::{E2eError, E2eResult};
use crate::playwright::protocol::Command;
use crate::playwright::{Browser, Engine, LaunchOptions, Launcher, Transport};

pub const FAKE_PNG: &[u8] = b"\x89PNG fake";

/// Records every command and answers with canned values
#[derive(Default)]
pub struct FakeTransport {
    log: Mutex<Vec<Command>>,
    responses: Mutex<HashMap<String, Value>>,
    failures: Mutex<HashMap<String, String>>,
    timeouts: Mutex<Vec<String>>,
    seq: AtomicUsize,
    shutdowns: AtomicUsize,
}

fn key(command: &Command) -> String {
    match command {
        Command::Element { action, .. } => format!("element.{}", action.name()),
        other => other.label(),
    }
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn browser(self: &Arc<Self>) -> Browser {
        Browser::new(self.clone(), Engine::Chromium, "fake")
    }

    /// Answer every `key` command with `value`
    pub fn respond(&self, key: &str, value: Value) {
        self.responses.lock().insert(key.to_string(), value);
    }

    /// Fail every `key` command with a Playwright error
    pub fn fail(&self, key: &str, message: &str) {
        self.failures.lock().insert(key.to_string(), message.to_string());
    }

    /// Make every `key` command time out
    pub fn time_out(&self, key: &str) {
        self.timeouts.lock().push(key.to_string());
    }

    pub fn commands(&self) -> Vec<Command> {
        self.log.lock().clone()
    }

    /// Command keys in send order (`goto`, `element.fill`, ...)
    pub fn keys(&self) -> Vec<String> {
        self.log.lock().iter().map(key).collect()
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    fn next(&self, prefix: &str) -> Value {
        json!(format!("{}{}", prefix, self.seq.fetch_add(1, Ordering::SeqCst) + 1))
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, command: Command) -> E2eResult<Value> {
        let key = key(&command);
        self.log.lock().push(command);

        if let Some(message) = self.failures.lock().get(&key) {
            return Err(E2eError::Playwright(message.clone()));
        }
        if self.timeouts.lock().contains(&key) {
            return Err(E2eError::Timeout(key));
        }
        if let Some(value) = self.responses.lock().get(&key) {
            return Ok(value.clone());
        }
        Ok(match key.as_str() {
            "launch" => json!("fake"),
            "new_context" => self.next("c"),
            "new_page" | "await_page" => self.next("p"),
            "expect_page" | "arm_dialog" => self.next("w"),
            "context_pages" | "element.all_text_contents" | "element.selected_options" => json!([]),
            "screenshot" => json!(BASE64.encode(FAKE_PNG)),
            "url" => json!("about:blank"),
            "title" | "content" | "await_dialog" | "element.text_content"
            | "element.input_value" => json!(""),
            "element.count" => json!(0),
            "element.is_checked" | "element.is_visible" | "element.is_enabled"
            | "element.is_disabled" => json!(false),
            _ => Value::Null,
        })
    }

    async fn shutdown(&self) -> E2eResult<()> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Launches browsers over one shared [`FakeTransport`]
pub struct FakeLauncher {
    pub transport: Arc<FakeTransport>,
    launches: Mutex<Vec<LaunchOptions>>,
    fail: Option<String>,
}

impl FakeLauncher {
    pub fn new(transport: Arc<FakeTransport>) -> Arc<Self> {
        Arc::new(Self {
            transport,
            launches: Mutex::new(Vec::new()),
            fail: None,
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            transport: FakeTransport::new(),
            launches: Mutex::new(Vec::new()),
            fail: Some(message.to_string()),
        })
    }

    pub fn launches(&self) -> Vec<LaunchOptions> {
        self.launches.lock().clone()
    }
}

#[async_trait]
impl Launcher for FakeLauncher {
    async fn launch(&self, options: LaunchOptions) -> E2eResult<Browser> {
        let engine = options.engine;
        self.launches.lock().push(options);
        if let Some(message) = &self.fail {
            return Err(E2eError::Playwright(message.clone()));
        }
        Ok(Browser::new(self.transport.clone(), engine, "fake"))
    }
}

/// Database client that answers every query with no rows
#[derive(Default)]
pub struct FakeDbClient {
    pub queries: Mutex<Vec<String>>,
    pub closes: AtomicUsize,
}

#[async_trait]
impl DbClient for FakeDbClient {
    async fn query(&self, sql: &str, _params: &Params) -> itas_common::Result<Vec<Row>> {
        self.queries.lock().push(sql.to_string());
        Ok(Vec::new())
    }

    async fn close(&self) -> itas_common::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn backend(&self) -> Backend {
        Backend::Sqlite
    }
}

/// Connector that either always fails or always hands out the same client
pub struct FakeConnector {
    client: Option<Arc<FakeDbClient>>,
    attempts: AtomicUsize,
}

impl FakeConnector {
    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            client: None,
            attempts: AtomicUsize::new(0),
        })
    }

    pub fn reachable(client: Arc<FakeDbClient>) -> Arc<Self> {
        Arc::new(Self {
            client: Some(client),
            attempts: AtomicUsize::new(0),
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DbConnector for FakeConnector {
    async fn connect(&self, config: &DbConfig) -> itas_common::Result<Arc<dyn DbClient>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match &self.client {
            Some(client) => Ok(client.clone()),
            None => Err(DbError::InvalidConfig(format!(
                "connection refused: {}",
                config.host
            ))),
        }
    }
}

/// Host access where every shell lookup succeeds at `/usr/bin/<name>`
pub struct OnPathAccess;

#[async_trait]
impl HostAccess for OnPathAccess {
    fn exists(&self, _path: &Path) -> bool {
        false
    }

    async fn lookup(&self, _os: &HostOs, name: &str) -> Option<PathBuf> {
        Some(PathBuf::from("/usr/bin").join(name))
    }
}

/// Host access that finds nothing anywhere
pub struct EmptyAccess;

#[async_trait]
impl HostAccess for EmptyAccess {
    fn exists(&self, _path: &Path) -> bool {
        false
    }

    async fn lookup(&self, _os: &HostOs, _name: &str) -> Option<PathBuf> {
        None
    }
}
