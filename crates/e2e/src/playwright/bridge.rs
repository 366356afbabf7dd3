//! Node.js process hosting Playwright

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::protocol::{Command, ElementAction, Reply, Request};
use crate::error::{E2eError, E2eResult};

const BRIDGE_SCRIPT: &str = include_str!("bridge.js");

/// Extra time on top of an operation's own timeout before the bridge is
/// considered hung
const REPLY_GRACE: Duration = Duration::from_secs(30);

/// One request/response exchange with a browser automation backend
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, command: Command) -> E2eResult<Value>;

    /// Stop the backend. Later sends fail.
    async fn shutdown(&self) -> E2eResult<()>;
}

/// How to start the bridge process
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub node_binary: PathBuf,
    /// Directory containing the `playwright` npm package
    pub node_path: PathBuf,
    /// Playwright default timeout; also bounds how long a reply may take
    pub default_timeout: Duration,
}

struct BridgeIo {
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

/// JSON-lines bridge to a `node` child process
pub struct NodeBridge {
    io: Mutex<Option<BridgeIo>>,
    child: Mutex<Option<Child>>,
    next_id: AtomicU64,
    default_timeout: Duration,
    // Keeps the staged script alive for the life of the process
    _script_dir: TempDir,
}

impl NodeBridge {
    pub async fn spawn(config: &BridgeConfig) -> E2eResult<Self> {
        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        tokio::fs::write(&script_path, BRIDGE_SCRIPT).await?;

        let mut child = TokioCommand::new(&config.node_binary)
            .arg(&script_path)
            .env("NODE_PATH", &config.node_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                E2eError::Bridge(format!(
                    "Failed to spawn {}: {}",
                    config.node_binary.display(),
                    e
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Bridge("bridge stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Bridge("bridge stdout unavailable".into()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!("[bridge] {}", line);
                }
            });
        }

        info!("Started Playwright bridge (pid: {:?})", child.id());
        Ok(Self {
            io: Mutex::new(Some(BridgeIo {
                stdin,
                stdout: BufReader::new(stdout).lines(),
            })),
            child: Mutex::new(Some(child)),
            next_id: AtomicU64::new(1),
            default_timeout: config.default_timeout,
            _script_dir: script_dir,
        })
    }

    fn reply_deadline(&self, command: &Command) -> Duration {
        let own = match command {
            Command::ExpectPage { timeout_ms, .. } | Command::ArmDialog { timeout_ms, .. } => {
                Duration::from_millis(*timeout_ms)
            }
            Command::WaitForTimeout { ms, .. } => Duration::from_millis(*ms),
            Command::Element { action, .. } => match action {
                ElementAction::WaitFor { timeout_ms, .. } => {
                    Duration::from_millis(*timeout_ms)
                }
                _ => Duration::ZERO,
            },
            _ => Duration::ZERO,
        };
        own.max(self.default_timeout) + REPLY_GRACE
    }

    async fn exchange(io: &mut BridgeIo, id: u64, command: &Command) -> E2eResult<Value> {
        let mut line = serde_json::to_string(&Request { id, command })?;
        line.push('\n');
        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.flush().await?;

        loop {
            let Some(raw) = io.stdout.next_line().await? else {
                return Err(E2eError::Bridge("bridge process exited".into()));
            };
            let reply: Reply = match serde_json::from_str(&raw) {
                Ok(reply) => reply,
                Err(_) => {
                    debug!("[bridge] {}", raw);
                    continue;
                }
            };
            if reply.id != id {
                debug!("Discarding stale bridge reply {}", reply.id);
                continue;
            }
            if reply.ok {
                return Ok(reply.result);
            }
            let message = reply.error.unwrap_or_else(|| "unknown error".to_string());
            return Err(match reply.kind.as_deref() {
                Some("timeout") => E2eError::Timeout(message),
                _ => E2eError::Playwright(message),
            });
        }
    }
}

#[async_trait]
impl Transport for NodeBridge {
    async fn send(&self, command: Command) -> E2eResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let label = command.label();
        debug!("-> {} #{}", label, id);

        let mut guard = self.io.lock().await;
        let io = guard
            .as_mut()
            .ok_or_else(|| E2eError::Bridge("bridge is shut down".into()))?;

        let deadline = self.reply_deadline(&command);
        let result = match tokio::time::timeout(deadline, Self::exchange(io, id, &command)).await {
            Ok(result) => result,
            Err(_) => {
                // The stream may now be mid-reply; no later exchange can trust it
                guard.take();
                return Err(E2eError::Timeout(format!("bridge reply to {}", label)));
            }
        };
        debug!("<- {} #{} ok={}", label, id, result.is_ok());
        result
    }

    async fn shutdown(&self) -> E2eResult<()> {
        if let Some(mut io) = self.io.lock().await.take() {
            let _ = tokio::time::timeout(
                Duration::from_secs(5),
                Self::exchange(&mut io, 0, &Command::Shutdown),
            )
            .await;
        }

        let Some(mut child) = self.child.lock().await.take() else {
            return Ok(());
        };
        if let Ok(status) = tokio::time::timeout(Duration::from_secs(2), child.wait()).await {
            debug!("Playwright bridge exited: {:?}", status);
            return Ok(());
        }

        info!("Stopping Playwright bridge (pid: {:?})", child.id());

        #[cfg(unix)]
        if let Some(pid) = child.id() {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                && tokio::time::timeout(Duration::from_millis(500), child.wait())
                    .await
                    .is_ok()
            {
                return Ok(());
            }
        }

        child.kill().await?;
        Ok(())
    }
}
