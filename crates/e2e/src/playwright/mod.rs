//! Playwright browser automation
//!
//! Playwright runs inside a Node.js child process; Rust talks to it through
//! the JSON-lines protocol in [`protocol`]. One bridge process backs one
//! launched browser.

mod bridge;
mod handles;
pub mod protocol;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use itas_common::Config;

pub use bridge::{BridgeConfig, NodeBridge, Transport};
pub use handles::{Browser, BrowserContext, Locator, Page, PendingDialog, PendingPage};
pub use protocol::{
    ClickOptions, DialogAction, LoadState, MouseButton, ScreenshotOptions, SelectBy, WaitState,
};

use crate::error::E2eResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Engine {
    /// Map a configured browser name onto a Playwright engine
    ///
    /// Anything unrecognised (`chrome`, `edge`, ...) runs on Chromium.
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "firefox" => Engine::Firefox,
            "webkit" | "safari" => Engine::Webkit,
            _ => Engine::Chromium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Chromium => "chromium",
            Engine::Firefox => "firefox",
            Engine::Webkit => "webkit",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub engine: Engine,
    pub headless: bool,
    pub executable_path: Option<PathBuf>,
    /// Default timeout for every operation in contexts of this browser
    pub timeout: Duration,
}

/// Starts browsers
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, options: LaunchOptions) -> E2eResult<Browser>;
}

/// Launches each browser in its own Node.js bridge process
#[derive(Debug, Clone)]
pub struct PlaywrightLauncher {
    bridge: BridgeConfig,
}

impl PlaywrightLauncher {
    pub fn new(bridge: BridgeConfig) -> Self {
        Self { bridge }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(BridgeConfig {
            node_binary: config.node_binary.clone(),
            node_path: config.playwright_node_path.clone(),
            default_timeout: config.step_timeout,
        })
    }
}

#[async_trait]
impl Launcher for PlaywrightLauncher {
    async fn launch(&self, options: LaunchOptions) -> E2eResult<Browser> {
        let bridge: Arc<dyn Transport> = Arc::new(NodeBridge::spawn(&self.bridge).await?);

        let launched = bridge
            .send(protocol::Command::Launch {
                engine: options.engine,
                headless: options.headless,
                executable_path: options.executable_path.clone(),
                timeout_ms: options.timeout.as_millis() as u64,
            })
            .await
            .and_then(|v| Ok(serde_json::from_value::<String>(v)?));

        let version = match launched {
            Ok(version) => version,
            Err(e) => {
                if let Err(stop) = bridge.shutdown().await {
                    warn!("Failed to stop bridge after launch failure: {}", stop);
                }
                return Err(e);
            }
        };

        info!(
            "Launched {} {} (headless: {})",
            options.engine, version, options.headless
        );
        Ok(Browser::new(bridge, options.engine, version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("firefox" => Engine::Firefox)]
    #[test_case("FireFox" => Engine::Firefox)]
    #[test_case("webkit" => Engine::Webkit)]
    #[test_case("safari" => Engine::Webkit)]
    #[test_case("chrome" => Engine::Chromium)]
    #[test_case("edge" => Engine::Chromium)]
    #[test_case("" => Engine::Chromium)]
    fn test_engine_from_name(name: &str) -> Engine {
        Engine::from_name(name)
    }
}
