//! ITAS UI test harness
//!
//! This crate runs Gherkin scenarios against a web application through
//! Playwright:
//! - Launches a locally installed browser per scenario
//! - Drives Playwright through a Node.js bridge speaking JSON lines
//! - Gives every scenario its own lazily built browser, page and database
//! - Captures a full-page screenshot when a scenario fails
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 cucumber runner (tests/bdd)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Hooks                                                      │
//! │    ├── before_scenario(world) -> init_browser, init_context │
//! │    └── after_scenario(world)  -> screenshot?, close all     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioWorld                                              │
//! │    ├── browser / context / page   (playwright, bridge.js)   │
//! │    ├── database_connection        (itas-common db)          │
//! │    ├── query_cache                (itas-common)             │
//! │    └── browser_util               (interaction helpers)     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  BrowserLocator: install paths, then `which` / `where`      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod browser_path;
pub mod browser_util;
pub mod error;
pub mod hooks;
pub mod pages;
pub mod playwright;
pub mod report;
pub mod world;

#[cfg(test)]
mod testing;

pub use browser_path::{BrowserLocator, HostAccess, HostOs, SystemAccess};
pub use browser_util::{BrowserUtil, Target};
pub use error::{E2eError, E2eResult};
pub use hooks::Hooks;
pub use pages::LoginPage;
pub use playwright::{
    Browser, BrowserContext, Engine, LaunchOptions, Launcher, Locator, Page, PlaywrightLauncher,
};
pub use report::{Attachment, RunReport, ScenarioRecord, ScenarioStatus};
pub use world::{Harness, ScenarioWorld};
