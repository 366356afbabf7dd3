//! Per-scenario resource lifecycle
//!
//! A [`ScenarioWorld`] owns everything one scenario touches: browser,
//! context, page, database connection and query cache. Every slot is
//! created at most once, on first use, and dropped with the world.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use itas_common::db::{DbClient, DbConnector, DefaultConnector};
use itas_common::{Config, Credentials, QueryCache};

use crate::browser_path::BrowserLocator;
use crate::browser_util::BrowserUtil;
use crate::error::{E2eError, E2eResult};
use crate::playwright::{
    Browser, BrowserContext, Engine, LaunchOptions, Launcher, Page, PlaywrightLauncher,
};

/// Collaborators shared by every scenario of a run
#[derive(Clone)]
pub struct Harness {
    config: Arc<Config>,
    launcher: Arc<dyn Launcher>,
    connector: Arc<dyn DbConnector>,
    locator: BrowserLocator,
}

impl fmt::Debug for Harness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Harness")
            .field("config", &self.config)
            .field("locator", &self.locator)
            .finish()
    }
}

impl Harness {
    pub fn new(
        config: Arc<Config>,
        launcher: Arc<dyn Launcher>,
        connector: Arc<dyn DbConnector>,
        locator: BrowserLocator,
    ) -> Self {
        Self {
            config,
            launcher,
            connector,
            locator,
        }
    }

    /// Real Playwright, real databases, real filesystem
    pub fn from_config(config: Config) -> Self {
        let launcher = Arc::new(PlaywrightLauncher::from_config(&config));
        Self::new(
            Arc::new(config),
            launcher,
            Arc::new(DefaultConnector),
            BrowserLocator::new(),
        )
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fresh world for one scenario
    pub fn world(&self) -> ScenarioWorld {
        ScenarioWorld::new(self.clone())
    }
}

/// Database slot: the connection is attempted once, then remembered
enum DbSlot {
    Unattempted,
    Resolved(Option<Arc<dyn DbClient>>),
}

/// Execution context of a single scenario
pub struct ScenarioWorld {
    harness: Harness,
    started: Instant,
    browser: Option<Browser>,
    context: Option<BrowserContext>,
    page: Option<Page>,
    db: DbSlot,
    query_cache: Option<QueryCache>,
    browser_util: Option<BrowserUtil>,
    current_user: Option<Credentials>,
}

impl fmt::Debug for ScenarioWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioWorld")
            .field("browser", &self.browser)
            .field("context", &self.context)
            .field("page", &self.page)
            .field("db_attempted", &!matches!(self.db, DbSlot::Unattempted))
            .field("query_cache", &self.query_cache)
            .field("current_user", &self.current_user)
            .finish()
    }
}

impl ScenarioWorld {
    pub fn new(harness: Harness) -> Self {
        Self {
            harness,
            started: Instant::now(),
            browser: None,
            context: None,
            page: None,
            db: DbSlot::Unattempted,
            query_cache: None,
            browser_util: None,
            current_user: None,
        }
    }

    pub fn config(&self) -> &Config {
        self.harness.config()
    }

    /// Time since the world was created
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Launch the configured browser unless one is already running
    pub async fn init_browser(&mut self) -> E2eResult<Browser> {
        if let Some(browser) = &self.browser {
            return Ok(browser.clone());
        }

        let config = self.harness.config();
        let settings = &config.browser;
        let executable = self.harness.locator.locate(&settings.name).await?;
        let browser = self
            .harness
            .launcher
            .launch(LaunchOptions {
                engine: Engine::from_name(&settings.name),
                headless: settings.headless,
                executable_path: Some(executable),
                timeout: config.step_timeout,
            })
            .await?;

        self.browser = Some(browser.clone());
        Ok(browser)
    }

    /// Open a context and page on the base URL, launching the browser if needed
    pub async fn init_context(&mut self) -> E2eResult<Page> {
        if let Some(page) = &self.page {
            return Ok(page.clone());
        }

        let browser = self.init_browser().await?;
        let base_url = self
            .harness
            .config()
            .base_url
            .clone()
            .ok_or_else(|| E2eError::MissingBaseUrl(self.harness.config().env.to_string()))?;

        let context = browser.new_context().await?;
        self.context = Some(context.clone());
        let page = context.new_page().await?;
        self.page = Some(page.clone());

        page.goto(&base_url).await?;
        Ok(page)
    }

    /// The scenario's database connection, or `None` in degraded mode
    ///
    /// Only the first call tries to connect; its outcome is returned for the
    /// rest of the scenario.
    pub async fn database_connection(&mut self) -> Option<Arc<dyn DbClient>> {
        if let DbSlot::Resolved(client) = &self.db {
            return client.clone();
        }

        let client = match &self.harness.config().db {
            Some(db) => match self.harness.connector.connect(db).await {
                Ok(client) => Some(client),
                Err(e) => {
                    warn!("Database connection failed: {}", e);
                    None
                }
            },
            None => {
                warn!("Database connection failed: DB_HOST is not set");
                None
            }
        };

        self.db = DbSlot::Resolved(client.clone());
        client
    }

    /// The scenario's query cache, built around the connection on first use
    pub async fn query_cache(&mut self) -> &mut QueryCache {
        let cache = match self.query_cache.take() {
            Some(cache) => cache,
            None => QueryCache::new(self.database_connection().await),
        };
        self.query_cache.insert(cache)
    }

    /// Interaction helpers for the current page
    pub fn browser_util(&mut self) -> E2eResult<&BrowserUtil> {
        if self.browser_util.is_none() {
            let page = self.page.clone().ok_or(E2eError::PageNotInitialized)?;
            self.browser_util = Some(BrowserUtil::new(page, self.config().screenshot_dir()));
        }
        self.browser_util.as_ref().ok_or(E2eError::PageNotInitialized)
    }

    pub fn browser(&self) -> Option<&Browser> {
        self.browser.as_ref()
    }

    pub fn context(&self) -> Option<&BrowserContext> {
        self.context.as_ref()
    }

    pub fn page(&self) -> Option<&Page> {
        self.page.as_ref()
    }

    /// The page, or [`E2eError::PageNotInitialized`]
    pub fn require_page(&self) -> E2eResult<&Page> {
        self.page.as_ref().ok_or(E2eError::PageNotInitialized)
    }

    pub fn current_user(&self) -> Option<&Credentials> {
        self.current_user.as_ref()
    }

    pub fn set_current_user(&mut self, user: Credentials) {
        self.current_user = Some(user);
    }

    /// Close the context if one was opened
    pub async fn close_context(&mut self) -> E2eResult<()> {
        self.browser_util = None;
        self.page = None;
        if let Some(context) = self.context.take() {
            context.close().await?;
        }
        Ok(())
    }

    /// Close the browser if one was launched
    pub async fn close_browser(&mut self) -> E2eResult<()> {
        if let Some(browser) = self.browser.take() {
            browser.close().await?;
        }
        Ok(())
    }

    /// Close the database through the query cache, or directly when no
    /// cache was ever built
    pub async fn close_database(&mut self) -> E2eResult<()> {
        if let Some(cache) = self.query_cache.as_mut() {
            cache.close().await?;
            return Ok(());
        }
        if let Some(client) = self.database_connection().await {
            client.close().await?;
            info!("Database connection closed");
        }
        Ok(())
    }
}
