//! Run and scenario lifecycle hooks
//!
//! The cucumber runner calls into [`Hooks`] around every scenario. Setup
//! opens the browser and lands on the base URL; teardown captures failure
//! evidence, then closes the context, the browser and the database, in that
//! order. Teardown never fails: close errors are logged and recorded on the
//! scenario instead.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::E2eResult;
use crate::playwright::ScreenshotOptions;
use crate::report::{Attachment, RunReport, ScenarioRecord, ScenarioStatus};
use crate::world::{Harness, ScenarioWorld};

pub struct Hooks {
    harness: Harness,
    report: Arc<RunReport>,
}

impl Hooks {
    pub fn new(harness: Harness) -> Self {
        Self {
            harness,
            report: Arc::new(RunReport::new()),
        }
    }

    pub fn harness(&self) -> &Harness {
        &self.harness
    }

    pub fn report(&self) -> &Arc<RunReport> {
        &self.report
    }

    /// Prepare output directories before the first scenario
    pub async fn before_all(&self) -> E2eResult<()> {
        let config = self.harness.config();
        tokio::fs::create_dir_all(config.screenshot_dir()).await?;
        info!(
            "Running against {} ({}) with {} ({})",
            config.env,
            config.base_url.as_deref().unwrap_or("no base URL"),
            config.browser.name,
            if config.browser.headless {
                "headless"
            } else {
                "headed"
            }
        );
        Ok(())
    }

    /// Open the browser and the landing page; the database stays lazy
    pub async fn before_scenario(&self, world: &mut ScenarioWorld) -> E2eResult<()> {
        world.init_browser().await?;
        world.init_context().await?;
        Ok(())
    }

    /// Tear a scenario down and record its outcome
    pub async fn after_scenario(
        &self,
        world: &mut ScenarioWorld,
        feature: &str,
        name: &str,
        status: ScenarioStatus,
    ) -> ScenarioRecord {
        let mut record = ScenarioRecord::new(feature, name, status, world.elapsed_ms());

        if status == ScenarioStatus::Failed {
            match self.capture_failure(world).await {
                Ok(Some(attachment)) => record.attachments.push(attachment),
                Ok(None) => debug!("No page to capture for \"{}\"", name),
                Err(e) => warn!("Failed to capture screenshot for \"{}\": {}", name, e),
            }
        }

        if let Err(e) = world.close_context().await {
            warn!("Failed to close browser context: {}", e);
            record.teardown_errors.push(format!("context: {}", e));
        }
        if let Err(e) = world.close_browser().await {
            warn!("Failed to close browser: {}", e);
            record.teardown_errors.push(format!("browser: {}", e));
        }
        if let Err(e) = world.close_database().await {
            warn!("Failed to close database connection: {}", e);
            record.teardown_errors.push(format!("database: {}", e));
        }

        self.report.record(record.clone());
        record
    }

    /// Record a scenario whose world was never built
    pub fn record_without_world(&self, feature: &str, name: &str, status: ScenarioStatus) {
        self.report.record(ScenarioRecord::new(feature, name, status, 0));
    }

    /// Write the run summary
    pub async fn after_all(&self) -> E2eResult<PathBuf> {
        self.report.write(&self.harness.config().report_dir)
    }

    async fn capture_failure(&self, world: &ScenarioWorld) -> E2eResult<Option<Attachment>> {
        let page = match world.page() {
            Some(page) => page,
            None => return Ok(None),
        };

        let bytes = page
            .screenshot(ScreenshotOptions {
                full_page: true,
                path: None,
            })
            .await?;

        let dir = self.harness.config().screenshot_dir();
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{}.png", Utc::now().timestamp_millis()));
        tokio::fs::write(&path, &bytes).await?;
        info!("Failure screenshot saved to {}", path.display());

        Ok(Some(Attachment::png(path, &bytes)))
    }
}
