//! Element and tab helpers for step definitions

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::future::try_join_all;
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::playwright::{
    ClickOptions, DialogAction, Locator, MouseButton, Page, PendingDialog, PendingPage,
    ScreenshotOptions, SelectBy, WaitState,
};

/// Default wait for visibility changes, new tabs and dialogs
pub const DEFAULT_WAIT: Duration = Duration::from_secs(30);

/// Pause between clearing and refilling, for autocomplete dropdowns
const AUTOCOMPLETE_SETTLE: Duration = Duration::from_millis(500);

/// Default delay between keystrokes in [`BrowserUtil::type_text`]
pub const DEFAULT_TYPE_DELAY: Duration = Duration::from_millis(50);

/// An element addressed by selector or by an already-built locator
#[derive(Debug, Clone)]
pub enum Target {
    Selector(String),
    Resolved(Locator),
}

impl From<&str> for Target {
    fn from(selector: &str) -> Self {
        Target::Selector(selector.to_string())
    }
}

impl From<String> for Target {
    fn from(selector: String) -> Self {
        Target::Selector(selector)
    }
}

impl From<Locator> for Target {
    fn from(locator: Locator) -> Self {
        Target::Resolved(locator)
    }
}

impl From<&Locator> for Target {
    fn from(locator: &Locator) -> Self {
        Target::Resolved(locator.clone())
    }
}

/// Interaction helpers bound to one page
#[derive(Debug, Clone)]
pub struct BrowserUtil {
    page: Page,
    screenshot_dir: PathBuf,
}

impl BrowserUtil {
    pub fn new(page: Page, screenshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            page,
            screenshot_dir: screenshot_dir.into(),
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    fn resolve(&self, target: impl Into<Target>) -> Locator {
        match target.into() {
            Target::Selector(selector) => self.page.locator(&selector),
            Target::Resolved(locator) => locator,
        }
    }

    pub async fn fill_input(&self, target: impl Into<Target>, text: &str) -> E2eResult<()> {
        self.resolve(target).fill(text).await
    }

    pub async fn clear_input(&self, target: impl Into<Target>) -> E2eResult<()> {
        self.resolve(target).clear().await
    }

    /// Clear, let any dropdown settle, then fill
    pub async fn clear_after_fill(&self, target: impl Into<Target>, text: &str) -> E2eResult<()> {
        let element = self.resolve(target);
        element.clear().await?;
        self.page.wait_for_timeout(AUTOCOMPLETE_SETTLE).await?;
        element.fill(text).await
    }

    /// Type character by character
    pub async fn type_text(
        &self,
        target: impl Into<Target>,
        text: &str,
        delay: Duration,
    ) -> E2eResult<()> {
        self.resolve(target).type_text(text, delay).await
    }

    pub async fn input_value(&self, target: impl Into<Target>) -> E2eResult<String> {
        self.resolve(target).input_value().await
    }

    pub async fn click(&self, target: impl Into<Target>, options: ClickOptions) -> E2eResult<()> {
        self.resolve(target).click(options).await
    }

    pub async fn double_click(&self, target: impl Into<Target>) -> E2eResult<()> {
        self.resolve(target).dblclick().await
    }

    pub async fn right_click(&self, target: impl Into<Target>) -> E2eResult<()> {
        self.resolve(target)
            .click(ClickOptions {
                button: Some(MouseButton::Right),
                ..Default::default()
            })
            .await
    }

    pub async fn hover(&self, target: impl Into<Target>) -> E2eResult<()> {
        self.resolve(target).hover().await
    }

    pub async fn select_by_text(&self, target: impl Into<Target>, text: &str) -> E2eResult<()> {
        self.resolve(target)
            .select_option(&[text], SelectBy::Label)
            .await
    }

    pub async fn select_by_value(&self, target: impl Into<Target>, value: &str) -> E2eResult<()> {
        self.resolve(target)
            .select_option(&[value], SelectBy::Value)
            .await
    }

    pub async fn select_multiple(
        &self,
        target: impl Into<Target>,
        values: &[&str],
    ) -> E2eResult<()> {
        self.resolve(target)
            .select_option(values, SelectBy::Value)
            .await
    }

    pub async fn selected_options(&self, target: impl Into<Target>) -> E2eResult<Vec<String>> {
        self.resolve(target).selected_options().await
    }

    pub async fn check(&self, target: impl Into<Target>) -> E2eResult<()> {
        self.resolve(target).check().await
    }

    pub async fn uncheck(&self, target: impl Into<Target>) -> E2eResult<()> {
        self.resolve(target).uncheck().await
    }

    pub async fn toggle_checkbox(&self, target: impl Into<Target>) -> E2eResult<()> {
        let element = self.resolve(target);
        if element.is_checked().await? {
            element.uncheck().await
        } else {
            element.check().await
        }
    }

    pub async fn is_checked(&self, target: impl Into<Target>) -> E2eResult<bool> {
        self.resolve(target).is_checked().await
    }

    pub async fn text(&self, target: impl Into<Target>) -> E2eResult<String> {
        self.resolve(target).text_content().await
    }

    pub async fn all_texts(&self, target: impl Into<Target>) -> E2eResult<Vec<String>> {
        self.resolve(target).all_text_contents().await
    }

    pub async fn attribute(
        &self,
        target: impl Into<Target>,
        name: &str,
    ) -> E2eResult<Option<String>> {
        self.resolve(target).get_attribute(name).await
    }

    pub async fn is_visible(&self, target: impl Into<Target>) -> E2eResult<bool> {
        self.resolve(target).is_visible().await
    }

    pub async fn is_enabled(&self, target: impl Into<Target>) -> E2eResult<bool> {
        self.resolve(target).is_enabled().await
    }

    pub async fn is_disabled(&self, target: impl Into<Target>) -> E2eResult<bool> {
        self.resolve(target).is_disabled().await
    }

    pub async fn wait_for_visible(
        &self,
        target: impl Into<Target>,
        timeout: Duration,
    ) -> E2eResult<()> {
        self.resolve(target)
            .wait_for(WaitState::Visible, timeout)
            .await
    }

    pub async fn wait_for_hidden(
        &self,
        target: impl Into<Target>,
        timeout: Duration,
    ) -> E2eResult<()> {
        self.resolve(target)
            .wait_for(WaitState::Hidden, timeout)
            .await
    }

    pub async fn scroll_into_view(&self, target: impl Into<Target>) -> E2eResult<()> {
        self.resolve(target).scroll_into_view().await
    }

    pub async fn element_count(&self, target: impl Into<Target>) -> E2eResult<usize> {
        self.resolve(target).count().await
    }

    pub async fn press_key(&self, target: impl Into<Target>, key: &str) -> E2eResult<()> {
        self.resolve(target).press(key).await
    }

    pub async fn press_tab(&self, target: impl Into<Target>) -> E2eResult<()> {
        self.press_key(target, "Tab").await
    }

    pub async fn press_enter(&self, target: impl Into<Target>) -> E2eResult<()> {
        self.press_key(target, "Enter").await
    }

    pub async fn press_escape(&self, target: impl Into<Target>) -> E2eResult<()> {
        self.press_key(target, "Escape").await
    }

    pub async fn focus(&self, target: impl Into<Target>) -> E2eResult<()> {
        self.resolve(target).focus().await
    }

    pub async fn blur(&self, target: impl Into<Target>) -> E2eResult<()> {
        self.resolve(target).blur().await
    }

    pub async fn drag_and_drop(
        &self,
        source: impl Into<Target>,
        target: impl Into<Target>,
    ) -> E2eResult<()> {
        let target = self.resolve(target);
        self.resolve(source).drag_to(&target).await
    }

    pub async fn upload_file(&self, target: impl Into<Target>, file: &Path) -> E2eResult<()> {
        self.resolve(target)
            .set_input_files(&[file.to_path_buf()])
            .await
    }

    pub async fn upload_multiple_files(
        &self,
        target: impl Into<Target>,
        files: &[PathBuf],
    ) -> E2eResult<()> {
        self.resolve(target).set_input_files(files).await
    }

    pub async fn clear_file_input(&self, target: impl Into<Target>) -> E2eResult<()> {
        self.resolve(target).set_input_files(&[]).await
    }

    // Tabs

    async fn tabs(&self) -> E2eResult<Vec<Page>> {
        self.page.context().pages().await
    }

    pub async fn tab_count(&self) -> E2eResult<usize> {
        Ok(self.tabs().await?.len())
    }

    pub async fn switch_to_tab(&self, index: usize) -> E2eResult<Page> {
        let tabs = self.tabs().await?;
        let total = tabs.len();
        let page = tabs.into_iter().nth(index).ok_or_else(|| {
            E2eError::TabNotFound(format!(
                "Tab index {} does not exist. Total tabs: {}",
                index, total
            ))
        })?;
        page.bring_to_front().await?;
        Ok(page)
    }

    pub async fn switch_to_tab_by_title(&self, title: &str) -> E2eResult<Page> {
        for page in self.tabs().await? {
            if page.title().await?.contains(title) {
                page.bring_to_front().await?;
                return Ok(page);
            }
        }
        Err(E2eError::TabNotFound(format!(
            "Tab with title containing \"{}\" not found",
            title
        )))
    }

    pub async fn switch_to_tab_by_url(&self, url_part: &str) -> E2eResult<Page> {
        for page in self.tabs().await? {
            if page.url().await?.contains(url_part) {
                page.bring_to_front().await?;
                return Ok(page);
            }
        }
        Err(E2eError::TabNotFound(format!(
            "Tab with URL containing \"{}\" not found",
            url_part
        )))
    }

    pub async fn switch_to_first_tab(&self) -> E2eResult<Page> {
        self.switch_to_tab(0).await
    }

    pub async fn switch_to_last_tab(&self) -> E2eResult<Page> {
        let count = self.tab_count().await?;
        self.switch_to_tab(count.saturating_sub(1)).await
    }

    pub async fn close_current_tab(&self) -> E2eResult<()> {
        self.page.close().await
    }

    pub async fn close_tab_by_index(&self, index: usize) -> E2eResult<()> {
        self.switch_to_tab(index).await?.close().await
    }

    pub async fn all_tab_urls(&self) -> E2eResult<Vec<String>> {
        let tabs = self.tabs().await?;
        try_join_all(tabs.iter().map(|page| page.url())).await
    }

    pub async fn all_tab_titles(&self) -> E2eResult<Vec<String>> {
        let tabs = self.tabs().await?;
        try_join_all(tabs.iter().map(|page| page.title())).await
    }

    /// Start waiting for a tab; trigger the opening action, then `wait()`
    pub async fn wait_for_new_tab(&self, timeout: Duration) -> E2eResult<PendingPage> {
        self.page.context().expect_page(timeout).await
    }

    // Dialogs: arm before the action that raises the dialog

    pub async fn accept_alert(&self) -> E2eResult<PendingDialog> {
        self.page
            .on_next_dialog(DialogAction::Accept, DEFAULT_WAIT)
            .await
    }

    pub async fn dismiss_alert(&self) -> E2eResult<PendingDialog> {
        self.page
            .on_next_dialog(DialogAction::Dismiss, DEFAULT_WAIT)
            .await
    }

    pub async fn alert_type_and_accept(&self, text: &str) -> E2eResult<PendingDialog> {
        self.page
            .on_next_dialog(
                DialogAction::Prompt {
                    text: text.to_string(),
                },
                DEFAULT_WAIT,
            )
            .await
    }

    // Page

    pub async fn page_content(&self) -> E2eResult<String> {
        self.page.content().await
    }

    pub async fn page_title(&self) -> E2eResult<String> {
        self.page.title().await
    }

    pub async fn current_url(&self) -> E2eResult<String> {
        self.page.url().await
    }

    pub async fn refresh_page(&self) -> E2eResult<()> {
        self.page.reload().await
    }

    pub async fn go_back(&self) -> E2eResult<()> {
        self.page.go_back().await
    }

    pub async fn go_forward(&self) -> E2eResult<()> {
        self.page.go_forward().await
    }

    /// Capture the viewport to `<screenshot_dir>/<name>.png`
    pub async fn take_screenshot(&self, name: &str) -> E2eResult<Vec<u8>> {
        tokio::fs::create_dir_all(&self.screenshot_dir).await?;
        let path = self.screenshot_dir.join(format!("{}.png", name));
        debug!("Saving screenshot to {}", path.display());
        self.page
            .screenshot(ScreenshotOptions {
                full_page: false,
                path: Some(path),
            })
            .await
    }
}
