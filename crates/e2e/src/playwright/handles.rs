//! Browser, context, page and locator handles
//!
//! Handles are cheap to clone: each one is an id on the bridge side plus a
//! shared transport.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::bridge::Transport;
use super::protocol::{
    describe, ClickOptions, Command, DialogAction, ElementAction, LoadState, ScreenshotOptions,
    Segment, SelectBy, WaitState,
};
use super::Engine;
use crate::error::E2eResult;

async fn call<T: DeserializeOwned>(transport: &dyn Transport, command: Command) -> E2eResult<T> {
    let value = transport.send(command).await?;
    Ok(serde_json::from_value(value)?)
}

struct BrowserInner {
    transport: Arc<dyn Transport>,
    engine: Engine,
    version: String,
    closed: AtomicBool,
}

/// A launched browser process
#[derive(Clone)]
pub struct Browser {
    inner: Arc<BrowserInner>,
}

impl fmt::Debug for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Browser")
            .field("engine", &self.inner.engine)
            .field("version", &self.inner.version)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Browser {
    pub fn new(transport: Arc<dyn Transport>, engine: Engine, version: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(BrowserInner {
                transport,
                engine,
                version: version.into(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn engine(&self) -> Engine {
        self.inner.engine
    }

    pub fn version(&self) -> &str {
        &self.inner.version
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Open an isolated context (own cookies and storage)
    pub async fn new_context(&self) -> E2eResult<BrowserContext> {
        let transport = self.inner.transport.clone();
        let id: String = call(transport.as_ref(), Command::NewContext).await?;
        debug!("Created browser context {}", id);
        Ok(BrowserContext { id, transport })
    }

    /// Close the browser and stop its bridge. Closing twice is a no-op.
    pub async fn close(&self) -> E2eResult<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let closed = self.inner.transport.send(Command::CloseBrowser).await;
        let stopped = self.inner.transport.shutdown().await;
        info!("Closed {} browser", self.inner.engine);
        closed.and(stopped)
    }
}

/// An isolated browsing session owned by a [`Browser`]
#[derive(Clone)]
pub struct BrowserContext {
    id: String,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for BrowserContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserContext").field("id", &self.id).finish()
    }
}

impl BrowserContext {
    pub fn id(&self) -> &str {
        &self.id
    }

    fn page(&self, id: String) -> Page {
        Page {
            id,
            context: self.id.clone(),
            transport: self.transport.clone(),
        }
    }

    pub async fn new_page(&self) -> E2eResult<Page> {
        let id: String = call(
            self.transport.as_ref(),
            Command::NewPage {
                context: self.id.clone(),
            },
        )
        .await?;
        Ok(self.page(id))
    }

    /// Open pages in creation order
    pub async fn pages(&self) -> E2eResult<Vec<Page>> {
        let ids: Vec<String> = call(
            self.transport.as_ref(),
            Command::ContextPages {
                context: self.id.clone(),
            },
        )
        .await?;
        Ok(ids.into_iter().map(|id| self.page(id)).collect())
    }

    /// Start listening for a new page; await it with [`PendingPage::wait`]
    pub async fn expect_page(&self, timeout: Duration) -> E2eResult<PendingPage> {
        let waiter: String = call(
            self.transport.as_ref(),
            Command::ExpectPage {
                context: self.id.clone(),
                timeout_ms: timeout.as_millis() as u64,
            },
        )
        .await?;
        Ok(PendingPage {
            waiter,
            context: self.clone(),
        })
    }

    pub async fn close(&self) -> E2eResult<()> {
        self.transport
            .send(Command::CloseContext {
                context: self.id.clone(),
            })
            .await?;
        debug!("Closed browser context {}", self.id);
        Ok(())
    }
}

/// A page that has not opened yet
#[must_use = "a pending page does nothing unless waited on"]
pub struct PendingPage {
    waiter: String,
    context: BrowserContext,
}

impl PendingPage {
    pub async fn wait(self) -> E2eResult<Page> {
        let id: String = call(
            self.context.transport.as_ref(),
            Command::AwaitPage {
                waiter: self.waiter,
            },
        )
        .await?;
        Ok(self.context.page(id))
    }
}

/// A dialog handler armed for the next dialog on a page
#[must_use = "a pending dialog does nothing unless waited on"]
pub struct PendingDialog {
    waiter: String,
    transport: Arc<dyn Transport>,
}

impl PendingDialog {
    /// Wait for the dialog and return its message
    pub async fn message(self) -> E2eResult<String> {
        call(
            self.transport.as_ref(),
            Command::AwaitDialog {
                waiter: self.waiter,
            },
        )
        .await
    }
}

/// A single tab
#[derive(Clone)]
pub struct Page {
    id: String,
    context: String,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("context", &self.context)
            .finish()
    }
}

impl PartialEq for Page {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.context == other.context
    }
}

impl Page {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The context owning this page
    pub fn context(&self) -> BrowserContext {
        BrowserContext {
            id: self.context.clone(),
            transport: self.transport.clone(),
        }
    }

    async fn call<T: DeserializeOwned>(&self, command: Command) -> E2eResult<T> {
        call(self.transport.as_ref(), command).await
    }

    pub async fn goto(&self, url: &str) -> E2eResult<()> {
        debug!("Navigating {} to {}", self.id, url);
        self.call(Command::Goto {
            page: self.id.clone(),
            url: url.to_string(),
        })
        .await
    }

    pub async fn reload(&self) -> E2eResult<()> {
        self.call(Command::Reload { page: self.id.clone() }).await
    }

    pub async fn go_back(&self) -> E2eResult<()> {
        self.call(Command::GoBack { page: self.id.clone() }).await
    }

    pub async fn go_forward(&self) -> E2eResult<()> {
        self.call(Command::GoForward { page: self.id.clone() }).await
    }

    pub async fn title(&self) -> E2eResult<String> {
        self.call(Command::Title { page: self.id.clone() }).await
    }

    pub async fn url(&self) -> E2eResult<String> {
        self.call(Command::Url { page: self.id.clone() }).await
    }

    pub async fn content(&self) -> E2eResult<String> {
        self.call(Command::Content { page: self.id.clone() }).await
    }

    /// PNG bytes of the page
    pub async fn screenshot(&self, options: ScreenshotOptions) -> E2eResult<Vec<u8>> {
        let encoded: String = self
            .call(Command::Screenshot {
                page: self.id.clone(),
                options,
            })
            .await?;
        Ok(BASE64.decode(encoded)?)
    }

    pub async fn bring_to_front(&self) -> E2eResult<()> {
        self.call(Command::BringToFront { page: self.id.clone() })
            .await
    }

    pub async fn wait_for_timeout(&self, duration: Duration) -> E2eResult<()> {
        self.call(Command::WaitForTimeout {
            page: self.id.clone(),
            ms: duration.as_millis() as u64,
        })
        .await
    }

    pub async fn wait_for_load_state(&self, state: LoadState) -> E2eResult<()> {
        self.call(Command::WaitForLoadState {
            page: self.id.clone(),
            state,
        })
        .await
    }

    pub async fn close(&self) -> E2eResult<()> {
        self.call(Command::ClosePage { page: self.id.clone() }).await
    }

    /// Handle the next dialog this page raises
    pub async fn on_next_dialog(
        &self,
        action: DialogAction,
        timeout: Duration,
    ) -> E2eResult<PendingDialog> {
        let waiter: String = self
            .call(Command::ArmDialog {
                page: self.id.clone(),
                action,
                timeout_ms: timeout.as_millis() as u64,
            })
            .await?;
        Ok(PendingDialog {
            waiter,
            transport: self.transport.clone(),
        })
    }

    pub fn locator(&self, selector: &str) -> Locator {
        Locator {
            page: self.clone(),
            segments: vec![Segment::Locator {
                selector: selector.to_string(),
            }],
        }
    }
}

/// A lazily resolved element query bound to a page
#[derive(Clone, PartialEq)]
pub struct Locator {
    page: Page,
    segments: Vec<Segment>,
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Locator({} on {})", describe(&self.segments), self.page.id)
    }
}

impl Locator {
    fn chain(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self {
            page: self.page.clone(),
            segments,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn selector(&self) -> String {
        describe(&self.segments)
    }

    pub fn locator(&self, selector: &str) -> Self {
        self.chain(Segment::Locator {
            selector: selector.to_string(),
        })
    }

    pub fn nth(&self, index: i32) -> Self {
        self.chain(Segment::Nth { index })
    }

    pub fn first(&self) -> Self {
        self.chain(Segment::First)
    }

    pub fn last(&self) -> Self {
        self.chain(Segment::Last)
    }

    async fn act<T: DeserializeOwned>(&self, action: ElementAction) -> E2eResult<T> {
        self.page
            .call(Command::Element {
                page: self.page.id.clone(),
                segments: self.segments.clone(),
                action,
            })
            .await
    }

    pub async fn fill(&self, value: &str) -> E2eResult<()> {
        self.act(ElementAction::Fill {
            value: value.to_string(),
        })
        .await
    }

    pub async fn clear(&self) -> E2eResult<()> {
        self.act(ElementAction::Clear).await
    }

    /// Focus, then press each character with `delay` between keystrokes
    pub async fn type_text(&self, text: &str, delay: Duration) -> E2eResult<()> {
        self.act(ElementAction::Type {
            text: text.to_string(),
            delay_ms: delay.as_millis() as u64,
        })
        .await
    }

    pub async fn input_value(&self) -> E2eResult<String> {
        self.act(ElementAction::InputValue).await
    }

    pub async fn click(&self, options: ClickOptions) -> E2eResult<()> {
        self.act(ElementAction::Click { options }).await
    }

    pub async fn dblclick(&self) -> E2eResult<()> {
        self.act(ElementAction::DblClick).await
    }

    pub async fn hover(&self) -> E2eResult<()> {
        self.act(ElementAction::Hover).await
    }

    pub async fn select_option(&self, values: &[&str], by: SelectBy) -> E2eResult<()> {
        self.act(ElementAction::SelectOption {
            values: values.iter().map(|v| v.to_string()).collect(),
            by,
        })
        .await
    }

    /// Values of the selected `<option>` elements
    pub async fn selected_options(&self) -> E2eResult<Vec<String>> {
        self.act(ElementAction::SelectedOptions).await
    }

    pub async fn check(&self) -> E2eResult<()> {
        self.act(ElementAction::Check).await
    }

    pub async fn uncheck(&self) -> E2eResult<()> {
        self.act(ElementAction::Uncheck).await
    }

    pub async fn is_checked(&self) -> E2eResult<bool> {
        self.act(ElementAction::IsChecked).await
    }

    pub async fn is_visible(&self) -> E2eResult<bool> {
        self.act(ElementAction::IsVisible).await
    }

    pub async fn is_enabled(&self) -> E2eResult<bool> {
        self.act(ElementAction::IsEnabled).await
    }

    pub async fn is_disabled(&self) -> E2eResult<bool> {
        self.act(ElementAction::IsDisabled).await
    }

    /// Text content, empty when the element has none
    pub async fn text_content(&self) -> E2eResult<String> {
        self.act(ElementAction::TextContent).await
    }

    pub async fn all_text_contents(&self) -> E2eResult<Vec<String>> {
        self.act(ElementAction::AllTextContents).await
    }

    pub async fn get_attribute(&self, name: &str) -> E2eResult<Option<String>> {
        self.act(ElementAction::GetAttribute {
            name: name.to_string(),
        })
        .await
    }

    pub async fn wait_for(&self, state: WaitState, timeout: Duration) -> E2eResult<()> {
        self.act(ElementAction::WaitFor {
            state,
            timeout_ms: timeout.as_millis() as u64,
        })
        .await
    }

    pub async fn scroll_into_view(&self) -> E2eResult<()> {
        self.act(ElementAction::ScrollIntoView).await
    }

    pub async fn count(&self) -> E2eResult<usize> {
        self.act(ElementAction::Count).await
    }

    pub async fn press(&self, key: &str) -> E2eResult<()> {
        self.act(ElementAction::Press {
            key: key.to_string(),
        })
        .await
    }

    pub async fn focus(&self) -> E2eResult<()> {
        self.act(ElementAction::Focus).await
    }

    pub async fn blur(&self) -> E2eResult<()> {
        self.act(ElementAction::Blur).await
    }

    pub async fn drag_to(&self, target: &Locator) -> E2eResult<()> {
        self.act(ElementAction::DragTo {
            target: target.segments.clone(),
        })
        .await
    }

    /// Replace the selected files; an empty list clears the input
    pub async fn set_input_files(&self, files: &[PathBuf]) -> E2eResult<()> {
        self.act(ElementAction::SetInputFiles {
            files: files.to_vec(),
        })
        .await
    }
}
