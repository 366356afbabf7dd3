//! Wire protocol spoken with the Node.js bridge
//!
//! Every request is one JSON object per line tagged by `op`; every reply is
//! `{"id", "ok", "result" | "error"}`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Engine;

/// One step of a chained locator, applied left to right starting at the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    Locator { selector: String },
    Nth { index: i32 },
    First,
    Last,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button: Option<MouseButton>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitState {
    Visible,
    Hidden,
    Attached,
    Detached,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Load,
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    #[serde(rename = "networkidle")]
    NetworkIdle,
}

/// Match `<option>` elements by visible label or by value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectBy {
    Label,
    Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DialogAction {
    Accept,
    Dismiss,
    Prompt { text: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotOptions {
    pub full_page: bool,
    /// Also written here by the browser side
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ElementAction {
    Fill { value: String },
    Clear,
    Type { text: String, delay_ms: u64 },
    InputValue,
    Click { options: ClickOptions },
    DblClick,
    Hover,
    SelectOption { values: Vec<String>, by: SelectBy },
    SelectedOptions,
    Check,
    Uncheck,
    IsChecked,
    IsVisible,
    IsEnabled,
    IsDisabled,
    TextContent,
    AllTextContents,
    GetAttribute { name: String },
    WaitFor { state: WaitState, timeout_ms: u64 },
    ScrollIntoView,
    Count,
    Press { key: String },
    Focus,
    Blur,
    DragTo { target: Vec<Segment> },
    SetInputFiles { files: Vec<PathBuf> },
}

impl ElementAction {
    pub fn name(&self) -> &'static str {
        match self {
            ElementAction::Fill { .. } => "fill",
            ElementAction::Clear => "clear",
            ElementAction::Type { .. } => "type",
            ElementAction::InputValue => "input_value",
            ElementAction::Click { .. } => "click",
            ElementAction::DblClick => "dblclick",
            ElementAction::Hover => "hover",
            ElementAction::SelectOption { .. } => "select_option",
            ElementAction::SelectedOptions => "selected_options",
            ElementAction::Check => "check",
            ElementAction::Uncheck => "uncheck",
            ElementAction::IsChecked => "is_checked",
            ElementAction::IsVisible => "is_visible",
            ElementAction::IsEnabled => "is_enabled",
            ElementAction::IsDisabled => "is_disabled",
            ElementAction::TextContent => "text_content",
            ElementAction::AllTextContents => "all_text_contents",
            ElementAction::GetAttribute { .. } => "get_attribute",
            ElementAction::WaitFor { .. } => "wait_for",
            ElementAction::ScrollIntoView => "scroll_into_view",
            ElementAction::Count => "count",
            ElementAction::Press { .. } => "press",
            ElementAction::Focus => "focus",
            ElementAction::Blur => "blur",
            ElementAction::DragTo { .. } => "drag_to",
            ElementAction::SetInputFiles { .. } => "set_input_files",
        }
    }
}

/// A request to the bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    Launch {
        engine: Engine,
        headless: bool,
        executable_path: Option<PathBuf>,
        timeout_ms: u64,
    },
    CloseBrowser,
    NewContext,
    CloseContext { context: String },
    NewPage { context: String },
    ContextPages { context: String },
    ExpectPage { context: String, timeout_ms: u64 },
    AwaitPage { waiter: String },
    Goto { page: String, url: String },
    Reload { page: String },
    GoBack { page: String },
    GoForward { page: String },
    Title { page: String },
    Url { page: String },
    Content { page: String },
    Screenshot { page: String, options: ScreenshotOptions },
    BringToFront { page: String },
    WaitForTimeout { page: String, ms: u64 },
    WaitForLoadState { page: String, state: LoadState },
    ClosePage { page: String },
    ArmDialog { page: String, action: DialogAction, timeout_ms: u64 },
    AwaitDialog { waiter: String },
    Element {
        page: String,
        segments: Vec<Segment>,
        #[serde(flatten)]
        action: ElementAction,
    },
    Shutdown,
}

impl Command {
    /// Short label for logs
    pub fn label(&self) -> String {
        match self {
            Command::Element { action, segments, .. } => {
                format!("element.{} {}", action.name(), describe(segments))
            }
            other => serde_json::to_value(other)
                .ok()
                .and_then(|v| v.get("op").and_then(Value::as_str).map(String::from))
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

/// Human-readable form of a locator chain
pub fn describe(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| match s {
            Segment::Locator { selector } => selector.clone(),
            Segment::Nth { index } => format!("nth={}", index),
            Segment::First => "first".to_string(),
            Segment::Last => "last".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" >> ")
}

#[derive(Debug, Clone, Serialize)]
pub struct Request<'a> {
    pub id: u64,
    #[serde(flatten)]
    pub command: &'a Command,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Reply {
    pub id: u64,
    pub ok: bool,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<String>,
    /// `timeout` when Playwright raised a TimeoutError
    #[serde(default)]
    pub kind: Option<String>,
}
