//! Error types for E2E scenarios

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("{}", browser_not_found_message(.engine, .os, .checked))]
    BrowserNotFound {
        engine: String,
        os: String,
        checked: Vec<PathBuf>,
    },

    #[error("Page is not initialized. Call init_context() first.")]
    PageNotInitialized,

    #[error("No base URL configured for environment {0}")]
    MissingBaseUrl(String),

    #[error("Playwright bridge error: {0}")]
    Bridge(String),

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Tab not found: {0}")]
    TabNotFound(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Database error: {0}")]
    Database(#[from] itas_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
}

pub type E2eResult<T> = Result<T, E2eError>;

fn browser_not_found_message(engine: &str, os: &str, checked: &[PathBuf]) -> String {
    let mut msg = format!(
        "Browser \"{}\" not found on your system ({}). Please install one of the following browsers:\n\
         \x20 - Google Chrome: https://www.google.com/chrome/\n\
         \x20 - Chromium: https://www.chromium.org/\n\
         \x20 - Firefox: https://www.mozilla.org/firefox/\n\
         \x20 - Microsoft Edge: https://www.microsoft.com/edge\n\
         \x20 - Safari: Pre-installed on macOS\n\
         \nStandard installation paths checked for {}:",
        engine, os, os
    );
    if checked.is_empty() {
        msg.push_str("\n  (none)");
    }
    for path in checked {
        msg.push_str(&format!("\n  - {}", path.display()));
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_not_found_lists_paths() {
        let err = E2eError::BrowserNotFound {
            engine: "firefox".into(),
            os: "Linux".into(),
            checked: vec!["/usr/bin/firefox".into(), "/snap/bin/firefox".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Browser \"firefox\" not found on your system (Linux)"));
        assert!(msg.contains("  - /usr/bin/firefox"));
        assert!(msg.contains("  - /snap/bin/firefox"));
        assert!(msg.contains("https://www.mozilla.org/firefox/"));
    }
}
