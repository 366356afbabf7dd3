use std::time::Duration;

use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::playwright::{ClickOptions, Page, WaitState};

const FALLBACK_BASE_URL: &str = "https://example.com";
const DASHBOARD_TIMEOUT: Duration = Duration::from_secs(5);

/// Absolute URL for `path`, relative to `base` when it is not already absolute
pub fn resolve_url(base: Option<&str>, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.unwrap_or(FALLBACK_BASE_URL);
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// The application sign-in screen
#[derive(Debug, Clone)]
pub struct LoginPage {
    page: Page,
    base_url: Option<String>,
}

impl LoginPage {
    pub fn new(page: Page, base_url: Option<String>) -> Self {
        Self { page, base_url }
    }

    pub async fn goto(&self, path: &str) -> E2eResult<()> {
        let url = resolve_url(self.base_url.as_deref(), path);
        debug!("Opening login page at {}", url);
        self.page.goto(&url).await
    }

    pub async fn login(&self, username: &str, password: &str) -> E2eResult<()> {
        self.page.locator("#username").fill(username).await?;
        self.page.locator("#password").fill(password).await?;
        self.page
            .locator("#login")
            .click(ClickOptions::default())
            .await
    }

    pub async fn assert_dashboard_visible(&self) -> E2eResult<()> {
        self.page
            .locator("#dashboard")
            .wait_for(WaitState::Visible, DASHBOARD_TIMEOUT)
            .await
            .map_err(|e| match e {
                E2eError::Timeout(_) => E2eError::AssertionFailed(format!(
                    "#dashboard was not visible within {} s",
                    DASHBOARD_TIMEOUT.as_secs()
                )),
                other => other,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playwright::protocol::{Command, ElementAction};
    use crate::testing::FakeTransport;
    use test_case::test_case;

    async fn login_page(base_url: Option<&str>) -> (std::sync::Arc<FakeTransport>, LoginPage) {
        let transport = FakeTransport::new();
        let page = transport
            .browser()
            .new_context()
            .await
            .unwrap()
            .new_page()
            .await
            .unwrap();
        (
            transport,
            LoginPage::new(page, base_url.map(String::from)),
        )
    }

    #[test_case(Some("https://itas.test"), "/" => "https://itas.test/")]
    #[test_case(Some("https://itas.test/"), "/login" => "https://itas.test/login")]
    #[test_case(Some("https://itas.test"), "login" => "https://itas.test/login")]
    #[test_case(None, "/login" => "https://example.com/login")]
    #[test_case(Some("https://itas.test"), "https://sso.test/auth" => "https://sso.test/auth")]
    fn test_resolve_url(base: Option<&str>, path: &str) -> String {
        resolve_url(base, path)
    }

    #[tokio::test]
    async fn test_goto_uses_base_url() {
        let (transport, page) = login_page(Some("https://itas.test")).await;
        page.goto("/").await.unwrap();
        let commands = transport.commands();
        assert!(matches!(commands.last(), Some(Command::Goto { url, .. }) if url == "https://itas.test/"));
    }

    #[tokio::test]
    async fn test_login_fills_and_submits() {
        let (transport, page) = login_page(Some("https://itas.test")).await;
        page.login("qa@example.com", "pw").await.unwrap();

        let actions: Vec<ElementAction> = transport
            .commands()
            .into_iter()
            .filter_map(|c| match c {
                Command::Element { action, .. } => Some(action),
                _ => None,
            })
            .collect();
        assert_eq!(actions.len(), 3);
        assert!(matches!(&actions[0], ElementAction::Fill { value } if value == "qa@example.com"));
        assert!(matches!(&actions[1], ElementAction::Fill { value } if value == "pw"));
        assert!(matches!(&actions[2], ElementAction::Click { .. }));
    }

    #[tokio::test]
    async fn test_dashboard_timeout_is_an_assertion_failure() {
        let (transport, page) = login_page(Some("https://itas.test")).await;
        transport.time_out("element.wait_for");

        let err = page.assert_dashboard_visible().await.unwrap_err();
        assert!(matches!(err, E2eError::AssertionFailed(_)));
        assert!(err.to_string().contains("#dashboard"));
    }
}
