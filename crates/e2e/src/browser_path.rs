//! Browser executable discovery
//!
//! Resolves a filesystem path for a named browser engine in two phases:
//! well-known install locations for the host OS first, then a `where`/`which`
//! shell lookup over the engine's binary names in priority order.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};

/// Operating system family, as far as discovery cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOs {
    MacOs,
    Windows,
    Linux,
    Other(String),
}

impl HostOs {
    pub fn current() -> Self {
        Self::from_consts(std::env::consts::OS)
    }

    pub fn from_consts(os: &str) -> Self {
        match os {
            "macos" => HostOs::MacOs,
            "windows" => HostOs::Windows,
            "linux" => HostOs::Linux,
            other => HostOs::Other(other.to_string()),
        }
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostOs::MacOs => f.write_str("macOS"),
            HostOs::Windows => f.write_str("Windows"),
            HostOs::Linux => f.write_str("Linux"),
            HostOs::Other(name) => f.write_str(name),
        }
    }
}

/// Filesystem and shell access used during discovery
#[async_trait]
pub trait HostAccess: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Resolve a binary name through the OS lookup command
    async fn lookup(&self, os: &HostOs, name: &str) -> Option<PathBuf>;
}

/// Real filesystem plus `where` (Windows) or `which` (everything else)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAccess;

#[async_trait]
impl HostAccess for SystemAccess {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    async fn lookup(&self, os: &HostOs, name: &str) -> Option<PathBuf> {
        let program = match os {
            HostOs::Windows => "where",
            _ => "which",
        };
        let output = Command::new(program).arg(name).output().await.ok()?;
        if !output.status.success() {
            return None;
        }
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(PathBuf::from)
    }
}

/// Stateless browser executable locator
#[derive(Clone)]
pub struct BrowserLocator {
    access: Arc<dyn HostAccess>,
    os: HostOs,
    home: Option<PathBuf>,
}

impl fmt::Debug for BrowserLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserLocator")
            .field("os", &self.os)
            .field("home", &self.home)
            .finish()
    }
}

impl Default for BrowserLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserLocator {
    /// Locator for the current host
    pub fn new() -> Self {
        Self::with_access(Arc::new(SystemAccess), HostOs::current(), dirs::home_dir())
    }

    pub fn with_access(access: Arc<dyn HostAccess>, os: HostOs, home: Option<PathBuf>) -> Self {
        Self { access, os, home }
    }

    pub fn os(&self) -> &HostOs {
        &self.os
    }

    /// Ordered install locations for `engine` on this OS
    pub fn candidates(&self, engine: &str) -> Vec<PathBuf> {
        let engine = engine.to_lowercase();
        let (system, per_user): (&[&str], &[&str]) = match (&self.os, engine.as_str()) {
            (HostOs::MacOs, "chromium") => (
                &[
                    "/Applications/Chromium.app/Contents/MacOS/Chromium",
                    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
                ],
                &[
                    "Applications/Chromium.app/Contents/MacOS/Chromium",
                    "Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
                ],
            ),
            (HostOs::MacOs, "chrome") => (
                &[
                    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
                    "/Applications/Chromium.app/Contents/MacOS/Chromium",
                ],
                &[
                    "Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
                    "Applications/Chromium.app/Contents/MacOS/Chromium",
                ],
            ),
            (HostOs::MacOs, "firefox") => (
                &["/Applications/Firefox.app/Contents/MacOS/firefox"],
                &["Applications/Firefox.app/Contents/MacOS/firefox"],
            ),
            (HostOs::MacOs, "webkit" | "safari") => (
                &["/Applications/Safari.app/Contents/MacOS/Safari"],
                &["Applications/Safari.app/Contents/MacOS/Safari"],
            ),
            (HostOs::MacOs, "edge") => (
                &["/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge"],
                &["Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge"],
            ),
            (HostOs::Windows, "chromium") => (
                &[
                    r"C:\Program Files\Chromium\Application\chrome.exe",
                    r"C:\Program Files (x86)\Chromium\Application\chrome.exe",
                ],
                &[
                    r"AppData\Local\Chromium\Application\chrome.exe",
                    r"AppData\Local\Google\Chrome\Application\chrome.exe",
                ],
            ),
            (HostOs::Windows, "chrome") => (
                &[
                    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
                    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
                ],
                &[r"AppData\Local\Google\Chrome\Application\chrome.exe"],
            ),
            (HostOs::Windows, "firefox") => (
                &[
                    r"C:\Program Files\Mozilla Firefox\firefox.exe",
                    r"C:\Program Files (x86)\Mozilla Firefox\firefox.exe",
                ],
                &[r"AppData\Local\Mozilla Firefox\firefox.exe"],
            ),
            (HostOs::Windows, "webkit") => (
                &[
                    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
                    r"C:\Program Files\Microsoft\Edge\Application\msedge.exe",
                ],
                &[],
            ),
            (HostOs::Windows, "edge") => (
                &[
                    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
                    r"C:\Program Files\Microsoft\Edge\Application\msedge.exe",
                ],
                &[r"AppData\Local\Microsoft\Edge\Application\msedge.exe"],
            ),
            (HostOs::Windows, "safari") => (
                &[
                    r"C:\Program Files\Apple\Safari\Safari.exe",
                    r"C:\Program Files (x86)\Apple\Safari\Safari.exe",
                ],
                &[],
            ),
            (HostOs::Linux, "chromium") => (
                &["/usr/bin/chromium", "/usr/bin/chromium-browser", "/snap/bin/chromium"],
                &[],
            ),
            (HostOs::Linux, "chrome") => (
                &[
                    "/usr/bin/google-chrome",
                    "/usr/bin/google-chrome-stable",
                    "/snap/bin/chromium",
                ],
                &[],
            ),
            (HostOs::Linux, "firefox") => (&["/usr/bin/firefox", "/snap/bin/firefox"], &[]),
            (HostOs::Linux, "webkit") => (&["/usr/bin/epiphany", "/usr/bin/midori"], &[]),
            (HostOs::Linux, "edge") => (
                &[
                    "/usr/bin/microsoft-edge",
                    "/usr/bin/microsoft-edge-stable",
                    "/snap/bin/microsoft-edge",
                ],
                &[],
            ),
            _ => (&[], &[]),
        };

        let mut paths: Vec<PathBuf> = system.iter().map(PathBuf::from).collect();
        if let Some(home) = &self.home {
            paths.extend(per_user.iter().map(|rel| home.join(rel)));
        }
        paths
    }

    /// Binary names tried by the shell lookup, in priority order
    pub fn shell_names(&self, engine: &str) -> Vec<String> {
        let engine = engine.to_lowercase();
        let names: &[&str] = match (&self.os, engine.as_str()) {
            (HostOs::Windows, "firefox") => &["firefox", "firefox.exe"],
            (HostOs::Windows, "chrome" | "chromium") => &["chrome", "chrome.exe", "google-chrome"],
            (HostOs::Windows, "edge") => &["msedge", "msedge.exe"],
            (HostOs::Windows, "safari") => &["safari", "safari.exe"],
            (_, "firefox") => &["firefox", "Firefox"],
            (_, "chrome" | "chromium") => &["google-chrome", "chromium", "google-chrome-stable"],
            (_, "edge") => &["microsoft-edge", "microsoft-edge-stable"],
            (_, "safari") => &["safari"],
            _ => return vec![engine],
        };
        names.iter().map(|n| n.to_string()).collect()
    }

    /// Find an executable for `engine`
    pub async fn locate(&self, engine: &str) -> E2eResult<PathBuf> {
        let engine = engine.to_lowercase();
        let checked = self.candidates(&engine);

        if let Some(path) = checked.iter().find(|p| self.access.exists(p)) {
            info!("Found {} at: {}", engine, path.display());
            return Ok(path.clone());
        }

        for name in self.shell_names(&engine) {
            debug!("Looking up {} on PATH", name);
            if let Some(path) = self.access.lookup(&self.os, &name).await {
                info!("Found {} at: {}", engine, path.display());
                return Ok(path);
            }
        }
        warn!("Could not find {} using system search command", engine);

        Err(E2eError::BrowserNotFound {
            engine,
            os: self.os.to_string(),
            checked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};

    #[derive(Default)]
    struct FakeAccess {
        present: HashSet<PathBuf>,
        on_path: HashMap<String, PathBuf>,
        lookups: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HostAccess for FakeAccess {
        fn exists(&self, path: &Path) -> bool {
            self.present.contains(path)
        }

        async fn lookup(&self, _os: &HostOs, name: &str) -> Option<PathBuf> {
            self.lookups.lock().push(name.to_string());
            self.on_path.get(name).cloned()
        }
    }

    fn locator(access: Arc<FakeAccess>, os: HostOs) -> BrowserLocator {
        BrowserLocator::with_access(access, os, Some(PathBuf::from("/home/qa")))
    }

    #[tokio::test]
    async fn test_install_path_skips_shell() {
        let access = Arc::new(FakeAccess {
            present: HashSet::from([PathBuf::from("/snap/bin/chromium")]),
            ..Default::default()
        });
        let found = locator(access.clone(), HostOs::Linux)
            .locate("Chromium")
            .await
            .unwrap();
        assert_eq!(found, PathBuf::from("/snap/bin/chromium"));
        assert!(access.lookups.lock().is_empty());
    }

    #[tokio::test]
    async fn test_shell_fallback_in_priority_order() {
        let access = Arc::new(FakeAccess {
            on_path: HashMap::from([(
                "chromium".to_string(),
                PathBuf::from("/opt/chromium/chrome"),
            )]),
            ..Default::default()
        });
        let found = locator(access.clone(), HostOs::Linux)
            .locate("chromium")
            .await
            .unwrap();
        assert_eq!(found, PathBuf::from("/opt/chromium/chrome"));
        assert_eq!(*access.lookups.lock(), ["google-chrome", "chromium"]);
    }

    #[tokio::test]
    async fn test_not_found_lists_every_checked_path() {
        let access = Arc::new(FakeAccess::default());
        let err = locator(access, HostOs::MacOs).locate("firefox").await.unwrap_err();
        match err {
            E2eError::BrowserNotFound { engine, os, checked } => {
                assert_eq!(engine, "firefox");
                assert_eq!(os, "macOS");
                assert_eq!(
                    checked,
                    [
                        PathBuf::from("/Applications/Firefox.app/Contents/MacOS/firefox"),
                        PathBuf::from("/home/qa/Applications/Firefox.app/Contents/MacOS/firefox"),
                    ]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_os_still_tries_shell() {
        let access = Arc::new(FakeAccess {
            on_path: HashMap::from([("firefox".to_string(), PathBuf::from("/usr/local/bin/firefox"))]),
            ..Default::default()
        });
        let locator = locator(access, HostOs::from_consts("freebsd"));
        assert!(locator.candidates("firefox").is_empty());
        assert_eq!(
            locator.locate("firefox").await.unwrap(),
            PathBuf::from("/usr/local/bin/firefox")
        );
    }

    #[tokio::test]
    async fn test_unknown_engine_uses_its_own_name() {
        let access = Arc::new(FakeAccess::default());
        let locator = locator(access.clone(), HostOs::Linux);
        assert!(locator.candidates("opera").is_empty());
        assert!(locator.locate("opera").await.is_err());
        assert_eq!(*access.lookups.lock(), ["opera"]);
    }

    #[test]
    fn test_per_user_paths_need_a_home() {
        let locator =
            BrowserLocator::with_access(Arc::new(FakeAccess::default()), HostOs::Windows, None);
        assert_eq!(locator.candidates("chrome").len(), 2);
        assert_eq!(locator.shell_names("chrome"), ["chrome", "chrome.exe", "google-chrome"]);
    }
}
