//! Process-wide harness configuration
//!
//! The configuration is resolved once at process start (normally from the
//! environment) and then handed to every component by value or `Arc`.
//! Nothing below the BDD entry point reads the environment on its own.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Deployment environment selecting the base URL under test
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Dev,
    Stg,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Stg => "stg",
            Environment::Prod => "prod",
        }
    }

    /// Name of the variable holding this environment's base URL
    fn base_url_var(&self) -> &'static str {
        match self {
            Environment::Dev => "DEV_BASE_URL",
            Environment::Stg => "STG_BASE_URL",
            Environment::Prod => "PROD_BASE_URL",
        }
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "stg" => Ok(Environment::Stg),
            "prod" => Ok(Environment::Prod),
            other => Err(Error::InvalidConfig(format!(
                "ENV must be one of dev, stg, prod (got \"{}\")",
                other
            ))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relational database connection parameters
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    pub password: String,
    pub name: String,
    /// Encrypt the connection (`DB_ENCRYPT`)
    pub encrypt: bool,
    /// Accept any server certificate (`DB_TRUST_SERVER_CERTIFICATE`)
    pub trust_server_certificate: bool,
}

/// How a database connection is secured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    Disabled,
    /// Certificate chain and host name are checked
    Verified,
    /// Encrypted, but the server certificate is taken on trust
    TrustServerCertificate,
}

impl DbConfig {
    pub fn tls_mode(&self) -> TlsMode {
        match (self.encrypt, self.trust_server_certificate) {
            (false, _) => TlsMode::Disabled,
            (true, false) => TlsMode::Verified,
            (true, true) => TlsMode::TrustServerCertificate,
        }
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("encrypt", &self.encrypt)
            .field("trust_server_certificate", &self.trust_server_certificate)
            .finish()
    }
}

/// A username/password pair
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Browser launch settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserSettings {
    /// Lower-cased engine name as configured (e.g. `chromium`, `firefox`, `edge`)
    pub name: String,
    pub headless: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            name: "chromium".to_string(),
            headless: true,
        }
    }
}

/// Harness configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub env: Environment,

    /// Base URL for the selected environment, if one was provided
    pub base_url: Option<String>,

    /// Database parameters; `None` when `DB_HOST` is unset
    pub db: Option<DbConfig>,

    /// Default application login
    pub default_credentials: Credentials,

    pub browser: BrowserSettings,

    /// Directory receiving screenshots and machine-readable reports
    pub report_dir: PathBuf,

    /// Maximum number of scenarios executed concurrently
    pub parallel: usize,

    /// Default timeout for browser operations
    pub step_timeout: Duration,

    /// Directory containing the `playwright` npm package
    pub playwright_node_path: PathBuf,

    /// Node.js executable used to host the Playwright bridge
    pub node_binary: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env: Environment::Dev,
            base_url: None,
            db: None,
            default_credentials: Credentials::default(),
            browser: BrowserSettings::default(),
            report_dir: PathBuf::from("reports"),
            parallel: 2,
            step_timeout: Duration::from_millis(60_000),
            playwright_node_path: PathBuf::from("node_modules"),
            node_binary: PathBuf::from("node"),
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let env = match var("ENV") {
            Some(raw) => raw.parse()?,
            None => Environment::Dev,
        };
        let base_url = var(env.base_url_var());

        let db = match var("DB_HOST") {
            Some(host) => Some(DbConfig {
                host,
                port: var("DB_PORT").map(|p| parse_number("DB_PORT", &p)).transpose()?,
                user: var("DB_USER").unwrap_or_default(),
                password: var("DB_PASS").unwrap_or_default(),
                name: var("DB_NAME").unwrap_or_default(),
                encrypt: lookup("DB_ENCRYPT").as_deref() != Some("false"),
                trust_server_certificate: lookup("DB_TRUST_SERVER_CERTIFICATE").as_deref()
                    != Some("false"),
            }),
            None => None,
        };

        let default_credentials = Credentials {
            username: var("APP_USERNAME").unwrap_or_default(),
            password: var("APP_PASSWORD").unwrap_or_default(),
        };

        let browser = BrowserSettings {
            name: var("BROWSER")
                .map(|b| b.trim().to_lowercase())
                .unwrap_or(defaults.browser.name),
            // Only an explicit "false" turns headless mode off
            headless: lookup("HEADLESS").as_deref() != Some("false"),
        };

        let parallel = match var("PARALLEL") {
            Some(p) => parse_number::<usize>("PARALLEL", &p)?.max(1),
            None => defaults.parallel,
        };
        let step_timeout = match var("STEP_TIMEOUT_MS") {
            Some(ms) => Duration::from_millis(parse_number("STEP_TIMEOUT_MS", &ms)?),
            None => defaults.step_timeout,
        };

        Ok(Self {
            env,
            base_url,
            db,
            default_credentials,
            browser,
            report_dir: var("REPORT_DIR").map(PathBuf::from).unwrap_or(defaults.report_dir),
            parallel,
            step_timeout,
            playwright_node_path: var("PLAYWRIGHT_NODE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.playwright_node_path),
            node_binary: var("NODE_BINARY").map(PathBuf::from).unwrap_or(defaults.node_binary),
        })
    }

    /// Directory where screenshots are written
    pub fn screenshot_dir(&self) -> PathBuf {
        self.report_dir.join("screenshots")
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("{} must be a number (got \"{}\")", key, raw)))
}
