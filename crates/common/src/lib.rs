//! ITAS Common Library
//!
//! Configuration, database access and test-data utilities shared by the
//! ITAS UI test harness.

pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod fake;
pub mod query_cache;

// Re-export commonly used types
pub use config::{BrowserSettings, Config, Credentials, DbConfig, Environment, TlsMode};
pub use dates::DateUtil;
pub use db::{DbClient, DbConnector, DefaultConnector, Params, Row, SqlValue};
pub use error::{Error, Result};
pub use fake::FakeData;
pub use query_cache::{QueryCache, StoredResult};

/// ITAS version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
