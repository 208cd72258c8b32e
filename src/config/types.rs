//! Runtime settings and the raw rewrite table shape.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default id field name for records.
pub const DEFAULT_ID_FIELD: &str = "id";
/// Default request body limit (10 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_FILE: &str = "db.json";

#[derive(Clone, Debug)]
pub struct Settings {
    /// Resolved path of the JSON document.
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Optional rewrite table file; the built-in `/api/*` rule applies when unset.
    pub routes_path: Option<PathBuf>,
    pub id_field: String,
    pub read_only: bool,
    /// When false, mutations stay in memory and the file is never written.
    pub persist: bool,
    pub cors: bool,
    pub body_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE),
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            routes_path: None,
            id_field: DEFAULT_ID_FIELD.into(),
            read_only: false,
            persist: true,
            cors: true,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl Settings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// One `pattern -> target` entry of a rewrite table file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRuleConfig {
    pub pattern: String,
    pub target: String,
}

impl RewriteRuleConfig {
    pub fn new(pattern: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            target: target.into(),
        }
    }
}

/// Rewrite table used when no routes file is configured.
pub fn default_rewrites() -> Vec<RewriteRuleConfig> {
    vec![RewriteRuleConfig::new("/api/*", "/$1")]
}
