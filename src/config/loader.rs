//! Load settings from the environment and the rewrite table from disk.

use crate::config::types::*;
use crate::error::ConfigError;
use serde_json::Value;
use std::path::{Path, PathBuf};

impl Settings {
    /// Read settings from `MOCKREST_*` variables (and `PORT`), falling back to defaults.
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honored.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        let raw_db = std::env::var("MOCKREST_DB").unwrap_or_else(|_| DEFAULT_DB_FILE.into());
        let port = match std::env::var("MOCKREST_PORT").or_else(|_| std::env::var("PORT")) {
            Ok(p) => p
                .parse()
                .map_err(|_| ConfigError::Load(format!("invalid port: {}", p)))?,
            Err(_) => defaults.port,
        };
        let body_limit = match std::env::var("MOCKREST_BODY_LIMIT") {
            Ok(s) => s
                .parse()
                .map_err(|_| ConfigError::Load(format!("invalid body limit: {}", s)))?,
            Err(_) => defaults.body_limit,
        };
        Ok(Settings {
            db_path: resolve_db_path(Path::new(&raw_db)),
            host: std::env::var("MOCKREST_HOST").unwrap_or(defaults.host),
            port,
            routes_path: std::env::var("MOCKREST_ROUTES").ok().map(PathBuf::from),
            id_field: std::env::var("MOCKREST_ID_FIELD").unwrap_or(defaults.id_field),
            read_only: env_flag("MOCKREST_READ_ONLY", defaults.read_only)?,
            persist: env_flag("MOCKREST_PERSIST", defaults.persist)?,
            cors: env_flag("MOCKREST_CORS", defaults.cors)?,
            body_limit,
        })
    }
}

fn env_flag(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(v) => parse_flag(&v).ok_or_else(|| ConfigError::Load(format!("{}: expected a boolean, got '{}'", name, v))),
        Err(_) => Ok(default),
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Resolve the document path. Absolute paths are kept. A relative path is
/// taken from the working directory if the file exists there, else from the
/// executable's directory if it exists there, else from the working directory.
pub fn resolve_db_path(raw: &Path) -> PathBuf {
    if raw.is_absolute() {
        return raw.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf));
    resolve_against(raw, &cwd, exe_dir.as_deref())
}

fn resolve_against(raw: &Path, cwd: &Path, exe_dir: Option<&Path>) -> PathBuf {
    let in_cwd = cwd.join(raw);
    if in_cwd.exists() {
        return in_cwd;
    }
    if let Some(dir) = exe_dir {
        let beside_exe = dir.join(raw);
        if beside_exe.exists() {
            return beside_exe;
        }
    }
    in_cwd
}

/// Parse a rewrite table: a JSON object of `"pattern": "target"` pairs, kept in file order.
pub fn parse_rewrites(json: &str) -> Result<Vec<RewriteRuleConfig>, ConfigError> {
    let value: Value = serde_json::from_str(json).map_err(|e| ConfigError::Load(format!("routes file: {}", e)))?;
    let Value::Object(map) = value else {
        return Err(ConfigError::Validation("routes file must be a JSON object".into()));
    };
    map.into_iter()
        .map(|(pattern, target)| match target {
            Value::String(t) => Ok(RewriteRuleConfig::new(pattern, t)),
            _ => Err(ConfigError::InvalidRewrite {
                pattern,
                reason: "target must be a string".into(),
            }),
        })
        .collect()
}

/// Load the rewrite table from `path`, or the default table when `path` is `None`.
pub async fn load_rewrites(path: Option<&Path>) -> Result<Vec<RewriteRuleConfig>, ConfigError> {
    let Some(path) = path else {
        return Ok(default_rewrites());
    };
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    let rules = parse_rewrites(&text)?;
    tracing::info!(path = %path.display(), rules = rules.len(), "loaded rewrite rules");
    Ok(rules)
}
