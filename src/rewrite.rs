//! Path rewrite table applied to requests before routing.
//!
//! Patterns are literal paths with two kinds of placeholders: `*` matches any
//! run of characters and is referenced in the target as `$1`, `$2`, ... in
//! order of appearance; `:name` matches one path segment and is referenced as
//! `:name`. The first matching rule wins and the query string is kept.

use crate::config::RewriteRuleConfig;
use crate::error::ConfigError;
use axum::http::{uri::PathAndQuery, Request, Uri};
use regex::{Captures, Regex};

#[derive(Clone, Debug)]
pub struct RewriteRule {
    pattern: String,
    matcher: Regex,
    target: String,
    /// Matches `$N` and `:name` references in the target.
    placeholders: Regex,
}

impl RewriteRule {
    pub fn compile(config: &RewriteRuleConfig) -> Result<Self, ConfigError> {
        let pattern = &config.pattern;
        if !pattern.starts_with('/') {
            return Err(ConfigError::InvalidRewrite {
                pattern: pattern.clone(),
                reason: "pattern must start with '/'".into(),
            });
        }
        let param_re = Regex::new(r"^:([A-Za-z_][A-Za-z0-9_]*)").map_err(|e| invalid(pattern, e))?;
        let placeholders =
            Regex::new(r"\$([0-9]+)|:([A-Za-z_][A-Za-z0-9_]*)").map_err(|e| invalid(pattern, e))?;
        let mut src = String::from("^");
        let mut rest = pattern.as_str();
        while let Some(c) = rest.chars().next() {
            if c == '*' {
                src.push_str("(.*)");
                rest = &rest[1..];
            } else if let Some(m) = param_re.captures(rest) {
                let name = m[1].to_string();
                src.push_str(&format!("(?P<{}>[^/]+)", name));
                rest = &rest[m[0].len()..];
            } else {
                src.push_str(&regex::escape(&c.to_string()));
                rest = &rest[c.len_utf8()..];
            }
        }
        src.push('$');
        let matcher = Regex::new(&src).map_err(|e| invalid(pattern, e))?;
        Ok(Self {
            pattern: pattern.clone(),
            matcher,
            target: config.target.clone(),
            placeholders,
        })
    }

    /// Rewritten path if `path` matches this rule.
    pub fn apply(&self, path: &str) -> Option<String> {
        let caps = self.matcher.captures(path)?;
        let out = self.expand(&caps);
        tracing::trace!(rule = %self.pattern, from = path, to = %out, "rewrite");
        Some(out)
    }

    /// Substitute captures into the target in one pass; captured text is never re-expanded.
    /// References to unknown names or indices stay literal.
    fn expand(&self, caps: &Captures<'_>) -> String {
        // Unnamed groups are the `*` wildcards, numbered from 1.
        let wildcards: Vec<&str> = caps
            .iter()
            .zip(self.matcher.capture_names())
            .skip(1)
            .filter(|(_, name)| name.is_none())
            .map(|(m, _)| m.map_or("", |m| m.as_str()))
            .collect();
        self.placeholders
            .replace_all(&self.target, |t: &Captures<'_>| {
                let value = match (t.get(1), t.get(2)) {
                    (Some(index), _) => index
                        .as_str()
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| i.checked_sub(1))
                        .and_then(|i| wildcards.get(i).copied()),
                    (None, Some(name)) => caps.name(name.as_str()).map(|m| m.as_str()),
                    (None, None) => None,
                };
                value.unwrap_or(&t[0]).to_string()
            })
            .into_owned()
    }
}

fn invalid(pattern: &str, e: regex::Error) -> ConfigError {
    ConfigError::InvalidRewrite {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    }
}

/// Ordered rewrite rules.
#[derive(Clone, Debug, Default)]
pub struct RewriteTable {
    rules: Vec<RewriteRule>,
}

impl RewriteTable {
    pub fn compile(configs: &[RewriteRuleConfig]) -> Result<Self, ConfigError> {
        let rules = configs.iter().map(RewriteRule::compile).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rewrite a path with the first matching rule, or None when no rule matches.
    pub fn rewrite_path(&self, path: &str) -> Option<String> {
        self.rules.iter().find_map(|r| r.apply(path))
    }

    /// Rewrite a URI's path, keeping its query. Returns None when no rule matches.
    pub fn rewrite_uri(&self, uri: &Uri) -> Option<Uri> {
        let mut path = self.rewrite_path(uri.path())?;
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        let path_and_query = match uri.query() {
            Some(q) => format!("{}?{}", path, q),
            None => path,
        };
        let mut parts = uri.clone().into_parts();
        parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
        Uri::from_parts(parts).ok()
    }

    /// Rewrite a request in place. Requests no rule matches pass through unchanged.
    pub fn rewrite_request<B>(&self, mut req: Request<B>) -> Request<B> {
        if let Some(uri) = self.rewrite_uri(req.uri()) {
            *req.uri_mut() = uri;
        }
        req
    }
}
