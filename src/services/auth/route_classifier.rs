//! Route access policy: decides whether a (path, method) needs authentication.
//!
//! Rules are evaluated in declared order and the first match wins. A request that no
//! rule matches requires authentication.
//!
//! Pattern syntax (case-sensitive, matched per path segment):
//! - `**` any number of segments, including none
//! - `*`  any characters inside one segment
//! - `?`  exactly one character inside one segment
//! - a pattern without wildcards is a segment-wise prefix
//!   (`/api/auth` matches `/api/auth/login`, not `/api/authx`)

use axum::http::Method;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    Public,
    RequiresAuth,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteRuleError {
    #[error("empty route rule")]
    Empty,
    #[error("route pattern must start with '/': {0}")]
    NotAbsolute(String),
    #[error("invalid HTTP method in route rule: {0}")]
    InvalidMethod(String),
    #[error("'**' must be a whole path segment: {0}")]
    InvalidDoubleWildcard(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    AnyPath,
    Glob(Vec<char>),
    Literal(String),
}

impl Segment {
    fn matches(&self, segment: &str) -> bool {
        match self {
            Segment::AnyPath => true,
            Segment::Literal(lit) => lit == segment,
            Segment::Glob(pattern) => {
                let text: Vec<char> = segment.chars().collect();
                wildcard_match(pattern, &text)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pattern: String,
    segments: Vec<Segment>,
    prefix: bool,
    method: Option<Method>,
    policy: AccessPolicy,
}

impl RouteRule {
    pub fn new(pattern: &str, policy: AccessPolicy) -> Result<Self, RouteRuleError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(RouteRuleError::Empty);
        }
        if !pattern.starts_with('/') {
            return Err(RouteRuleError::NotAbsolute(pattern.to_string()));
        }

        let normalized = normalize_path(pattern);
        let mut segments = Vec::new();
        for raw in split_segments(&normalized) {
            let segment = if raw == "**" {
                Segment::AnyPath
            } else if raw.contains("**") {
                return Err(RouteRuleError::InvalidDoubleWildcard(pattern.to_string()));
            } else if raw.contains(['*', '?']) {
                Segment::Glob(raw.chars().collect())
            } else {
                Segment::Literal(raw.to_string())
            };
            segments.push(segment);
        }
        let prefix = segments.iter().all(|s| matches!(s, Segment::Literal(_)));

        Ok(Self {
            pattern: normalized,
            segments,
            prefix,
            method: None,
            policy,
        })
    }

    /// Restrict the rule to one HTTP method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Parse `"[METHOD ]pattern"`, e.g. `"/api/auth/**"` or `"GET /api/posts/*"`.
    pub fn parse(spec: &str, policy: AccessPolicy) -> Result<Self, RouteRuleError> {
        let spec = spec.trim();
        match spec.split_once(char::is_whitespace) {
            Some((method, pattern)) => {
                let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                    .map_err(|_| RouteRuleError::InvalidMethod(method.to_string()))?;
                Ok(Self::new(pattern, policy)?.with_method(method))
            }
            None => Self::new(spec, policy),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn policy(&self) -> AccessPolicy {
        self.policy
    }

    fn matches(&self, path: &[&str], method: &Method) -> bool {
        if self.method.as_ref().is_some_and(|m| m != method) {
            return false;
        }
        if self.prefix {
            return path.len() >= self.segments.len()
                && self.segments.iter().zip(path).all(|(s, p)| s.matches(p));
        }
        match_segments(&self.segments, path)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteClassifier {
    rules: Vec<RouteRule>,
}

impl RouteClassifier {
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    /// Build from config entries, all with the same policy, keeping their order.
    pub fn from_specs<I, S>(specs: I, policy: AccessPolicy) -> Result<Self, RouteRuleError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = specs
            .into_iter()
            .map(|s| RouteRule::parse(s.as_ref(), policy))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    pub fn classify(&self, path: &str, method: &Method) -> AccessPolicy {
        let normalized = normalize_path(path);
        let segments = split_segments(&normalized);

        self.rules
            .iter()
            .find(|rule| rule.matches(&segments, method))
            .map(RouteRule::policy)
            .unwrap_or(AccessPolicy::RequiresAuth)
    }
}

/// Canonical form used for matching: duplicate slashes collapsed, `.` dropped, `..`
/// resolved (never above root), no trailing slash. The root is `/`.
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

fn split_segments(normalized: &str) -> Vec<&str> {
    normalized.split('/').filter(|s| !s.is_empty()).collect()
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::AnyPath, rest)) => {
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((segment, rest)) => match path.split_first() {
            Some((head, tail)) => segment.matches(head) && match_segments(rest, tail),
            None => false,
        },
    }
}

fn wildcard_match(pattern: &[char], text: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some(('*', rest)) => (0..=text.len()).any(|skip| wildcard_match(rest, &text[skip..])),
        Some(('?', rest)) => !text.is_empty() && wildcard_match(rest, &text[1..]),
        Some((c, rest)) => text.first() == Some(c) && wildcard_match(rest, &text[1..]),
    }
}
