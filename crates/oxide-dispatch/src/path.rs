//! Path pattern matching.

use regex::Regex;

use crate::error::{Result, RouterError};
use crate::request::PathParams;

/// A segment in a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A literal string segment.
    Literal(String),
    /// A parameter segment (e.g., {id}).
    Param(String),
    /// A wildcard segment (matches remainder of path).
    Wildcard(String),
}

/// A compiled path pattern for matching URLs.
#[derive(Debug, Clone)]
pub struct PathPattern {
    /// The original pattern string.
    pattern: String,
    /// Parsed segments.
    segments: Vec<PathSegment>,
    /// Compiled regex for matching.
    regex: Regex,
    /// Parameter names in order.
    param_names: Vec<String>,
}

impl PathPattern {
    /// Parses a path pattern string.
    ///
    /// Pattern syntax:
    /// - `/users` - Literal path
    /// - `/users/{id}` - Path with parameter
    /// - `/files/{*path}` - Wildcard parameter (matches rest of path)
    ///
    /// A wildcard must be the last segment.
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_dispatch::PathPattern;
    ///
    /// let pattern = PathPattern::parse("/posts/{id}/comments/{comment_id}").unwrap();
    /// let params = pattern.match_path("/posts/123/comments/456").unwrap();
    /// assert_eq!(params.get("id"), Some("123"));
    /// assert_eq!(params.get("comment_id"), Some("456"));
    /// ```
    pub fn parse(pattern: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut param_names = Vec::new();
        let mut regex_str = String::from("^");

        for part in pattern.split('/').filter(|s| !s.is_empty()) {
            if matches!(segments.last(), Some(PathSegment::Wildcard(_))) {
                return Err(RouterError::InvalidPattern(format!(
                    "{pattern}: wildcard must be the last segment"
                )));
            }
            regex_str.push('/');

            if let Some(param) = part.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                let (name, wildcard) = match param.strip_prefix('*') {
                    Some(name) => (name, true),
                    None => (param, false),
                };
                if name.is_empty() || param_names.iter().any(|n| n == name) {
                    return Err(RouterError::InvalidPattern(format!(
                        "{pattern}: empty or repeated parameter name"
                    )));
                }
                param_names.push(name.to_string());
                if wildcard {
                    segments.push(PathSegment::Wildcard(name.to_string()));
                    regex_str.push_str("(.+)");
                } else {
                    segments.push(PathSegment::Param(name.to_string()));
                    regex_str.push_str("([^/]+)");
                }
            } else {
                segments.push(PathSegment::Literal(part.to_string()));
                regex_str.push_str(&regex::escape(part));
            }
        }

        regex_str.push_str("/?$");

        let regex = Regex::new(&regex_str)
            .map_err(|e| RouterError::InvalidPattern(format!("{pattern}: {e}")))?;

        Ok(Self {
            pattern: pattern.to_string(),
            segments,
            regex,
            param_names,
        })
    }

    /// Attempts to match a path against this pattern.
    ///
    /// Returns extracted parameters if the path matches. A single trailing
    /// slash is tolerated; see [`PathPattern::is_exact`].
    pub fn match_path(&self, path: &str) -> Option<PathParams> {
        let caps = self.regex.captures(path)?;

        let mut params = PathParams::new();

        for (i, name) in self.param_names.iter().enumerate() {
            if let Some(value) = caps.get(i + 1) {
                params.insert(name.clone(), value.as_str());
            }
        }

        Some(params)
    }

    /// Returns true if `path` matches without relying on trailing-slash
    /// tolerance.
    pub fn is_exact(&self, path: &str) -> bool {
        if path == "/" || self.segments.is_empty() {
            return path == "/" || path.is_empty();
        }
        path.ends_with('/') == self.pattern.ends_with('/')
    }

    /// Returns the name of the trailing wildcard, if the pattern has one.
    pub fn wildcard(&self) -> Option<&str> {
        match self.segments.last() {
            Some(PathSegment::Wildcard(name)) => Some(name),
            _ => None,
        }
    }

    /// Returns true if both patterns match exactly the same set of paths.
    ///
    /// Parameter names are ignored: `/users/{id}` and `/users/{name}`
    /// overlap completely.
    pub fn same_shape(&self, other: &Self) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (PathSegment::Literal(a), PathSegment::Literal(b)) => a == b,
                    (PathSegment::Param(_), PathSegment::Param(_))
                    | (PathSegment::Wildcard(_), PathSegment::Wildcard(_)) => true,
                    _ => false,
                })
    }
}
