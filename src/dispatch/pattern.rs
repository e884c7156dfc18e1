//! Route patterns
//!
//! A pattern is a `/`-separated list of segments. Each segment is either a
//! literal or a capture:
//!
//! - `{name:int}` matches a non-empty run of ASCII digits of any length
//! - `{name}` matches any non-empty segment
//!
//! ```
//! use metered_demo::dispatch::{Param, RoutePattern};
//!
//! let pattern: RoutePattern = "/resource/{id:int}".parse().unwrap();
//! let params = pattern.matches("/resource/42").unwrap();
//! assert_eq!(params.get("id"), Some(&Param::Digits("42".to_string())));
//! assert_eq!(params.int("id"), Some(42));
//! assert!(pattern.matches("/resource/abc").is_none());
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Type constraint of a capture segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    /// ASCII digits only
    Int,
    /// Any non-empty segment
    Str,
}

/// One segment of a route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Capture { name: String, kind: CaptureKind },
}

/// Captured path parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    /// Validated run of ASCII digits, kept as text so long ids still match
    Digits(String),
    Str(String),
}

/// Parameters captured while matching a pattern, in pattern order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, Param)>);

impl Params {
    /// Look up a capture by name
    pub fn get(&self, name: &str) -> Option<&Param> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    /// Look up a digit capture by name, as matched
    pub fn digits(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(Param::Digits(value)) => Some(value),
            _ => None,
        }
    }

    /// Look up a digit capture by name as `u64`; `None` if it does not fit
    pub fn int(&self, name: &str) -> Option<u64> {
        self.digits(name).and_then(|d| d.parse().ok())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Parsed route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    source: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// The pattern text as registered, e.g. `/resource/{id:int}`
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when the pattern has no capture segments
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Match a concrete request path, returning the captured parameters
    pub fn matches(&self, path: &str) -> Option<Params> {
        let parts = split(path)?;
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Capture { name, kind } => {
                    params.push((name.clone(), capture(*kind, part)?));
                }
            }
        }
        Some(Params(params))
    }
}

fn capture(kind: CaptureKind, part: &str) -> Option<Param> {
    match kind {
        CaptureKind::Str if !part.is_empty() => Some(Param::Str(part.to_string())),
        CaptureKind::Str => None,
        CaptureKind::Int if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) => {
            Some(Param::Digits(part.to_string()))
        }
        CaptureKind::Int => None,
    }
}

/// Split an absolute path into segments; `/` is the single empty segment
fn split(path: &str) -> Option<Vec<&str>> {
    let rest = path.strip_prefix('/')?;
    Some(rest.split('/').collect())
}

impl FromStr for RoutePattern {
    type Err = AppError;

    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| AppError::InvalidRoutePattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let parts = split(pattern).ok_or_else(|| invalid("must start with '/'"))?;

        let mut segments = Vec::with_capacity(parts.len());
        for part in parts {
            let segment = match part.strip_prefix('{') {
                None if part.contains('{') || part.contains('}') => {
                    return Err(invalid("captures must span a whole segment"));
                }
                None => Segment::Literal(part.to_string()),
                Some(inner) => {
                    let inner = inner
                        .strip_suffix('}')
                        .ok_or_else(|| invalid("unterminated capture"))?;
                    let (name, kind) = match inner.split_once(':') {
                        Some((name, "int")) => (name, CaptureKind::Int),
                        Some((_, other)) => {
                            return Err(invalid(&format!("unknown capture type '{}'", other)));
                        }
                        None => (inner, CaptureKind::Str),
                    };
                    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                        return Err(invalid("capture names must be non-empty [A-Za-z0-9_]"));
                    }
                    let duplicate = segments
                        .iter()
                        .any(|s| matches!(s, Segment::Capture { name: n, .. } if n == name));
                    if duplicate {
                        return Err(invalid(&format!("capture '{}' appears twice", name)));
                    }
                    Segment::Capture {
                        name: name.to_string(),
                        kind,
                    }
                }
            };
            segments.push(segment);
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
