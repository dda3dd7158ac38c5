use std::fmt;

use thiserror::Error;

/// One step of a value path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => formatter.write_str(key),
            Self::Index(index) => write!(formatter, "{index}"),
        }
    }
}

/// Parsed dotted path (`$.data.items.1.name`).
///
/// Decimal segments address sequence elements, every other segment names a
/// record field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValuePath {
    segments: Vec<PathSegment>,
}

impl ValuePath {
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    pub fn parse(input: &str) -> Result<Self, ValuePathError> {
        let trimmed = input.trim();
        let Some(rest) = trimmed.strip_prefix('$') else {
            return Err(ValuePathError::new(
                input,
                "path must start with `$`".to_string(),
            ));
        };
        if rest.is_empty() {
            return Ok(Self::root());
        }
        let Some(body) = rest.strip_prefix('.') else {
            return Err(ValuePathError::new(
                input,
                "expected `.` after `$`".to_string(),
            ));
        };

        let mut segments = Vec::new();
        for (position, raw) in body.split('.').enumerate() {
            if raw.is_empty() {
                return Err(ValuePathError::new(
                    input,
                    format!("empty segment at position {}", position + 1),
                ));
            }
            if raw.bytes().all(|byte| byte.is_ascii_digit()) {
                let index = raw.parse::<usize>().map_err(|error| {
                    ValuePathError::new(input, format!("invalid index `{raw}`: {error}"))
                })?;
                segments.push(PathSegment::Index(index));
            } else {
                segments.push(PathSegment::Key(raw.to_string()));
            }
        }

        Ok(Self { segments })
    }

    /// Parses a path that may omit the root marker (`a.b` is read as `$.a.b`).
    pub fn parse_relative(input: &str) -> Result<Self, ValuePathError> {
        let trimmed = input.trim();
        if trimmed.starts_with('$') {
            Self::parse(trimmed)
        } else {
            Self::parse(&format!("$.{trimmed}"))
        }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Path made of the first `len` segments, used to qualify traversal errors.
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("$")?;
        for segment in &self.segments {
            write!(formatter, ".{segment}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid path `{input}`: {reason}")]
pub struct ValuePathError {
    input: String,
    reason: String,
}

impl ValuePathError {
    fn new(input: &str, reason: String) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PathSegment, ValuePath};

    #[test]
    fn parses_root_path() {
        let path = ValuePath::parse("$").expect("parse root");
        assert_eq!(path.segments(), &[]);
        assert_eq!(path.to_string(), "$");
    }

    #[test]
    fn parses_keys_and_indexes() {
        let path = ValuePath::parse("$.data.items.12.name").expect("parse");
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("data".to_string()),
                PathSegment::Key("items".to_string()),
                PathSegment::Index(12),
                PathSegment::Key("name".to_string())
            ]
        );
        assert_eq!(path.to_string(), "$.data.items.12.name");
        assert_eq!(path.prefix(2).to_string(), "$.data.items");
    }

    #[test]
    fn rejects_missing_root_and_empty_segments() {
        let error = ValuePath::parse("data.items").expect_err("must reject missing root");
        assert!(error.to_string().contains("must start with `$`"));

        let error = ValuePath::parse("$.data..items").expect_err("must reject empty segment");
        assert!(error.to_string().contains("empty segment at position 2"));

        let error = ValuePath::parse("$data").expect_err("must reject missing dot");
        assert!(error.to_string().contains("expected `.`"));
    }

    #[test]
    fn relative_paths_get_a_root() {
        let path = ValuePath::parse_relative("user.id").expect("parse");
        assert_eq!(path.to_string(), "$.user.id");
        let rooted = ValuePath::parse_relative("$.user").expect("parse");
        assert_eq!(rooted.to_string(), "$.user");
    }
}
