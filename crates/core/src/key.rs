// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage key validation.
//!
//! A key is a non-empty sequence of `:`-separated segments. Validation is
//! parse-don't-sanitize: invalid input is rejected with a distinct error,
//! valid input is returned unchanged.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Characters that are never allowed anywhere in a key.
const FORBIDDEN_CHARS: &[char] = &['/', '\\', '*', '?', '"', '\'', '<', '>', '|'];

/// Ways a raw string can fail key validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("key is empty")]
    Empty,

    #[error("key has a leading or trailing ':'")]
    EdgeSeparator,

    #[error("key has consecutive ':' separators")]
    EmptySegment,

    #[error("key contains forbidden character {0:?}")]
    ForbiddenChar(char),

    #[error("key contains control byte 0x{0:02x}")]
    ControlChar(u8),

    #[error("key segment {0:?} is a dot path")]
    DotSegment(String),
}

/// A validated storage key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Key(String);

impl Key {
    /// Validate a raw string as a key.
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        validate_key(raw)?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the `:`-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(':')
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Key {
    type Error = KeyError;

    fn try_from(s: String) -> Result<Self, KeyError> {
        Key::parse(&s)
    }
}

impl From<Key> for String {
    fn from(k: Key) -> String {
        k.0
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validate a raw key string without allocating.
///
/// Rejects: empty strings, leading/trailing/consecutive `:`, path
/// separators, NUL and other ASCII control bytes, shell-glob metacharacters,
/// and `.`/`..` segments (including segments that begin with `..`). Bytes
/// above 0x7F are allowed so UTF-8 identifiers pass through.
pub fn validate_key(raw: &str) -> Result<(), KeyError> {
    if raw.is_empty() {
        return Err(KeyError::Empty);
    }
    if raw.starts_with(':') || raw.ends_with(':') {
        return Err(KeyError::EdgeSeparator);
    }
    if raw.contains("::") {
        return Err(KeyError::EmptySegment);
    }
    for c in raw.chars() {
        if c.is_ascii_control() {
            return Err(KeyError::ControlChar(c as u8));
        }
        if FORBIDDEN_CHARS.contains(&c) {
            return Err(KeyError::ForbiddenChar(c));
        }
    }
    for seg in raw.split(':') {
        if seg == "." || seg.starts_with("..") {
            return Err(KeyError::DotSegment(seg.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "key_tests.rs"]
mod tests;
