//! Chapter identifiers
//!
//! ID Format: `{millis-base36}-{6-char-hash}` (e.g. `m2k9x0ab-3f9c1e`)
//!
//! The prefix is the creation time in epoch milliseconds. The suffix is a
//! BLAKE3 hash of the nanosecond timestamp and a process-wide sequence
//! number, so ids minted within the same millisecond still differ.
//!
//! Any non-blank string without path separators is accepted when parsing,
//! so books written by other tools (e.g. with UUID ids) load unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid chapter ID: expected a non-blank name usable as a file name, got '{0}'")]
    InvalidChapterId(String),
}

/// Generates a 6-character hash from a timestamp and sequence number
fn generate_suffix(timestamp: DateTime<Utc>, sequence: u64) -> String {
    let input = format!(
        "{}:{}",
        timestamp.timestamp_nanos_opt().unwrap_or(0),
        sequence
    );
    let hash = blake3::hash(input.as_bytes());
    let hex = hash.to_hex();
    hex[..6].to_string()
}

/// Formats a non-negative number in lowercase base 36
fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Identifier of a chapter, unique within its book
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChapterId(String);

impl ChapterId {
    /// Mints a fresh id for the current instant
    pub fn new() -> Self {
        Self::generate(Utc::now())
    }

    /// Mints an id for the given creation time
    pub fn generate(timestamp: DateTime<Utc>) -> Self {
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let millis = timestamp.timestamp_millis().max(0) as u64;
        Self(format!(
            "{}-{}",
            to_base36(millis),
            generate_suffix(timestamp, sequence)
        ))
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the content file name for this chapter (`{id}.md`)
    pub fn file_name(&self) -> String {
        format!("{}.md", self.0)
    }
}

impl fmt::Display for ChapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ChapterId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let forbidden = |c: char| c == '/' || c == '\\' || c.is_control();
        if s.is_empty() || s == "." || s == ".." || s.contains(forbidden) {
            return Err(IdError::InvalidChapterId(s.to_string()));
        }

        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for ChapterId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChapterId> for String {
    fn from(id: ChapterId) -> Self {
        id.0
    }
}

impl AsRef<str> for ChapterId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
