//! Single byte-range parsing.
//!
//! Only `bytes=<start>-` and `bytes=<start>-<end>` are accepted. Suffix
//! ranges (`bytes=-N`) and multi-range lists are rejected as invalid.

use std::sync::OnceLock;

use mc_core::{Error, Result};
use regex::Regex;

fn range_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^bytes=(\d+)-(\d*)$").expect("static pattern compiles"))
}

/// A range as requested, before clamping against the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>,
}

/// Parse a `Range` header value.
pub fn parse_range_header(value: &str) -> Result<ByteRange> {
    let invalid = || Error::InvalidRange(value.to_string());
    let caps = range_pattern().captures(value).ok_or_else(invalid)?;

    let start = caps[1].parse::<u64>().map_err(|_| invalid())?;
    let end = match &caps[2] {
        "" => None,
        digits => Some(digits.parse::<u64>().map_err(|_| invalid())?),
    };
    Ok(ByteRange { start, end })
}

/// A range clamped to a file of `total` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start: u64,
    pub len: u64,
    pub total: u64,
}

impl ByteRange {
    /// Clamp to `[0, total - 1]`. A range that ends up inverted collapses
    /// to zero length instead of failing.
    pub fn resolve(&self, total: u64) -> ResolvedRange {
        let Some(last) = total.checked_sub(1) else {
            return ResolvedRange { start: 0, len: 0, total };
        };
        let end = self.end.unwrap_or(last).min(last);
        if self.start > end {
            return ResolvedRange { start: self.start.min(total), len: 0, total };
        }
        ResolvedRange {
            start: self.start,
            len: end - self.start + 1,
            total,
        }
    }
}

impl ResolvedRange {
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inclusive last byte, if any.
    pub fn end(&self) -> Option<u64> {
        (self.len > 0).then(|| self.start + self.len - 1)
    }

    /// `Content-Range` header value.
    pub fn content_range(&self) -> String {
        match self.end() {
            Some(end) => format!("bytes {}-{}/{}", self.start, end, self.total),
            None => format!("bytes */{}", self.total),
        }
    }
}
