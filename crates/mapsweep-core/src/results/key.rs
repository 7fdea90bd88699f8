//! Query keys and the result file names derived from them.

use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::ResultKeyStyle;

/// Longest sanitized stem. Leaves room for `-<hash>` and `.json.part`
/// under NAME_MAX.
const STEM_MAX: usize = 230;

/// Hex digits of the key digest appended to altered stems.
const HASH_LEN: usize = 8;

/// Names the result file a record set belongs to: the industry, optionally
/// suffixed with the run's start time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn new(style: ResultKeyStyle, industry: &str, run_stamp: u64) -> Self {
        match style {
            ResultKeyStyle::Industry => QueryKey(industry.to_string()),
            ResultKeyStyle::IndustryTimestamp => QueryKey(format!("{}_{}", industry, run_stamp)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<key>.json`, or `<sanitized key>-<hash>.json` when the key is not
    /// usable as-is, so two keys never share a file.
    pub fn file_name(&self) -> String {
        let stem = sanitize_stem(&self.0);
        if stem == self.0 {
            format!("{}.json", stem)
        } else {
            format!("{}-{}.json", stem, key_digest(&self.0))
        }
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Seconds since the Unix epoch; fixed once per run.
pub fn run_stamp_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn key_digest(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(digest)[..HASH_LEN].to_string()
}

/// Make a query key usable as a file stem.
///
/// Path separators, NUL and control characters become `_`; leading and
/// trailing dots are trimmed so a key can never name `..` or a hidden file.
/// Spaces are kept, so `coffee shops` stays `coffee shops.json`.
pub fn sanitize_stem(key: &str) -> String {
    let replaced: String = key
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c == '\0' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = replaced.trim_matches(|c: char| c == '.' || c.is_whitespace());
    let mut take = trimmed.len().min(STEM_MAX);
    while take > 0 && !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    if take == 0 {
        return "_".to_string();
    }
    trimmed[..take].to_string()
}
