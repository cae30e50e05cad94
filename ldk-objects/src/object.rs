//! Object metadata sidecar and the byte-range parsing `GetObject` honors
//! (spec §4.9).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub content_type: String,
    pub last_modified: DateTime<Utc>,
    pub size: u64,
    pub etag: String,
    #[serde(default)]
    pub user_metadata: BTreeMap<String, String>,
}

/// Lowercase hex MD5 of `body`, the ETag for a single-part object.
pub fn etag_of(body: &[u8]) -> String {
    format!("{:x}", md5::compute(body))
}

/// `bytes=start-end` (both inclusive); returns `(start, end)` clamped to
/// `[0, len)`. Returns `None` for a header that doesn't parse, which the
/// caller should treat as "serve the whole object".
pub fn parse_range(header: &str, len: u64) -> Option<(u64, u64)> {
    let spec = header.strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    if len == 0 {
        return None;
    }
    let last = len - 1;
    match (start.is_empty(), end.is_empty()) {
        (false, false) => {
            let start: u64 = start.parse().ok()?;
            let end: u64 = end.parse().ok()?;
            if start > end || start > last {
                return None;
            }
            Some((start, end.min(last)))
        }
        (false, true) => {
            let start: u64 = start.parse().ok()?;
            if start > last {
                return None;
            }
            Some((start, last))
        }
        (true, false) => {
            let suffix_len: u64 = end.parse().ok()?;
            let start = last.saturating_sub(suffix_len.saturating_sub(1));
            Some((start, last))
        }
        (true, true) => None,
    }
}
