//! Multipart upload bookkeeping: part validation and the multipart ETag
//! math (spec §4.9). Staged bytes live on disk under the ObjectStore's
//! data directory; this module only tracks per-part metadata.

use std::collections::BTreeMap;
use std::sync::Mutex;

use uuid::Uuid;

use crate::error::ObjError;

pub const MIN_PART_NUMBER: u32 = 1;
pub const MAX_PART_NUMBER: u32 = 10_000;

#[derive(Debug, Clone)]
pub struct PartInfo {
    pub etag: String,
    pub size: u64,
}

pub struct MultipartUpload {
    pub upload_id: String,
    pub bucket: String,
    pub key: String,
    pub parts: Mutex<BTreeMap<u32, PartInfo>>,
}

impl MultipartUpload {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        MultipartUpload {
            upload_id: Uuid::new_v4().simple().to_string(),
            bucket: bucket.into(),
            key: key.into(),
            parts: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn record_part(&self, part_number: u32, info: PartInfo) -> Result<(), ObjError> {
        validate_part_number(part_number)?;
        self.parts.lock().unwrap().insert(part_number, info);
        Ok(())
    }

    pub fn list_parts(&self) -> Vec<(u32, PartInfo)> {
        self.parts.lock().unwrap().iter().map(|(n, info)| (*n, info.clone())).collect()
    }
}

pub fn validate_part_number(part_number: u32) -> Result<(), ObjError> {
    if (MIN_PART_NUMBER..=MAX_PART_NUMBER).contains(&part_number) {
        Ok(())
    } else {
        Err(ObjError::InvalidPart(format!("part number {part_number} out of range [1, 10000]")))
    }
}

/// Validates the requested completion list against what was actually
/// staged: part numbers must be ascending with no gaps below the
/// reported set, and each ETag must match what `UploadPart` recorded.
/// Returns the validated part numbers in order.
pub fn validate_complete(requested: &[(u32, String)], stored: &BTreeMap<u32, PartInfo>) -> Result<Vec<u32>, ObjError> {
    if requested.is_empty() {
        return Err(ObjError::InvalidPart("CompleteMultipartUpload requires at least one part".to_string()));
    }
    let mut previous: Option<u32> = None;
    let mut numbers = Vec::with_capacity(requested.len());
    for (part_number, etag) in requested {
        if let Some(prev) = previous {
            if *part_number <= prev {
                return Err(ObjError::InvalidPart("part numbers must be strictly ascending".to_string()));
            }
        }
        let stored_part = stored.get(part_number).ok_or_else(|| ObjError::InvalidPart(format!("part {part_number} was never uploaded")))?;
        if &stored_part.etag != etag {
            return Err(ObjError::InvalidPart(format!("ETag mismatch for part {part_number}")));
        }
        previous = Some(*part_number);
        numbers.push(*part_number);
    }
    Ok(numbers)
}

/// Hex MD5 of the concatenation of each part's raw MD5 digest bytes,
/// suffixed with `-N` (N = part count) — AWS's multipart ETag format.
pub fn complete_etag(ordered_part_etags: &[String]) -> Result<String, ObjError> {
    let mut concatenated = Vec::with_capacity(ordered_part_etags.len() * 16);
    for etag in ordered_part_etags {
        let bytes = hex_decode(etag).ok_or_else(|| ObjError::InvalidPart(format!("part ETag '{etag}' is not valid hex")))?;
        if bytes.len() != 16 {
            return Err(ObjError::InvalidPart(format!("part ETag '{etag}' is not a 16-byte MD5 digest")));
        }
        concatenated.extend(bytes);
    }
    let digest = md5::compute(&concatenated);
    Ok(format!("{:x}-{}", digest, ordered_part_etags.len()))
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len()).step_by(2).map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok()).collect()
}
