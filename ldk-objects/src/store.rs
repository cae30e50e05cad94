//! Filesystem-backed object storage (spec §4.9). Objects live under
//! `{data_dir}/s3/{bucket}/{key}` with a metadata sidecar under
//! `{data_dir}/s3/.metadata/{bucket}/{key}.json`; multipart staging
//! lives under `{data_dir}/s3/.uploads/{upload_id}/{part_number}`.

use std::fs;
use std::path::{Path, PathBuf};

use dashmap::DashMap;

use crate::bucket::{Bucket, NotificationConfig, WebsiteConfig};
use crate::error::ObjError;
use crate::multipart::{self, MultipartUpload, PartInfo};
use crate::notification::{self, DeliverFn};
use crate::object::{self, ObjectMeta};

pub struct ObjectStore {
    data_dir: PathBuf,
    buckets: DashMap<String, Bucket>,
    uploads: DashMap<String, MultipartUpload>,
    notify: Option<DeliverFn>,
}

pub struct ListedPage {
    pub keys: Vec<String>,
    pub common_prefixes: Vec<String>,
    pub next_continuation_token: Option<String>,
}

impl ObjectStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        ObjectStore { data_dir: data_dir.into(), buckets: DashMap::new(), uploads: DashMap::new(), notify: None }
    }

    pub fn with_notifier(mut self, deliver: DeliverFn) -> Self {
        self.notify = Some(deliver);
        self
    }

    fn bucket_root(&self, bucket: &str) -> PathBuf {
        self.data_dir.join("s3").join(bucket)
    }

    fn metadata_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.data_dir.join("s3").join(".metadata").join(bucket).join(format!("{key}.json"))
    }

    fn uploads_root(&self, upload_id: &str) -> PathBuf {
        self.data_dir.join("s3").join(".uploads").join(upload_id)
    }

    fn require_bucket(&self, bucket: &str) -> Result<(), ObjError> {
        if self.buckets.contains_key(bucket) {
            Ok(())
        } else {
            Err(ObjError::NoSuchBucket(bucket.to_string()))
        }
    }

    /// Idempotent: creating an already-existing bucket succeeds (spec §4.9).
    pub fn create_bucket(&self, name: &str) -> Result<(), ObjError> {
        if self.buckets.contains_key(name) {
            return Ok(());
        }
        fs::create_dir_all(self.bucket_root(name))?;
        self.buckets.insert(name.to_string(), Bucket::new(name));
        Ok(())
    }

    pub fn delete_bucket(&self, name: &str) -> Result<(), ObjError> {
        self.require_bucket(name)?;
        let root = self.bucket_root(name);
        if root.exists() && fs::read_dir(&root)?.next().is_some() {
            return Err(ObjError::Validation(format!("bucket '{name}' is not empty")));
        }
        self.buckets.remove(name);
        let _ = fs::remove_dir_all(root);
        Ok(())
    }

    pub fn list_buckets(&self) -> Vec<String> {
        let mut names: Vec<String> = self.buckets.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn set_website(&self, bucket: &str, config: Option<WebsiteConfig>) -> Result<(), ObjError> {
        self.require_bucket(bucket)?;
        self.buckets.get_mut(bucket).unwrap().website = config;
        Ok(())
    }

    pub fn set_policy(&self, bucket: &str, policy: Option<serde_json::Value>) -> Result<(), ObjError> {
        self.require_bucket(bucket)?;
        self.buckets.get_mut(bucket).unwrap().policy = policy;
        Ok(())
    }

    pub fn get_policy(&self, bucket: &str) -> Result<serde_json::Value, ObjError> {
        self.require_bucket(bucket)?;
        Ok(self.buckets.get(bucket).unwrap().policy_or_default())
    }

    pub fn set_notification(&self, bucket: &str, config: NotificationConfig) -> Result<(), ObjError> {
        self.require_bucket(bucket)?;
        self.buckets.get_mut(bucket).unwrap().notification = config;
        Ok(())
    }

    pub fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        content_type: Option<&str>,
        user_metadata: std::collections::BTreeMap<String, String>,
    ) -> Result<ObjectMeta, ObjError> {
        self.require_bucket(bucket)?;
        let path = self.bucket_root(bucket).join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, body)?;
        let meta = ObjectMeta {
            content_type: content_type.unwrap_or("application/octet-stream").to_string(),
            last_modified: chrono::Utc::now(),
            size: body.len() as u64,
            etag: object::etag_of(body),
            user_metadata,
        };
        self.write_metadata(bucket, key, &meta)?;
        self.emit_notification(bucket, "s3:ObjectCreated:Put", key, meta.size, &meta.etag);
        Ok(meta)
    }

    fn write_metadata(&self, bucket: &str, key: &str, meta: &ObjectMeta) -> Result<(), ObjError> {
        let path = self.metadata_path(bucket, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(meta).map_err(|e| ObjError::Io(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }

    fn read_metadata(&self, bucket: &str, key: &str) -> Result<ObjectMeta, ObjError> {
        let path = self.metadata_path(bucket, key);
        let bytes = fs::read(&path).map_err(|_| ObjError::NoSuchKey(key.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| ObjError::Io(e.to_string()))
    }

    /// Resolves the on-disk key a GET against `key` should actually serve:
    /// website mode maps a directory-like key to its index document.
    fn resolve_key<'a>(&self, bucket: &Bucket, key: &'a str) -> std::borrow::Cow<'a, str> {
        let is_directory_like = key.is_empty() || key.ends_with('/') || !key.rsplit('/').next().unwrap_or("").contains('.');
        match (&bucket.website, is_directory_like) {
            (Some(website), true) => std::borrow::Cow::Owned(format!("{key}{}", website.index_document)),
            _ => std::borrow::Cow::Borrowed(key),
        }
    }

    pub fn get_object(&self, bucket: &str, key: &str, range: Option<&str>) -> Result<(Vec<u8>, ObjectMeta), ObjError> {
        self.require_bucket(bucket)?;
        let bucket_cfg = self.buckets.get(bucket).unwrap();
        let resolved = self.resolve_key(&bucket_cfg, key);
        let path = self.bucket_root(bucket).join(resolved.as_ref());
        match fs::read(&path) {
            Ok(body) => {
                let meta = self.read_metadata(bucket, resolved.as_ref())?;
                Ok((slice_range(body, range), meta))
            }
            Err(_) => self.serve_website_error_document(&bucket_cfg, bucket, key),
        }
    }

    fn serve_website_error_document(&self, bucket_cfg: &Bucket, bucket: &str, key: &str) -> Result<(Vec<u8>, ObjectMeta), ObjError> {
        if let Some(error_doc) = bucket_cfg.website.as_ref().and_then(|w| w.error_document.as_ref()) {
            let path = self.bucket_root(bucket).join(error_doc);
            if let Ok(body) = fs::read(&path) {
                let meta = self.read_metadata(bucket, error_doc).unwrap_or_else(|_| ObjectMeta {
                    content_type: "text/html".to_string(),
                    last_modified: chrono::Utc::now(),
                    size: body.len() as u64,
                    etag: object::etag_of(&body),
                    user_metadata: Default::default(),
                });
                return Ok((body, meta));
            }
        }
        Err(ObjError::NoSuchKey(key.to_string()))
    }

    pub fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMeta, ObjError> {
        self.require_bucket(bucket)?;
        let bucket_cfg = self.buckets.get(bucket).unwrap();
        let resolved = self.resolve_key(&bucket_cfg, key);
        self.read_metadata(bucket, resolved.as_ref())
    }

    /// Idempotent: removing a key that doesn't exist still reports success
    /// (spec §4.9 — `DeleteObject` returns `204` regardless of prior existence).
    pub fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ObjError> {
        self.require_bucket(bucket)?;
        let path = self.bucket_root(bucket).join(key);
        let existed = path.exists();
        let _ = fs::remove_file(&path);
        let _ = fs::remove_file(self.metadata_path(bucket, key));
        if existed {
            self.emit_notification(bucket, "s3:ObjectRemoved:Delete", key, 0, "");
        }
        Ok(())
    }

    pub fn list_objects_v2(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        delimiter: Option<&str>,
        continuation: Option<&str>,
        max_keys: usize,
    ) -> Result<ListedPage, ObjError> {
        self.require_bucket(bucket)?;
        let mut keys = self.walk_keys(&self.bucket_root(bucket), "");
        keys.sort();
        let prefix = prefix.unwrap_or("");
        let mut matching: Vec<String> = keys.into_iter().filter(|k| k.starts_with(prefix)).collect();
        if let Some(after) = continuation {
            matching.retain(|k| k.as_str() > after);
        }

        let mut page_keys = Vec::new();
        let mut common_prefixes = std::collections::BTreeSet::new();
        let mut next_token = None;
        for key in matching {
            if page_keys.len() + common_prefixes.len() >= max_keys {
                next_token = Some(key_or_prefix_token(&page_keys, &common_prefixes));
                break;
            }
            if let Some(delim) = delimiter {
                let remainder = &key[prefix.len()..];
                if let Some(pos) = remainder.find(delim) {
                    common_prefixes.insert(format!("{prefix}{}", &remainder[..pos + delim.len()]));
                    continue;
                }
            }
            page_keys.push(key);
        }
        Ok(ListedPage { keys: page_keys, common_prefixes: common_prefixes.into_iter().collect(), next_continuation_token: next_token })
    }

    fn walk_keys(&self, dir: &Path, relative: &str) -> Vec<String> {
        let mut out = Vec::new();
        let Ok(entries) = fs::read_dir(dir) else {
            return out;
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            let rel = if relative.is_empty() { name.clone() } else { format!("{relative}/{name}") };
            if entry.path().is_dir() {
                out.extend(self.walk_keys(&entry.path(), &rel));
            } else {
                out.push(rel);
            }
        }
        out
    }

    fn emit_notification(&self, bucket: &str, event_name: &str, key: &str, size: u64, etag: &str) {
        let Some(deliver) = &self.notify else { return };
        let Some(bucket_cfg) = self.buckets.get(bucket) else { return };
        if bucket_cfg.notification.targets_for(event_name).is_empty() {
            return;
        }
        let envelope = notification::s3_event_envelope(event_name, bucket, key, size, etag);
        notification::dispatch_notifications(&bucket_cfg.notification, event_name, envelope, deliver.clone());
    }

    // -- multipart upload --------------------------------------------------

    pub fn create_multipart_upload(&self, bucket: &str, key: &str) -> Result<String, ObjError> {
        self.require_bucket(bucket)?;
        let upload = MultipartUpload::new(bucket, key);
        let upload_id = upload.upload_id.clone();
        fs::create_dir_all(self.uploads_root(&upload_id))?;
        self.uploads.insert(upload_id.clone(), upload);
        Ok(upload_id)
    }

    pub fn upload_part(&self, upload_id: &str, part_number: u32, body: &[u8]) -> Result<String, ObjError> {
        multipart::validate_part_number(part_number)?;
        let upload = self.uploads.get(upload_id).ok_or_else(|| ObjError::NoSuchUpload(upload_id.to_string()))?;
        let etag = object::etag_of(body);
        fs::write(self.uploads_root(upload_id).join(part_number.to_string()), body)?;
        upload.record_part(part_number, PartInfo { etag: etag.clone(), size: body.len() as u64 })?;
        Ok(etag)
    }

    pub fn list_parts(&self, upload_id: &str) -> Result<Vec<(u32, PartInfo)>, ObjError> {
        let upload = self.uploads.get(upload_id).ok_or_else(|| ObjError::NoSuchUpload(upload_id.to_string()))?;
        Ok(upload.list_parts())
    }

    pub fn abort_multipart_upload(&self, upload_id: &str) -> Result<(), ObjError> {
        self.uploads.remove(upload_id).ok_or_else(|| ObjError::NoSuchUpload(upload_id.to_string()))?;
        let _ = fs::remove_dir_all(self.uploads_root(upload_id));
        Ok(())
    }

    pub fn complete_multipart_upload(&self, upload_id: &str, requested: &[(u32, String)]) -> Result<ObjectMeta, ObjError> {
        let (_, upload) = self.uploads.remove(upload_id).ok_or_else(|| ObjError::NoSuchUpload(upload_id.to_string()))?;
        let stored = upload.parts.lock().unwrap();
        let ordered_numbers = multipart::validate_complete(requested, &stored)?;
        let ordered_etags: Vec<String> = ordered_numbers.iter().map(|n| stored[n].etag.clone()).collect();
        let final_etag = multipart::complete_etag(&ordered_etags)?;

        let staging = self.uploads_root(upload_id);
        let mut merged = Vec::new();
        for part_number in &ordered_numbers {
            merged.extend(fs::read(staging.join(part_number.to_string()))?);
        }
        drop(stored);

        let final_path = self.bucket_root(&upload.bucket).join(&upload.key);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&final_path, &merged)?;
        let _ = fs::remove_dir_all(&staging);

        let meta = ObjectMeta {
            content_type: "application/octet-stream".to_string(),
            last_modified: chrono::Utc::now(),
            size: merged.len() as u64,
            etag: final_etag,
            user_metadata: Default::default(),
        };
        self.write_metadata(&upload.bucket, &upload.key, &meta)?;
        self.emit_notification(&upload.bucket, "s3:ObjectCreated:CompleteMultipartUpload", &upload.key, meta.size, &meta.etag);
        Ok(meta)
    }
}

fn slice_range(body: Vec<u8>, range: Option<&str>) -> Vec<u8> {
    let Some(header) = range else { return body };
    match object::parse_range(header, body.len() as u64) {
        Some((start, end)) => body[start as usize..=end as usize].to_vec(),
        None => body,
    }
}

fn key_or_prefix_token(keys: &[String], prefixes: &std::collections::BTreeSet<String>) -> String {
    keys.last().cloned().or_else(|| prefixes.iter().next_back().cloned()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (ObjectStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(dir.path());
        store.create_bucket("bucket").unwrap();
        (store, dir)
    }

    #[test]
    fn put_then_get_round_trips() {
        let (store, _dir) = store();
        let meta = store.put_object("bucket", "a.txt", b"hello", Some("text/plain"), Default::default()).unwrap();
        assert_eq!(meta.etag, object::etag_of(b"hello"));
        let (body, got) = store.get_object("bucket", "a.txt", None).unwrap();
        assert_eq!(body, b"hello");
        assert_eq!(got.content_type, "text/plain");
    }

    #[test]
    fn get_object_honors_byte_range() {
        let (store, _dir) = store();
        store.put_object("bucket", "a.txt", b"0123456789", None, Default::default()).unwrap();
        let (body, _) = store.get_object("bucket", "a.txt", Some("bytes=2-4")).unwrap();
        assert_eq!(body, b"234");
    }

    #[test]
    fn missing_key_errors_without_website_config() {
        let (store, _dir) = store();
        let err = store.get_object("bucket", "missing.txt", None).unwrap_err();
        assert!(matches!(err, ObjError::NoSuchKey(_)));
    }

    #[test]
    fn website_mode_serves_error_document_on_404() {
        let (store, _dir) = store();
        store
            .put_object("bucket", "404.html", b"not found here", Some("text/html"), Default::default())
            .unwrap();
        store
            .set_website(
                "bucket",
                Some(WebsiteConfig { index_document: "index.html".to_string(), error_document: Some("404.html".to_string()) }),
            )
            .unwrap();
        let (body, meta) = store.get_object("bucket", "missing", None).unwrap();
        assert_eq!(body, b"not found here");
        assert_eq!(meta.content_type, "text/html");
    }

    #[test]
    fn delete_object_is_idempotent() {
        let (store, _dir) = store();
        store.delete_object("bucket", "never-existed.txt").unwrap();
        store.put_object("bucket", "a.txt", b"x", None, Default::default()).unwrap();
        store.delete_object("bucket", "a.txt").unwrap();
        assert!(matches!(store.get_object("bucket", "a.txt", None).unwrap_err(), ObjError::NoSuchKey(_)));
    }

    #[test]
    fn list_objects_v2_groups_common_prefixes_with_delimiter() {
        let (store, _dir) = store();
        for key in ["a/1.txt", "a/2.txt", "b.txt"] {
            store.put_object("bucket", key, b"x", None, Default::default()).unwrap();
        }
        let page = store.list_objects_v2("bucket", None, Some("/"), None, 100).unwrap();
        assert_eq!(page.keys, vec!["b.txt".to_string()]);
        assert_eq!(page.common_prefixes, vec!["a/".to_string()]);
    }

    #[test]
    fn multipart_upload_completes_into_merged_object() {
        let (store, _dir) = store();
        let upload_id = store.create_multipart_upload("bucket", "big.bin").unwrap();
        let etag1 = store.upload_part(&upload_id, 1, b"hello ").unwrap();
        let etag2 = store.upload_part(&upload_id, 2, b"world").unwrap();
        let meta = store.complete_multipart_upload(&upload_id, &[(1, etag1), (2, etag2)]).unwrap();
        assert!(meta.etag.ends_with("-2"));
        let (body, _) = store.get_object("bucket", "big.bin", None).unwrap();
        assert_eq!(body, b"hello world");
    }

    #[test]
    fn abort_multipart_upload_removes_staging() {
        let (store, _dir) = store();
        let upload_id = store.create_multipart_upload("bucket", "big.bin").unwrap();
        store.upload_part(&upload_id, 1, b"partial").unwrap();
        store.abort_multipart_upload(&upload_id).unwrap();
        assert!(matches!(store.list_parts(&upload_id).unwrap_err(), ObjError::NoSuchUpload(_)));
    }

    #[test]
    fn get_bucket_policy_defaults_to_allow_all_when_unset() {
        let (store, _dir) = store();
        let policy = store.get_policy("bucket").unwrap();
        assert_eq!(policy["Statement"][0]["Effect"], "Allow");
    }
}
