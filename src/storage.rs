pub mod minio;
pub mod owncloud;

use std::fmt;

use jiff::civil::Date;

use crate::error::{Result, StoreError};
use crate::interval::DayNames;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Where a day's report lives in a backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Path in a hierarchical file share
    Path(String),
    /// Key inside a bucket of a flat object store
    Object { bucket: String, key: String },
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Path(path) => f.write_str(path),
            Locator::Object { bucket, key } => write!(f, "{}/{}", bucket, key),
        }
    }
}

/// Join path segments with `/`, ignoring empty segments and trailing slashes.
pub fn join_path<S: AsRef<str>>(parts: &[S]) -> String {
    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        let part = part.as_ref().trim_end_matches('/');
        if part.is_empty() && i > 0 {
            continue;
        }
        if i > 0 {
            out.push('/');
        }
        out.push_str(part);
    }
    out
}

/// Containers that must exist before the report for `date` can be written,
/// outermost first: `root`, `root/YYYY`, `root/YYYY/M`.
pub fn hierarchical_containers(root: &str, date: Date) -> [String; 3] {
    [
        join_path(&[root]),
        join_path(&[root.to_string(), date.year_dir()]),
        join_path(&[root.to_string(), date.year_dir(), date.month_dir()]),
    ]
}

/// `root/YYYY/M/YYYY-MM-DD.json`
pub fn hierarchical_locator(root: &str, date: Date) -> Locator {
    Locator::Path(join_path(&[
        root.to_string(),
        date.year_dir(),
        date.month_dir(),
        date.file_name(),
    ]))
}

/// `YYYY-MM-DD.json` inside `bucket`
pub fn flat_key_locator(bucket: &str, date: Date) -> Locator {
    Locator::Object {
        bucket: bucket.to_string(),
        key: date.file_name(),
    }
}

/// What the loader needs from a storage backend.
pub trait StorageProbe {
    /// Backend name used in log messages and errors
    fn name(&self) -> &str;

    fn locator(&self, date: Date) -> Locator;

    /// Make sure whatever has to contain the report for `date` exists.
    fn prepare(&mut self, date: Date) -> Result<()>;

    /// `false` if the backend says the object is not there.  Other faults are
    /// returned as errors.
    fn object_exists(&mut self, locator: &Locator) -> Result<bool>;

    /// Create or overwrite the object at `locator`.
    fn write_object(&mut self, locator: &Locator, bytes: &[u8], content_type: &str) -> Result<()>;
}

/// Operations of a file share that needs parent folders to exist.
pub trait HierarchicalStore {
    fn create_container(&self, path: &str) -> std::result::Result<(), StoreError>;
    fn stat_object(&self, path: &str) -> std::result::Result<(), StoreError>;
    fn write_object(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> std::result::Result<(), StoreError>;
}

/// Operations of an S3 compatible object store.
pub trait FlatKeyStore {
    fn bucket_exists(&self, bucket: &str) -> std::result::Result<bool, StoreError>;
    fn create_bucket(&self, bucket: &str) -> std::result::Result<(), StoreError>;
    fn stat_object(&self, bucket: &str, key: &str) -> std::result::Result<(), StoreError>;
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        length: usize,
        content_type: &str,
    ) -> std::result::Result<(), StoreError>;
}
