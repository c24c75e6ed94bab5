//! In-memory stand-ins for the storage backends and the report source.
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use jiff::civil::Date;
use serde_json::{json, Value};

use crate::error::{StoreError, UpstreamError};
use crate::interval::DayNames;
use crate::source::ReportSource;
use crate::storage::{FlatKeyStore, HierarchicalStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareCall {
    Mkdir(String),
    Stat(String),
    Write { path: String, content_type: String },
}

/// A file share kept in memory.
#[derive(Default)]
pub struct FakeShare {
    files: RefCell<HashMap<String, Vec<u8>>>,
    calls: RefCell<Vec<ShareCall>>,
    mkdir_failures: RefCell<HashMap<String, StoreError>>,
    stat_failure: RefCell<Option<StoreError>>,
}

impl FakeShare {
    pub fn insert(&self, path: &str, bytes: &[u8]) {
        self.files.borrow_mut().insert(path.to_string(), bytes.to_vec());
    }

    pub fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.files.borrow().get(path).cloned()
    }

    pub fn calls(&self) -> Vec<ShareCall> {
        self.calls.borrow().clone()
    }

    pub fn writes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ShareCall::Write { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn fail_mkdir(&self, path: &str, error: StoreError) {
        self.mkdir_failures.borrow_mut().insert(path.to_string(), error);
    }

    /// The next stat fails with `error`.
    pub fn fail_stat(&self, error: StoreError) {
        *self.stat_failure.borrow_mut() = Some(error);
    }
}

impl HierarchicalStore for FakeShare {
    fn create_container(&self, path: &str) -> Result<(), StoreError> {
        self.calls.borrow_mut().push(ShareCall::Mkdir(path.to_string()));
        match self.mkdir_failures.borrow_mut().remove(path) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn stat_object(&self, path: &str) -> Result<(), StoreError> {
        self.calls.borrow_mut().push(ShareCall::Stat(path.to_string()));
        if let Some(e) = self.stat_failure.borrow_mut().take() {
            return Err(e);
        }
        if self.files.borrow().contains_key(path) {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    fn write_object(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), StoreError> {
        self.calls.borrow_mut().push(ShareCall::Write {
            path: path.to_string(),
            content_type: content_type.to_string(),
        });
        self.insert(path, bytes);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketCall {
    BucketExists(String),
    CreateBucket(String),
    StatObject(String, String),
    PutObject {
        bucket: String,
        key: String,
        length: usize,
        content_type: String,
    },
}

/// A single bucket kept in memory.
pub struct FakeBucket {
    exists: Cell<bool>,
    objects: RefCell<HashMap<String, Vec<u8>>>,
    calls: RefCell<Vec<BucketCall>>,
    stat_failure: RefCell<Option<StoreError>>,
}

impl Default for FakeBucket {
    fn default() -> Self {
        FakeBucket {
            exists: Cell::new(true),
            objects: RefCell::new(HashMap::new()),
            calls: RefCell::new(Vec::new()),
            stat_failure: RefCell::new(None),
        }
    }
}

impl FakeBucket {
    pub fn without_bucket() -> FakeBucket {
        let bucket = FakeBucket::default();
        bucket.exists.set(false);
        bucket
    }

    pub fn insert(&self, key: &str, bytes: &[u8]) {
        self.objects.borrow_mut().insert(key.to_string(), bytes.to_vec());
    }

    pub fn content(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.borrow().get(key).cloned()
    }

    pub fn calls(&self) -> Vec<BucketCall> {
        self.calls.borrow().clone()
    }

    pub fn puts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                BucketCall::PutObject { key, .. } => Some(key),
                _ => None,
            })
            .collect()
    }

    /// The next stat fails with `error`.
    pub fn fail_stat(&self, error: StoreError) {
        *self.stat_failure.borrow_mut() = Some(error);
    }
}

impl FlatKeyStore for FakeBucket {
    fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError> {
        self.calls.borrow_mut().push(BucketCall::BucketExists(bucket.to_string()));
        Ok(self.exists.get())
    }

    fn create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        self.calls.borrow_mut().push(BucketCall::CreateBucket(bucket.to_string()));
        self.exists.set(true);
        Ok(())
    }

    fn stat_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.calls
            .borrow_mut()
            .push(BucketCall::StatObject(bucket.to_string(), key.to_string()));
        if let Some(e) = self.stat_failure.borrow_mut().take() {
            return Err(e);
        }
        if self.objects.borrow().contains_key(key) {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        length: usize,
        content_type: &str,
    ) -> Result<(), StoreError> {
        self.calls.borrow_mut().push(BucketCall::PutObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            length,
            content_type: content_type.to_string(),
        });
        self.insert(key, bytes);
        Ok(())
    }
}

/// Report source answering with a small document per day.
#[derive(Default)]
pub struct FakeSource {
    calls: RefCell<Vec<(i64, String, Date)>>,
    failing: RefCell<HashSet<Date>>,
}

impl FakeSource {
    pub fn report(date: Date) -> Value {
        json!({"data": [{"date": date.query_date()}]})
    }

    pub fn fail_on(&self, date: Date) {
        self.failing.borrow_mut().insert(date);
    }

    pub fn recover(&self) {
        self.failing.borrow_mut().clear();
    }

    pub fn calls(&self) -> Vec<(i64, String, Date)> {
        self.calls.borrow().clone()
    }
}

impl ReportSource for FakeSource {
    fn query_day_report(
        &self,
        project_id: i64,
        stream_id: &str,
        date: Date,
    ) -> Result<Value, UpstreamError> {
        self.calls
            .borrow_mut()
            .push((project_id, stream_id.to_string(), date));
        if self.failing.borrow().contains(&date) {
            return Err(UpstreamError::Status {
                status: 429,
                body: "Too Many Requests".to_string(),
            });
        }
        Ok(FakeSource::report(date))
    }
}
