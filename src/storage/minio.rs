use std::collections::HashMap;
use std::time::Duration;

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use jiff::civil::Date;
use log::{debug, error, info};
use tokio::runtime::Runtime;

use super::{flat_key_locator, FlatKeyStore, Locator, StorageProbe};
use crate::error::{Error, Result, StoreError};

/// Region that takes no location constraint when a bucket is created.
const DEFAULT_REGION: &str = "us-east-1";

/// Url of the S3 endpoint.  `endpoint` is `host[:port]` as given to the
/// minio clients, e.g. `minio.example.org:9000`, and `secure` selects https.
/// A full url is used as is.
pub fn endpoint_url(endpoint: &str, secure: bool) -> String {
    let endpoint = endpoint.trim_end_matches('/');
    if endpoint.contains("://") {
        return endpoint.to_string();
    }
    let scheme = if secure { "https" } else { "http" };
    format!("{}://{}", scheme, endpoint)
}

/// Blocking wrapper around the AWS S3 client, with path-style addressing as
/// MinIO wants it.
pub struct S3Client {
    client: Client,
    runtime: Runtime,
    region: String,
}

impl S3Client {
    pub fn new(
        endpoint: &str,
        secure: bool,
        region: &str,
        access_key: &str,
        secret_key: &str,
        timeout: Duration,
    ) -> Result<S3Client> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Config(format!("failed to start the S3 runtime: {e}")))?;
        let credentials = Credentials::new(access_key, secret_key, None, None, "acrloader");
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(endpoint_url(endpoint, secure))
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .retry_config(RetryConfig::standard().with_max_attempts(3))
            .timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build())
            .build();
        Ok(S3Client {
            client: Client::from_conf(config),
            runtime,
            region: region.to_string(),
        })
    }

    fn location(&self) -> Option<CreateBucketConfiguration> {
        if self.region == DEFAULT_REGION {
            return None;
        }
        Some(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build(),
        )
    }
}

/// HTTP status of a failed call, if the store answered at all.
fn status<E>(e: &SdkError<E, HttpResponse>) -> Option<u16> {
    e.raw_response().map(|response| response.status().as_u16())
}

fn sdk_fault<E>(e: SdkError<E, HttpResponse>) -> StoreError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let message = DisplayErrorContext(&e).to_string();
    match status(&e) {
        Some(status) => StoreError::Status {
            status,
            body: message,
        },
        None => StoreError::S3(message),
    }
}

impl FlatKeyStore for S3Client {
    fn bucket_exists(&self, bucket: &str) -> std::result::Result<bool, StoreError> {
        let result = self
            .runtime
            .block_on(self.client.head_bucket().bucket(bucket).send());
        match result {
            Ok(_) => Ok(true),
            Err(e)
                if e.as_service_error().is_some_and(|s| s.is_not_found())
                    || status(&e) == Some(404) =>
            {
                Ok(false)
            }
            Err(e) => Err(sdk_fault(e)),
        }
    }

    fn create_bucket(&self, bucket: &str) -> std::result::Result<(), StoreError> {
        let request = self
            .client
            .create_bucket()
            .bucket(bucket)
            .set_create_bucket_configuration(self.location());
        match self.runtime.block_on(request.send()) {
            Ok(_) => Ok(()),
            Err(e)
                if e
                    .as_service_error()
                    .is_some_and(|s| s.is_bucket_already_owned_by_you()) =>
            {
                Err(StoreError::AlreadyExists)
            }
            Err(e) => Err(sdk_fault(e)),
        }
    }

    fn stat_object(&self, bucket: &str, key: &str) -> std::result::Result<(), StoreError> {
        let result = self
            .runtime
            .block_on(self.client.head_object().bucket(bucket).key(key).send());
        match result {
            Ok(_) => Ok(()),
            Err(e)
                if e.as_service_error().is_some_and(|s| s.is_not_found())
                    || status(&e) == Some(404) =>
            {
                Err(StoreError::NotFound)
            }
            Err(e) => Err(sdk_fault(e)),
        }
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        length: usize,
        content_type: &str,
    ) -> std::result::Result<(), StoreError> {
        if length != bytes.len() {
            return Err(StoreError::Request(format!(
                "length {} does not match payload of {} bytes",
                length,
                bytes.len()
            )));
        }
        let request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .content_length(length as i64)
            .body(ByteStream::from(bytes.to_vec()));
        self.runtime
            .block_on(request.send())
            .map(|_| ())
            .map_err(sdk_fault)
    }
}

/// Probe for the S3 compatible store.  Reports are stored flat, as
/// `YYYY-MM-DD.json` in a single bucket.
pub struct MinioProbe<C: FlatKeyStore> {
    store: C,
    bucket: String,
    bucket_ready: bool,
    objects: HashMap<Locator, bool>,
}

impl<C: FlatKeyStore> MinioProbe<C> {
    pub fn new(store: C, bucket: &str) -> MinioProbe<C> {
        MinioProbe {
            store,
            bucket: bucket.to_string(),
            bucket_ready: false,
            objects: HashMap::new(),
        }
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    fn fault(&self, locator: String, source: StoreError) -> Error {
        Error::Backend {
            backend: self.name().to_string(),
            locator,
            source,
        }
    }

    /// Create the bucket if it is not there yet.  Only checked once per run.
    pub fn ensure_bucket(&mut self) -> Result<()> {
        if self.bucket_ready {
            return Ok(());
        }
        let exists = self
            .store
            .bucket_exists(&self.bucket)
            .map_err(|e| self.fault(self.bucket.clone(), e))?;
        if !exists {
            match self.store.create_bucket(&self.bucket) {
                Ok(()) => info!("created bucket {}", self.bucket),
                Err(StoreError::AlreadyExists) => debug!("bucket {} already exists", self.bucket),
                Err(e) => return Err(self.fault(self.bucket.clone(), e)),
            }
        }
        self.bucket_ready = true;
        Ok(())
    }

    fn object<'a>(&self, locator: &'a Locator) -> Result<(&'a str, &'a str)> {
        match locator {
            Locator::Object { bucket, key } => Ok((bucket, key)),
            Locator::Path(path) => Err(self.fault(
                path.clone(),
                StoreError::Request("expected a bucket and key".to_string()),
            )),
        }
    }
}

impl<C: FlatKeyStore> StorageProbe for MinioProbe<C> {
    fn name(&self) -> &str {
        "MinIO"
    }

    fn locator(&self, date: Date) -> Locator {
        flat_key_locator(&self.bucket, date)
    }

    fn prepare(&mut self, _date: Date) -> Result<()> {
        self.ensure_bucket()
    }

    fn object_exists(&mut self, locator: &Locator) -> Result<bool> {
        if let Some(&exists) = self.objects.get(locator) {
            return Ok(exists);
        }
        let (bucket, key) = self.object(locator)?;
        let exists = match self.store.stat_object(bucket, key) {
            Ok(()) => true,
            Err(StoreError::NotFound) => false,
            Err(e) => {
                error!("failed to check {}: {}", locator, e);
                return Err(self.fault(locator.to_string(), e));
            }
        };
        self.objects.insert(locator.clone(), exists);
        Ok(exists)
    }

    fn write_object(&mut self, locator: &Locator, bytes: &[u8], content_type: &str) -> Result<()> {
        let (bucket, key) = self.object(locator)?;
        self.store
            .put_object(bucket, key, bytes, bytes.len(), content_type)
            .map_err(|e| self.fault(locator.to_string(), e))?;
        self.objects.insert(locator.clone(), true);
        Ok(())
    }
}
