use std::collections::HashMap;
use std::time::Duration;

use jiff::civil::Date;
use log::{debug, error, info, warn};
use reqwest::{
    blocking::Client,
    header::CONTENT_TYPE,
    Method, StatusCode, Url,
};

use super::{
    hierarchical_containers, hierarchical_locator, HierarchicalStore, Locator, StorageProbe,
};
use crate::error::{Error, Result, StoreError};

/// Minimal WebDAV client for an ownCloud share.
pub struct WebDavClient {
    client: Client,
    base: Url,
    user: String,
    password: String,
    mkcol: Method,
    propfind: Method,
}

impl WebDavClient {
    /// `url` is the ownCloud server, e.g. `https://share.rabe.ch`.  Requests go
    /// to its `remote.php/webdav` endpoint.
    pub fn new(url: &str, user: &str, password: &str, timeout: Duration) -> Result<WebDavClient> {
        let mut base =
            Url::parse(url).map_err(|e| Error::Config(format!("invalid ownCloud url {url}: {e}")))?;
        base.path_segments_mut()
            .map_err(|_| Error::Config(format!("ownCloud url {url} cannot be a base")))?
            .pop_if_empty()
            .extend(["remote.php", "webdav"]);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        let mkcol = Method::from_bytes(b"MKCOL")
            .map_err(|e| Error::Config(e.to_string()))?;
        let propfind = Method::from_bytes(b"PROPFIND")
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(WebDavClient {
            client,
            base,
            user: user.to_string(),
            password: password.to_string(),
            mkcol,
            propfind,
        })
    }

    /// Url of a share path.  Segments are percent-encoded.
    pub fn url(&self, path: &str) -> std::result::Result<Url, StoreError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Request(format!("cannot append {path} to {}", self.base)))?
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }

    fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<(Vec<u8>, &str)>,
    ) -> std::result::Result<StatusCode, StoreError> {
        let mut builder = self
            .client
            .request(method.clone(), self.url(path)?)
            .basic_auth(&self.user, Some(&self.password));
        if method == self.propfind {
            builder = builder.header("Depth", "0");
        }
        if let Some((bytes, content_type)) = body {
            builder = builder.header(CONTENT_TYPE, content_type).body(bytes);
        }
        let response = builder.send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(status);
        }
        match status {
            StatusCode::NOT_FOUND => Err(StoreError::NotFound),
            StatusCode::METHOD_NOT_ALLOWED if method == self.mkcol => {
                Err(StoreError::AlreadyExists)
            }
            _ => Err(StoreError::Status {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            }),
        }
    }
}

impl HierarchicalStore for WebDavClient {
    fn create_container(&self, path: &str) -> std::result::Result<(), StoreError> {
        self.send(self.mkcol.clone(), path, None).map(|_| ())
    }

    fn stat_object(&self, path: &str) -> std::result::Result<(), StoreError> {
        self.send(self.propfind.clone(), path, None).map(|_| ())
    }

    fn write_object(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> std::result::Result<(), StoreError> {
        self.send(Method::PUT, path, Some((bytes.to_vec(), content_type)))
            .map(|_| ())
    }
}

/// Probe for the ownCloud share.  Reports are stored as
/// `root/YYYY/M/YYYY-MM-DD.json` and the folders are created on demand.
pub struct OwnCloudProbe<C: HierarchicalStore> {
    store: C,
    root: String,
    containers: HashMap<String, bool>,
    objects: HashMap<Locator, bool>,
}

impl<C: HierarchicalStore> OwnCloudProbe<C> {
    pub fn new(store: C, root: &str) -> OwnCloudProbe<C> {
        OwnCloudProbe {
            store,
            root: root.to_string(),
            containers: HashMap::new(),
            objects: HashMap::new(),
        }
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    fn fault(&self, locator: &Locator, source: StoreError) -> Error {
        Error::Backend {
            backend: self.name().to_string(),
            locator: locator.to_string(),
            source,
        }
    }

    /// Create the folder at `path` unless this run already did.
    ///
    /// An existing folder is fine.  Any other failure is logged and the run
    /// carries on as if the folder existed; a real problem will show up when
    /// the object is checked or written.
    pub fn ensure_path_exists(&mut self, path: &str) -> bool {
        if let Some(&ok) = self.containers.get(path) {
            return ok;
        }
        match self.store.create_container(path) {
            Ok(()) => info!("created folder {}", path),
            Err(StoreError::AlreadyExists) => debug!("folder {} already exists", path),
            Err(e) => warn!("failed to create folder {}, continuing: {}", path, e),
        }
        self.containers.insert(path.to_string(), true);
        true
    }
}

impl<C: HierarchicalStore> StorageProbe for OwnCloudProbe<C> {
    fn name(&self) -> &str {
        "ownCloud"
    }

    fn locator(&self, date: Date) -> Locator {
        hierarchical_locator(&self.root, date)
    }

    fn prepare(&mut self, date: Date) -> Result<()> {
        for path in hierarchical_containers(&self.root, date) {
            self.ensure_path_exists(&path);
        }
        Ok(())
    }

    fn object_exists(&mut self, locator: &Locator) -> Result<bool> {
        if let Some(&exists) = self.objects.get(locator) {
            return Ok(exists);
        }
        let exists = match self.store.stat_object(&locator.to_string()) {
            Ok(()) => true,
            Err(StoreError::NotFound) => false,
            Err(source) => {
                error!("failed to check {}: {}", locator, source);
                return Err(self.fault(locator, source));
            }
        };
        self.objects.insert(locator.clone(), exists);
        Ok(exists)
    }

    fn write_object(&mut self, locator: &Locator, bytes: &[u8], content_type: &str) -> Result<()> {
        self.store
            .write_object(&locator.to_string(), bytes, content_type)
            .map_err(|source| self.fault(locator, source))?;
        self.objects.insert(locator.clone(), true);
        Ok(())
    }
}
