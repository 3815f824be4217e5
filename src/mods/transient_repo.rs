use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use bytes::Bytes;
use hyper::StatusCode;

use crate::mods::remote_repo::{DirectoryEntry, ListError, RemoteModsRepo};

/// in-memory mods repository, neither optimized nor particularly robust - for testing purposes
#[derive(Default)]
pub struct TransientModsRepo {
    directories: HashMap<String, Vec<DirectoryEntry>>,
    listing_failures: HashMap<String, StatusCode>,
    files: HashMap<String, Bytes>,
    requests: Mutex<Vec<String>>,
}
impl TransientModsRepo {
    pub fn new() -> TransientModsRepo {
        Default::default()
    }

    pub fn with_directory(mut self, path: &str, entries: Vec<DirectoryEntry>) -> TransientModsRepo {
        self.directories.insert(path.to_string(), entries);
        self
    }

    pub fn with_listing_failure(mut self, path: &str, status: StatusCode) -> TransientModsRepo {
        self.listing_failures.insert(path.to_string(), status);
        self
    }

    /// Registers a file entry with content. The entry is not added to any directory.
    pub fn with_file(mut self, entry: &DirectoryEntry, data: &'static [u8]) -> TransientModsRepo {
        if let Some(locator) = &entry.download_locator {
            self.files.insert(locator.clone(), Bytes::from_static(data));
        }
        self
    }

    /// every listed path and fetched locator, in request order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteModsRepo for TransientModsRepo {
    async fn list_directory(&self, path: &str) -> Result<Vec<DirectoryEntry>, ListError> {
        self.requests.lock().unwrap().push(path.to_string());

        if let Some(status) = self.listing_failures.get(path) {
            return Err(ListError::UpstreamFailure(*status));
        }
        self.directories.get(path)
            .cloned()
            .ok_or_else(|| ListError::NotFound(path.to_string()))
    }

    async fn fetch_member(&self, entry: &DirectoryEntry) -> anyhow::Result<Bytes> {
        let locator = entry.download_locator.as_deref()
            .ok_or_else(|| anyhow!("no download locator for {}", entry.name))?;
        self.requests.lock().unwrap().push(locator.to_string());

        self.files.get(locator)
            .cloned()
            .ok_or_else(|| anyhow!("upstream request for {} failed: {}", entry.name, StatusCode::NOT_FOUND))
    }
}

/// A file entry with an in-memory download locator.
pub fn mem_file(name: &str) -> DirectoryEntry {
    DirectoryEntry::file(name, &format!("mem://{}", name))
}
