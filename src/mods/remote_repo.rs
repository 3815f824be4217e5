use anyhow::anyhow;
use async_trait::async_trait;
use bytes::Bytes;
use hyper::{Body, Client, Request, StatusCode, Uri};
use hyper::body::to_bytes;
use hyper::client::HttpConnector;
use hyper::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use hyper_tls::HttpsConnector;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
pub enum EntryKind {
    #[serde(rename = "file")]
    File,
    #[serde(rename = "dir")]
    Directory,
    /// symlinks, submodules and whatever else upstream may report
    #[serde(other)]
    Other,
}

/// One item of an upstream directory listing, in the shape of the GitHub contents API.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// absent (null) for directories
    #[serde(rename = "download_url", default)]
    pub download_locator: Option<String>,
    /// git blob id of the file content
    #[serde(default)]
    pub sha: Option<String>,
}
impl DirectoryEntry {
    pub fn file(name: &str, download_locator: &str) -> DirectoryEntry {
        DirectoryEntry {
            name: name.to_string(),
            kind: EntryKind::File,
            download_locator: Some(download_locator.to_string()),
            sha: None,
        }
    }

    pub fn directory(name: &str) -> DirectoryEntry {
        DirectoryEntry {
            name: name.to_string(),
            kind: EntryKind::Directory,
            download_locator: None,
            sha: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ListError {
    #[error("upstream path not found: {0}")]
    NotFound(String),
    #[error("upstream request failed: {0}")]
    UpstreamFailure(StatusCode),
    #[error("upstream request could not be completed: {0}")]
    Transport(#[from] hyper::Error),
    #[error("invalid upstream request: {0}")]
    InvalidRequest(#[from] hyper::http::Error),
    #[error("upstream listing is not a directory listing: {0}")]
    MalformedListing(#[from] serde_json::Error),
}

/// Read access to the repository holding the mods.
#[async_trait]
pub trait RemoteModsRepo: Send + Sync {
    /// Lists a repository-relative directory, preserving upstream order.
    async fn list_directory(&self, path: &str) -> Result<Vec<DirectoryEntry>, ListError>;

    /// Fetches the full content of a file entry through its download locator.
    async fn fetch_member(&self, entry: &DirectoryEntry) -> anyhow::Result<Bytes>;
}

/// Client for the GitHub contents API of a single repository.
///
/// Instances do HTTP connection caching internally, so keeping them alive has performance benefits.
pub struct GithubContentsRepo {
    client: Client<HttpsConnector<HttpConnector>>,
    contents_uri: String, // with trailing '/'
    user_agent: String,
    token: Option<String>,
}
impl GithubContentsRepo {
    /// `repository` is "owner/name". Without a token, requests are unauthenticated and subject
    ///  to GitHub's lower rate limit.
    pub fn new(api_base: &str, repository: &str, user_agent: String, token: Option<String>) -> anyhow::Result<GithubContentsRepo> {
        let contents_uri = format!(
            "{}/repos/{}/contents/",
            api_base.trim_end_matches('/'),
            repository.trim_matches('/'),
        );

        // check that the base URI is valid
        Uri::try_from(contents_uri.clone())?;

        Ok(GithubContentsRepo {
            client: Client::builder()
                .build::<_, Body>(HttpsConnector::new()),
            contents_uri,
            user_agent,
            token,
        })
    }

    fn get_request(&self, uri: &str) -> Result<Request<Body>, hyper::http::Error> {
        let mut builder = Request::builder()
            .method("GET")
            .uri(uri)
            .header(ACCEPT, "application/vnd.github.v3+json")
            .header(USER_AGENT, &self.user_agent);
        if let Some(token) = &self.token {
            builder = builder.header(AUTHORIZATION, format!("token {}", token));
        }
        builder.body(Body::empty())
    }
}

#[async_trait]
impl RemoteModsRepo for GithubContentsRepo {
    async fn list_directory(&self, path: &str) -> Result<Vec<DirectoryEntry>, ListError> {
        let uri = format!("{}{}", self.contents_uri, path.trim_start_matches('/'));
        trace!("listing {}", uri);

        let response = self.client.request(self.get_request(&uri)?)
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ListError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(ListError::UpstreamFailure(status));
        }

        let body = to_bytes(response.into_body())
            .await?;
        let entries: Vec<DirectoryEntry> = serde_json::from_slice(&body)?;
        debug!("{} entries in {}", entries.len(), path);
        Ok(entries)
    }

    async fn fetch_member(&self, entry: &DirectoryEntry) -> anyhow::Result<Bytes> {
        let locator = entry.download_locator.as_deref()
            .ok_or_else(|| anyhow!("no download locator for {}", entry.name))?;
        trace!("fetching {}", locator);

        let response = self.client.request(self.get_request(locator)?)
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("upstream request for {} failed: {}", entry.name, response.status()));
        }

        Ok(to_bytes(response.into_body()).await?)
    }
}
