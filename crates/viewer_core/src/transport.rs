use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use shared::domain::DocumentId;
use tracing::debug;
use url::Url;

use crate::error::TransportError;

/// Raw result of a retrieval: the status as the transport reported it and the
/// body text, whatever that status was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    pub status: u16,
    pub body: String,
}

impl FetchedDocument {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait DocumentTransport: Send + Sync {
    /// Only failures of the transport itself are errors. A non-success status
    /// is returned as data.
    async fn fetch(&self, document: &DocumentId) -> Result<FetchedDocument, TransportError>;
}

/// Relative HTTP GET against the base path the chapters are hosted under.
pub struct HttpTransport {
    http: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let base_url = normalize_base_url(base_url)?;
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url,
        })
    }

    pub fn resolve(&self, document: &DocumentId) -> Result<Url, TransportError> {
        self.base_url
            .join(document.as_str())
            .map_err(|source| TransportError::Resolve {
                document: document.to_string(),
                base: self.base_url.to_string(),
                source,
            })
    }
}

#[async_trait]
impl DocumentTransport for HttpTransport {
    async fn fetch(&self, document: &DocumentId) -> Result<FetchedDocument, TransportError> {
        let url = self.resolve(document)?;
        debug!("viewer: http fetch url={url}");
        let res = self.http.get(url).send().await?;
        let status = res.status().as_u16();
        let body = res.text().await?;
        Ok(FetchedDocument { status, body })
    }
}

/// Joining `PART_1.md` onto `http://host/book` would replace `book`, so the
/// base path always gets a trailing slash.
fn normalize_base_url(raw: &str) -> Result<Url, TransportError> {
    let raw = raw.trim();
    let mut url =
        Url::parse(raw).map_err(|err| TransportError::InvalidBaseUrl(raw.to_string(), err))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Reads chapters from a local directory. A missing file is reported as a 404
/// so status handling stays the same as over HTTP.
pub struct DirectoryTransport {
    root: PathBuf,
}

impl DirectoryTransport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DocumentTransport for DirectoryTransport {
    async fn fetch(&self, document: &DocumentId) -> Result<FetchedDocument, TransportError> {
        let path = self.root.join(document.as_str());
        debug!("viewer: file fetch path={}", path.display());
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(FetchedDocument::ok(String::from_utf8_lossy(&bytes))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(FetchedDocument {
                status: 404,
                body: String::new(),
            }),
            Err(source) => Err(TransportError::Io { path, source }),
        }
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
