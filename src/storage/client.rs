//! Upload client and content references.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::config::StorageConfig;

const IPFS_SCHEME: &str = "ipfs://";

/// Errors from the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("nothing to upload")]
    NoFiles,

    #[error("upload request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid content reference '{0}'")]
    InvalidReference(String),
}

/// A file to upload.
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FilePayload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes,
        }
    }
}

/// Pointer to uploaded content: a CID plus a path inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRef {
    pub cid: String,
    pub path: String,
}

impl ContentRef {
    /// Parse `ipfs://<cid>/<path>` or `<cid>/<path>`. The path may be empty.
    pub fn parse(reference: &str) -> Result<Self, StorageError> {
        let trimmed = reference.trim();
        let body = trimmed.strip_prefix(IPFS_SCHEME).unwrap_or(trimmed);
        let (cid, path) = match body.split_once('/') {
            Some((cid, path)) => (cid, path.trim_end_matches('/')),
            None => (body, ""),
        };
        if cid.is_empty() || cid.contains(char::is_whitespace) {
            return Err(StorageError::InvalidReference(reference.to_string()));
        }
        Ok(Self {
            cid: cid.to_string(),
            path: path.to_string(),
        })
    }

    /// `<cid>/<path>`, the form stored in contract metadata.
    pub fn locator(&self) -> String {
        if self.path.is_empty() {
            self.cid.clone()
        } else {
            format!("{}/{}", self.cid, self.path)
        }
    }

    /// `ipfs://<cid>/<path>`.
    pub fn uri(&self) -> String {
        format!("{}{}", IPFS_SCHEME, self.locator())
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// Uploads payloads and hands back where they landed.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Upload one or more files as a single directory. The returned
    /// reference points at the first file.
    async fn upload(&self, files: Vec<FilePayload>) -> Result<ContentRef, StorageError>;
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// Multipart client for IPFS pinning endpoints.
#[derive(Debug, Clone)]
pub struct HttpContentStore {
    client: reqwest::Client,
    upload_url: String,
    api_key: String,
}

impl HttpContentStore {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            upload_url: config.upload_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ContentStore for HttpContentStore {
    async fn upload(&self, files: Vec<FilePayload>) -> Result<ContentRef, StorageError> {
        let first = files.first().ok_or(StorageError::NoFiles)?.file_name.clone();
        let total_bytes: usize = files.iter().map(|f| f.bytes.len()).sum();

        let mut form = Form::new();
        for file in files {
            let mut part = Part::bytes(file.bytes).file_name(file.file_name);
            if let Some(content_type) = file.content_type {
                part = part.mime_str(&content_type)?;
            }
            form = form.part("file", part);
        }

        let mut request = self.client.post(&self.upload_url).multipart(form);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let pinned: PinResponse = response.json().await?;
        let reference = ContentRef {
            cid: pinned.ipfs_hash,
            path: first,
        };
        tracing::info!(reference = %reference, bytes = total_bytes, "Content uploaded");
        Ok(reference)
    }
}
