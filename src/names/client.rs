//! Name service client.
//!
//! Speaks the NameStone-style directory API:
//! - `GET  {base}/search-names?domain=&name=` → `[NameRecord]`
//! - `GET  {base}/get-names?address=`         → `[NameRecord]`
//! - `POST {base}/set-name` with `{domain, name, address}`

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::NamesConfig;

/// Errors talking to the name service.
#[derive(Debug, Error)]
pub enum NameError {
    #[error("name service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("name service returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// One binding returned by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRecord {
    pub name: String,
    #[serde(default)]
    pub domain: String,
    pub address: String,
}

/// Body of a name claim.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimRequest<'a> {
    pub domain: &'a str,
    pub name: &'a str,
    pub address: &'a str,
}

/// Directory lookups and claims.
#[async_trait]
pub trait NameService: Send + Sync {
    /// Candidates bound to `name` under `domain`.
    async fn search(&self, domain: &str, name: &str) -> Result<Vec<NameRecord>, NameError>;

    /// Names bound to `address`.
    async fn names_for(&self, address: &str) -> Result<Vec<NameRecord>, NameError>;

    /// Bind `name` under `domain` to `address`.
    async fn claim(&self, domain: &str, name: &str, address: &str) -> Result<(), NameError>;
}

/// HTTP implementation of [`NameService`].
#[derive(Debug, Clone)]
pub struct HttpNameService {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpNameService {
    pub fn new(config: &NamesConfig) -> Result<Self, NameError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.get(format!("{}/{}", self.base_url, path)))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            builder
        } else {
            builder.header(AUTHORIZATION, &self.api_key)
        }
    }

    async fn records(response: reqwest::Response) -> Result<Vec<NameRecord>, NameError> {
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, NameError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(NameError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl NameService for HttpNameService {
    async fn search(&self, domain: &str, name: &str) -> Result<Vec<NameRecord>, NameError> {
        let response = self
            .get("search-names")
            .query(&[("domain", domain), ("name", name)])
            .send()
            .await?;
        Self::records(response).await
    }

    async fn names_for(&self, address: &str) -> Result<Vec<NameRecord>, NameError> {
        let response = self
            .get("get-names")
            .query(&[("address", address)])
            .send()
            .await?;
        Self::records(response).await
    }

    async fn claim(&self, domain: &str, name: &str, address: &str) -> Result<(), NameError> {
        let body = ClaimRequest {
            domain,
            name,
            address,
        };
        let response = self
            .authorize(self.client.post(format!("{}/set-name", self.base_url)))
            .json(&body)
            .send()
            .await?;
        check_status(response).await?;
        tracing::info!(name = %name, domain = %domain, address = %address, "Name claimed");
        Ok(())
    }
}
