use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ApiPage, ListingRecord};

pub const DEFAULT_ENDPOINT: &str = "https://api.weekday.technology/adhoc/getSampleJdJSON";
pub const PAGE_SIZE: u32 = 10;

/// Body posted to the listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u32,
}

impl PageRequest {
    /// `page` is 1-based.
    pub fn for_page(page: u32, page_size: u32) -> Self {
        Self {
            limit: page_size,
            offset: page.saturating_sub(1).saturating_mul(page_size),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("listing endpoint returned status {status}")]
    BadStatus { status: u16 },
    #[error("malformed listing response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// One page of listings as returned by the endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingPage {
    pub records: Vec<ListingRecord>,
    pub total_count: Option<u64>,
}

pub fn decode_page(body: &[u8]) -> Result<ListingPage, FetchError> {
    let page: ApiPage = serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok(ListingPage {
        records: page.jd_list.into_iter().map(ListingRecord::from).collect(),
        total_count: page.total_count,
    })
}

#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_page(&self, request: PageRequest) -> Result<ListingPage, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpListingSource {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpListingSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ListingSource for HttpListingSource {
    async fn fetch_page(&self, request: PageRequest) -> Result<ListingPage, FetchError> {
        tracing::debug!(endpoint = %self.endpoint, limit = request.limit, offset = request.offset, "fetching listings");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::BadStatus { status: status.as_u16() });
        }

        let body = response.bytes().await?;
        decode_page(&body)
    }
}
