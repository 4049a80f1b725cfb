//! Page fetching.
//!
//! One GET per request, no timeout, no retries: the fetch blocks for as
//! long as the upstream takes and any failure surfaces immediately.

use anyhow::{Context, Result};
use url::Url;

/// Error for an upstream response with a non-success status. The HTTP layer
/// maps this onto a 400 with a fixed message; every other failure in the
/// pipeline becomes a generic 500.
#[derive(Debug)]
pub struct FetchFailed {
    pub status: reqwest::StatusCode,
}

impl std::fmt::Display for FetchFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "upstream fetch returned {}", self.status)
    }
}

impl std::error::Error for FetchFailed {}

/// Fetches a page and returns its body as text.
pub async fn fetch_page(url: &str) -> Result<String> {
    let url = Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;

    let client = reqwest::Client::builder().build()?;
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow::Error::new(FetchFailed { status }));
    }

    let body = response.text().await?;
    Ok(body)
}
