// src/page/client.rs
use std::time::Duration;

use reqwest::header;

use crate::utils::error::FetchError;

// The listing site serves a consent interstitial to unknown clients, so
// present a regular desktop browser.
const PAGE_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Creates a reqwest client configured for fetching listing pages.
fn build_page_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(PAGE_USER_AGENT)
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
}

/// Resolves a capture source to page HTML.
///
/// URLs are fetched once over the network; anything else is treated as the
/// path of a locally saved page. No link following, no further requests.
pub async fn load_page(source: &str) -> Result<String, FetchError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        download_page(source).await
    } else {
        tracing::debug!("Reading listing page from file: {}", source);
        let body = std::fs::read_to_string(source)?;
        Ok(body)
    }
}

/// Downloads a single listing page from its URL.
pub async fn download_page(url: &str) -> Result<String, FetchError> {
    let client = build_page_client()?; // Propagate client build error if any

    tracing::info!("Downloading listing page from: {}", url);

    let response = client
        .get(url)
        .header(header::ACCEPT, "text/html,application/xhtml+xml,*/*")
        .send()
        .await?; // Propagates reqwest::Error as FetchError::Network

    // Check if the request was successful (status code 2xx)
    let status = response.status();
    if !status.is_success() {
        tracing::error!("HTTP error status: {} for URL: {}", status, url);
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::PageNotFound(url.to_string()));
        }
        return Err(FetchError::Http(status));
    }

    let body = response.text().await?;
    tracing::debug!("Successfully downloaded {} bytes from {}", body.len(), url);

    Ok(body)
}
