//! HTTP document fetching for primary and secondary profile sources.
//!
//! One GET per document, no retries. The body is capped at a configurable
//! ceiling so a hostile endpoint cannot make us parse an unbounded graph.

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};
use url::Url;

use webcard_shared::{ContentType, Document, ResolverConfig, Result, WebcardError};

/// User-Agent string for fetch requests.
const USER_AGENT: &str = concat!("webcard/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects the transport follows.
const MAX_REDIRECTS: usize = 5;

/// Fetches documents and performs the one-shot notification POST.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_document_bytes: u64,
}

impl Fetcher {
    /// Create a fetcher with the configured timeout and size ceiling.
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WebcardError::fetch("-", format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_document_bytes: config.max_document_bytes,
        })
    }

    /// GET `uri`, optionally negotiating with an `Accept` header.
    #[instrument(skip(self), fields(max_bytes = self.max_document_bytes))]
    pub async fn fetch(&self, uri: &str, accept: Option<&str>) -> Result<Document> {
        let url = Url::parse(uri).map_err(|e| WebcardError::fetch(uri, format!("invalid URL: {e}")))?;

        let mut request = self.client.get(url.as_str());
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }

        let mut response = request
            .send()
            .await
            .map_err(|e| WebcardError::fetch(uri, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebcardError::FetchFailure {
                url: uri.to_string(),
                status: Some(status.as_u16()),
                message: format!("HTTP {status}"),
            });
        }

        // Check content-length if available
        if let Some(len) = response.content_length() {
            self.check_size(uri, len)?;
        }

        let content_type = ContentType::from_header(
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
        );

        // The header may be absent or wrong; count what actually arrives.
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| WebcardError::fetch(uri, format!("failed to read body: {e}")))?
        {
            self.check_size(uri, (bytes.len() + chunk.len()) as u64)?;
            bytes.extend_from_slice(&chunk);
        }
        let body = String::from_utf8(bytes)
            .map_err(|e| WebcardError::fetch(uri, format!("body is not valid UTF-8: {e}")))?;

        let content_hash = compute_hash(&body);
        info!(
            bytes = body.len(),
            ?content_type,
            %content_hash,
            "document fetched"
        );

        Ok(Document {
            uri: uri.to_string(),
            body,
            content_type,
            content_hash,
            fetched_at: Utc::now(),
        })
    }

    /// POST `body` to `uri`. Returns the response status on 2xx.
    #[instrument(skip(self, body), fields(bytes = body.len()))]
    pub async fn post(&self, uri: &str, content_type: &str, body: String) -> Result<u16> {
        let response = self
            .client
            .post(uri)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| WebcardError::fetch(uri, e.to_string()))?;

        let status = response.status();
        debug!(%status, "POST completed");
        if !status.is_success() {
            return Err(WebcardError::FetchFailure {
                url: uri.to_string(),
                status: Some(status.as_u16()),
                message: format!("HTTP {status}"),
            });
        }
        Ok(status.as_u16())
    }

    fn check_size(&self, uri: &str, size: u64) -> Result<()> {
        if size > self.max_document_bytes {
            return Err(WebcardError::DocumentTooLarge {
                url: uri.to_string(),
                size,
                limit: self.max_document_bytes,
            });
        }
        Ok(())
    }
}

/// Compute SHA-256 hash of content.
fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
