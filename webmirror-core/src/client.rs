use std::time::Duration;

use reqwest::header::{CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA, USER_AGENT};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const NOT_FOUND_CODE: &str = "404";
const NOT_FOUND_PHRASE: &str = "Page Not Found";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("HTTP {status} for {url}")]
    Status { status: StatusCode, url: Url },
    #[error("server answered with a not-found page")]
    NotFoundPage,
}

impl FetchError {
    /// Short one-line form for progress output.
    pub fn diagnostic(&self) -> String {
        match self {
            FetchError::Status { status, .. } => format!("HTTP {}", status.as_u16()),
            FetchError::Request(err) if err.is_timeout() => "timed out".to_string(),
            FetchError::Request(err) if err.is_connect() => "connection failed".to_string(),
            other => {
                let text = other.to_string();
                match text.char_indices().nth(50) {
                    Some((cut, _)) => text[..cut].to_string(),
                    None => text,
                }
            }
        }
    }
}

/// Single-shot HTTP fetcher bound to the base URL of the mirrored project.
#[derive(Clone)]
pub struct MirrorClient {
    http: Client,
    base_url: Url,
}

impl MirrorClient {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let http = Client::builder()
            .default_headers(default_headers())
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: Url::parse(base_url.trim_end_matches('/'))?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends `relative` to the base as a plain string so the last base
    /// segment (often a project folder) survives. Empty means the base itself.
    pub fn resource_url(&self, relative: &str) -> Result<Url, FetchError> {
        let relative = relative.trim_start_matches('/');
        if relative.is_empty() {
            return Ok(self.base_url.clone());
        }
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{relative}"))?)
    }

    pub async fn fetch(&self, relative: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.resource_url(relative)?;
        self.fetch_url(url).await
    }

    pub async fn fetch_url(&self, url: Url) -> Result<Vec<u8>, FetchError> {
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status, url });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

/// Some dev servers answer 200 with an error page; treat those bodies as missing.
pub fn looks_like_not_found(body: &[u8]) -> bool {
    let text = String::from_utf8_lossy(body);
    text.contains(NOT_FOUND_CODE) && text.contains(NOT_FOUND_PHRASE)
}
