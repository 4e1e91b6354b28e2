//! Link preview extraction engine.
//!
//! A request flows through [`PreviewEngine::get_preview`]: the page is fetched
//! under each [`Identity`] in turn, parsed, run through the field extractors
//! and the image resolver, and merged into a single best-effort result.

pub mod aggregator;
pub mod document;
pub mod extract;
pub mod fetcher;
pub mod guard;
pub mod resolver;
pub mod validator;

use thiserror::Error;
use url::Url;

pub use aggregator::{PreviewAccumulator, PreviewEngine};
pub use fetcher::{build_client, Identity, PageFetcher, DEFAULT_LANGUAGE};
pub use validator::{ImageFormat, ImagePolicy, ImageValidator};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreviewError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL did not return HTML content")]
    NotHtml,
}

/// Parse a request URL, accepting only absolute http(s) URLs with a host.
pub fn parse_target(raw: &str) -> Result<Url, PreviewError> {
    let url = Url::parse(raw.trim()).map_err(|e| PreviewError::InvalidUrl(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(PreviewError::InvalidUrl(format!(
                "unsupported scheme '{other}'"
            )))
        }
    }

    if url.host_str().is_none() {
        return Err(PreviewError::InvalidUrl("URL has no host".into()));
    }

    Ok(url)
}
