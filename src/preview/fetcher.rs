//! Page fetching under a rotating set of client identities.

use std::time::Duration;

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONNECTION, CONTENT_TYPE, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::Client as ReqwestClient;
use url::Url;

use super::guard::is_private_literal;

pub const PAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(15);
pub const MAX_REDIRECTS: usize = 5;
pub const DEFAULT_LANGUAGE: &str = "en-US";
pub const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// A User-Agent the fetcher can present itself as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub user_agent: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            user_agent: user_agent.into(),
        }
    }

    /// Identities in the order they are tried: search crawler first (most
    /// sites serve full metadata to it), then a preview bot, then a browser.
    pub fn default_rotation() -> Vec<Identity> {
        vec![
            Identity::new(
                "googlebot",
                "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)",
            ),
            Identity::new(
                "link-preview-bot",
                "Mozilla/5.0 (compatible; LinkPreviewBot/1.0; +http://example.com/bot)",
            ),
            Identity::new(
                "desktop-chrome",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
            ),
        ]
    }
}

#[derive(Debug)]
pub enum FetchOutcome {
    /// Body passed both the content-type and the leading-markup checks.
    Html(String),
    NonHtml,
    NetworkError(String),
}

/// One request made under one identity.
#[derive(Debug)]
pub struct FetchAttempt {
    pub identity: String,
    pub content_type: Option<String>,
    pub outcome: FetchOutcome,
}

/// Build the shared HTTP client used for page and image fetches.
pub fn build_client(block_private_hosts: bool) -> reqwest::Result<ReqwestClient> {
    ReqwestClient::builder()
        .timeout(PAGE_FETCH_TIMEOUT)
        .redirect(redirect_policy(block_private_hosts))
        .build()
}

/// Follows at most [`MAX_REDIRECTS`] hops. With private hosts blocked, a hop
/// to a private IP literal or `localhost` ends the request with an error.
fn redirect_policy(block_private_hosts: bool) -> Policy {
    Policy::custom(move |attempt| {
        // `previous` already holds the original URL, so N redirects leave N
        // entries when the Nth is checked.
        if attempt.previous().len() > MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if block_private_hosts && is_private_literal(attempt.url()) {
            tracing::warn!(url = %attempt.url(), "Blocked redirect to private address");
            attempt.error("redirect to private address blocked")
        } else {
            attempt.follow()
        }
    })
}

#[derive(Clone)]
pub struct PageFetcher {
    client: ReqwestClient,
}

impl PageFetcher {
    pub fn new(client: ReqwestClient) -> Self {
        Self { client }
    }

    /// Fetch `url` as `identity`. Never fails; problems are folded into the
    /// attempt's outcome.
    pub async fn fetch(&self, url: &Url, identity: &Identity, language: &str) -> FetchAttempt {
        let attempt = |content_type: Option<String>, outcome: FetchOutcome| FetchAttempt {
            identity: identity.name.clone(),
            content_type,
            outcome,
        };

        let response = match self
            .client
            .get(url.clone())
            .header(USER_AGENT, &identity.user_agent)
            .header(ACCEPT, HTML_ACCEPT)
            .header(ACCEPT_LANGUAGE, accept_language(language))
            .header(CONNECTION, "keep-alive")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return attempt(None, FetchOutcome::NetworkError(e.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            return attempt(None, FetchOutcome::NetworkError(format!("HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return attempt(content_type, FetchOutcome::NetworkError(e.to_string())),
        };

        let outcome = if content_type.as_deref().is_some_and(is_html_content_type)
            && looks_like_html(&body)
        {
            FetchOutcome::Html(body)
        } else {
            FetchOutcome::NonHtml
        };
        attempt(content_type, outcome)
    }
}

/// `Accept-Language` value for a caller preference, with English and
/// wildcard fallbacks. Anything that is not a plain language tag is replaced
/// by the default.
pub fn accept_language(language: &str) -> String {
    let language = language.trim();
    let valid = !language.is_empty()
        && language
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    let language = if valid { language } else { DEFAULT_LANGUAGE };
    format!("{language},en;q=0.8,*;q=0.5")
}

pub fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}

/// True when the document opens with a doctype or an `<html` tag.
pub fn looks_like_html(body: &str) -> bool {
    let head: String = body
        .trim_start_matches('\u{feff}')
        .trim_start()
        .chars()
        .take(9)
        .collect::<String>()
        .to_ascii_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}
