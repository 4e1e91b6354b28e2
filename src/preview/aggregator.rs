//! Identity rotation and result merging.

use url::Url;

use super::document::HtmlDocument;
use super::extract::{extract_description, extract_domain, extract_title};
use super::fetcher::{FetchOutcome, Identity, PageFetcher};
use super::resolver::{image_candidates, resolve_image, ImageCandidate};
use super::validator::ImageValidator;
use super::{parse_target, PreviewError};
use crate::models::PreviewResult;

/// Best result seen so far across identity attempts.
#[derive(Debug, Clone, Default)]
pub struct PreviewAccumulator {
    result: PreviewResult,
    placeholder_hosts: Vec<String>,
}

impl PreviewAccumulator {
    pub fn new(placeholder_hosts: Vec<String>) -> Self {
        Self {
            result: PreviewResult::default(),
            placeholder_hosts,
        }
    }

    /// Fold one attempt's extraction into the running result.
    ///
    /// - title / description: strictly longer text replaces shorter
    /// - domain: first value is kept
    /// - image: first value is kept unless it comes from a placeholder host
    ///   and the new one does not
    pub fn merge(&mut self, found: PreviewResult) {
        merge_longer(&mut self.result.title, found.title);
        merge_longer(&mut self.result.description, found.description);

        if self.result.domain.is_none() {
            self.result.domain = found.domain;
        }

        if let Some(image) = found.image {
            let replace = match self.result.image.as_deref() {
                None => true,
                Some(current) => self.is_placeholder(current) && !self.is_placeholder(&image),
            };
            if replace {
                self.result.image = Some(image);
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.result.has_required_fields()
    }

    pub fn current(&self) -> &PreviewResult {
        &self.result
    }

    pub fn into_result(self) -> PreviewResult {
        self.result
    }

    fn is_placeholder(&self, image: &str) -> bool {
        let Some(host) = Url::parse(image).ok().and_then(|u| u.host_str().map(str::to_string))
        else {
            return false;
        };
        self.placeholder_hosts
            .iter()
            .any(|p| !p.is_empty() && host.contains(p.as_str()))
    }
}

fn merge_longer(current: &mut Option<String>, candidate: Option<String>) {
    let Some(candidate) = candidate else {
        return;
    };
    let longer = current
        .as_deref()
        .map_or(true, |c| candidate.chars().count() > c.chars().count());
    if longer {
        *current = Some(candidate);
    }
}

/// Text fields and image candidates pulled from one page.
struct PageScan {
    title: Option<String>,
    description: Option<String>,
    domain: Option<String>,
    candidates: Vec<ImageCandidate>,
}

/// Parse and extract synchronously; the parsed tree is dropped on return.
fn scan_page(html: &str, url: &Url) -> PageScan {
    let doc = HtmlDocument::parse(html);
    PageScan {
        title: extract_title(&doc),
        description: extract_description(&doc),
        domain: extract_domain(&doc, url),
        candidates: image_candidates(&doc, url),
    }
}

/// Drives fetch, extraction and image validation for one request.
#[derive(Clone)]
pub struct PreviewEngine {
    fetcher: PageFetcher,
    validator: ImageValidator,
    identities: Vec<Identity>,
    placeholder_hosts: Vec<String>,
}

impl PreviewEngine {
    pub fn new(
        fetcher: PageFetcher,
        validator: ImageValidator,
        identities: Vec<Identity>,
        placeholder_hosts: Vec<String>,
    ) -> Self {
        Self {
            fetcher,
            validator,
            identities,
            placeholder_hosts,
        }
    }

    /// Build a preview for `url`.
    ///
    /// Identities are tried in order until title, image and domain are all
    /// known. Fails with [`PreviewError::InvalidUrl`] before any network
    /// activity, or with [`PreviewError::NotHtml`] when no identity got an
    /// HTML page back. Anything else is a (possibly partial) success.
    pub async fn get_preview(
        &self,
        url: &str,
        language: &str,
    ) -> Result<PreviewResult, PreviewError> {
        let target = parse_target(url)?;

        let mut acc = PreviewAccumulator::new(self.placeholder_hosts.clone());
        let mut saw_html = false;

        for identity in &self.identities {
            let attempt = self.fetcher.fetch(&target, identity, language).await;

            let html = match attempt.outcome {
                FetchOutcome::Html(html) => html,
                FetchOutcome::NonHtml => {
                    tracing::debug!(
                        url = %target,
                        identity = %attempt.identity,
                        content_type = ?attempt.content_type,
                        "Response is not HTML, trying next identity"
                    );
                    continue;
                }
                FetchOutcome::NetworkError(reason) => {
                    tracing::debug!(
                        url = %target,
                        identity = %attempt.identity,
                        reason = %reason,
                        "Fetch failed, trying next identity"
                    );
                    continue;
                }
            };
            saw_html = true;

            let scan = scan_page(&html, &target);
            let image = resolve_image(scan.candidates, &self.validator)
                .await
                .map(String::from);

            acc.merge(PreviewResult {
                title: scan.title,
                description: scan.description,
                image,
                domain: scan.domain,
            });

            if acc.is_complete() {
                tracing::debug!(url = %target, identity = %attempt.identity, "All required fields found");
                break;
            }
        }

        if !saw_html {
            tracing::info!(url = %target, "No identity received HTML");
            return Err(PreviewError::NotHtml);
        }

        Ok(acc.into_result())
    }
}
