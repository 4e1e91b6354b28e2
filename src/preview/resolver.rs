//! Preview image selection.
//!
//! Discovery is synchronous and works on the parsed document; validation is
//! asynchronous and only sees owned candidates, so the document never has to
//! be held across an await.

use url::Url;

use super::document::{MetaKey, ParsedDocument};
use super::validator::ImageValidator;

/// How many `<img>` elements are looked at after the metadata sources.
pub const IMG_SCAN_BUDGET: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    /// Value as written in the markup.
    pub source: String,
    /// Absolute http(s) form, fragment removed. `None` when unresolvable.
    pub resolved: Option<Url>,
    /// Discovery order, starting at 0.
    pub rank: usize,
}

/// Collect candidates in priority order: `og:image`, `twitter:image`,
/// `<link rel="image_src">`, then the first [`IMG_SCAN_BUDGET`] `<img>` tags.
/// Missing and `data:` sources are dropped here.
pub fn image_candidates<D: ParsedDocument>(doc: &D, base_url: &Url) -> Vec<ImageCandidate> {
    let mut base = base_url.clone();
    base.set_fragment(None);

    let metadata_sources = [
        doc.meta_content(MetaKey::Property("og:image")),
        doc.meta_content(MetaKey::Name("twitter:image")),
        doc.attr_at(r#"link[rel="image_src"]"#, "href", 0),
    ];
    let img_sources = (0..IMG_SCAN_BUDGET).map(|i| doc.attr_at("img", "src", i));

    metadata_sources
        .into_iter()
        .chain(img_sources)
        .flatten()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && !is_data_uri(s))
        .enumerate()
        .map(|(rank, source)| ImageCandidate {
            resolved: resolve(&base, &source),
            source,
            rank,
        })
        .collect()
}

fn is_data_uri(source: &str) -> bool {
    source
        .get(..5)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:"))
}

fn resolve(base: &Url, source: &str) -> Option<Url> {
    let mut url = base.join(source).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Return the first candidate the validator accepts. Candidates are checked
/// one at a time; a URL is only fetched once per pass.
pub async fn resolve_image(
    candidates: Vec<ImageCandidate>,
    validator: &ImageValidator,
) -> Option<Url> {
    let mut tried: Vec<Url> = Vec::new();

    for candidate in candidates {
        let Some(url) = candidate.resolved else {
            tracing::debug!(source = %candidate.source, "Skipping unresolvable image candidate");
            continue;
        };
        if tried.contains(&url) {
            continue;
        }

        if validator.is_acceptable(&url).await {
            tracing::debug!(url = %url, rank = candidate.rank, "Accepted image candidate");
            return Some(url);
        }
        tried.push(url);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::document::HtmlDocument;

    fn candidates(html: &str, base: &str) -> Vec<ImageCandidate> {
        let doc = HtmlDocument::parse(html);
        image_candidates(&doc, &Url::parse(base).unwrap())
    }

    fn resolved(list: &[ImageCandidate]) -> Vec<Option<String>> {
        list.iter()
            .map(|c| c.resolved.as_ref().map(Url::to_string))
            .collect()
    }

    #[test]
    fn metadata_sources_come_first() {
        let list = candidates(
            r#"<html><head>
                <link rel="image_src" href="/link.png"/>
                <meta name="twitter:image" content="/twitter.png"/>
                <meta property="og:image" content="https://cdn.example.com/og.png"/>
            </head><body><img src="body.png"></body></html>"#,
            "https://example.com/articles/post",
        );
        assert_eq!(
            resolved(&list),
            vec![
                Some("https://cdn.example.com/og.png".to_string()),
                Some("https://example.com/twitter.png".to_string()),
                Some("https://example.com/link.png".to_string()),
                Some("https://example.com/articles/body.png".to_string()),
            ]
        );
        let ranks: Vec<_> = list.iter().map(|c| c.rank).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
    }

    #[test]
    fn skips_data_uris_and_empty_sources() {
        let list = candidates(
            r#"<html><body>
                <img src="data:image/png;base64,AAAA">
                <img src="DATA:image/gif;base64,AAAA">
                <img src="">
                <img>
                <img src="real.jpg">
            </body></html>"#,
            "https://example.com/",
        );
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].source, "real.jpg");
    }

    #[test]
    fn img_scan_is_bounded() {
        let imgs: String = (0..15).map(|i| format!(r#"<img src="/{i}.png">"#)).collect();
        let list = candidates(
            &format!("<html><body>{imgs}</body></html>"),
            "https://example.com/",
        );
        assert_eq!(list.len(), IMG_SCAN_BUDGET);
        assert_eq!(list.last().unwrap().source, "/9.png");
    }

    #[test]
    fn strips_fragments() {
        let list = candidates(
            r#"<html><body><img src="pic.png#section"></body></html>"#,
            "https://example.com/dir/page#top",
        );
        assert_eq!(
            resolved(&list),
            vec![Some("https://example.com/dir/pic.png".to_string())]
        );
    }

    #[test]
    fn non_http_sources_are_unresolved() {
        let list = candidates(
            r#"<html><body><img src="javascript:void(0)"><img src="ftp://host/x.png"></body></html>"#,
            "https://example.com/",
        );
        assert_eq!(resolved(&list), vec![None, None]);
    }

    #[test]
    fn protocol_relative_sources_take_base_scheme() {
        let list = candidates(
            r#"<html><head><meta property="og:image" content="//cdn.example.net/a.webp"/></head></html>"#,
            "http://example.com/",
        );
        assert_eq!(
            resolved(&list),
            vec![Some("http://cdn.example.net/a.webp".to_string())]
        );
    }
}
