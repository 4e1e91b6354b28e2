//! Field extractors.
//!
//! Each field is an ordered list of probes. The first probe yielding
//! non-empty normalised text wins; later probes are never evaluated.

use url::Url;

use super::document::{normalize_text, MetaKey, ParsedDocument};

type TextProbe<D> = fn(&D) -> Option<String>;
type UrlProbe<D> = fn(&D, &Url) -> Option<Url>;

fn first_match<D: ParsedDocument>(doc: &D, probes: &[TextProbe<D>]) -> Option<String> {
    probes
        .iter()
        .find_map(|probe| probe(doc).as_deref().and_then(normalize_text))
}

// ── Title ──────────────────────────────────────────────────────────────────

pub fn extract_title<D: ParsedDocument>(doc: &D) -> Option<String> {
    first_match(
        doc,
        &[
            |d: &D| d.meta_content(MetaKey::Property("og:title")),
            |d: &D| d.meta_content(MetaKey::Name("twitter:title")),
            |d: &D| d.meta_content(MetaKey::Name("title")),
            |d: &D| d.first_text("title"),
            |d: &D| d.first_text("h1"),
            |d: &D| d.first_text("h2"),
            |d: &D| d.first_text("h1, h2, h3, h4, h5, h6"),
            |d: &D| d.body_text(),
        ],
    )
}

// ── Description ────────────────────────────────────────────────────────────

pub fn extract_description<D: ParsedDocument>(doc: &D) -> Option<String> {
    first_match(
        doc,
        &[
            |d: &D| d.meta_content(MetaKey::Property("og:description")),
            |d: &D| d.meta_content(MetaKey::Name("twitter:description")),
            |d: &D| d.meta_content(MetaKey::Name("description")),
            |d: &D| d.first_text("body p"),
        ],
    )
}

// ── Domain ─────────────────────────────────────────────────────────────────

pub fn extract_domain<D: ParsedDocument>(doc: &D, request_url: &Url) -> Option<String> {
    let probes: [UrlProbe<D>; 3] = [
        |d, base| join_href(base, &d.attr_at(r#"link[rel="canonical"]"#, "href", 0)?),
        |d, base| join_href(base, &d.meta_content(MetaKey::Property("og:url"))?),
        |_, base| Some(base.clone()),
    ];

    probes
        .iter()
        .filter_map(|probe| probe(doc, request_url))
        .find_map(|url| url.host_str().map(strip_www))
}

fn join_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok()
}

/// Drop a single leading `www.` label.
pub fn strip_www(host: &str) -> String {
    host.strip_prefix("www.").unwrap_or(host).to_string()
}
