use scraper::{ElementRef, Html, Node, Selector};

/// Which attribute a `<meta>` tag is keyed by.
///
/// Open Graph tags use `property`, Twitter Card and plain HTML tags use `name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaKey<'a> {
    Property(&'a str),
    Name(&'a str),
}

/// The handful of queries the extractors need from a parsed page.
///
/// Every method returns raw (un-normalised) text; callers run it through
/// [`normalize_text`] before deciding whether it counts as present.
pub trait ParsedDocument {
    /// `content` of the first `<meta>` tag matching `key`.
    fn meta_content(&self, key: MetaKey<'_>) -> Option<String>;

    /// `attr` of the `index`-th element matching the CSS selector `tag`.
    fn attr_at(&self, tag: &str, attr: &str, index: usize) -> Option<String>;

    /// Text content of the first element matching the CSS selector.
    fn first_text(&self, selector: &str) -> Option<String>;

    /// Text sitting directly inside `<body>` once its child elements are dropped.
    fn body_text(&self) -> Option<String>;
}

/// [`ParsedDocument`] backed by `scraper`'s html5ever tree.
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
        }
    }

    fn select_first(&self, selector: &str) -> Option<ElementRef<'_>> {
        let selector = Selector::parse(selector).ok()?;
        self.html.select(&selector).next()
    }
}

impl ParsedDocument for HtmlDocument {
    fn meta_content(&self, key: MetaKey<'_>) -> Option<String> {
        let selector = match key {
            MetaKey::Property(p) => format!(r#"meta[property="{p}"]"#),
            MetaKey::Name(n) => format!(r#"meta[name="{n}"]"#),
        };
        self.select_first(&selector)
            .and_then(|el| el.value().attr("content"))
            .map(str::to_string)
    }

    fn attr_at(&self, tag: &str, attr: &str, index: usize) -> Option<String> {
        let selector = Selector::parse(tag).ok()?;
        self.html
            .select(&selector)
            .nth(index)
            .and_then(|el| el.value().attr(attr))
            .map(str::to_string)
    }

    fn first_text(&self, selector: &str) -> Option<String> {
        self.select_first(selector)
            .map(|el| el.text().collect::<String>())
    }

    fn body_text(&self) -> Option<String> {
        let body = self.select_first("body")?;
        let text: String = body
            .children()
            .filter_map(|child| match child.value() {
                Node::Text(text) => Some(&**text),
                _ => None,
            })
            .collect();
        Some(text)
    }
}

/// Trim and collapse internal whitespace runs to one space.
/// Returns `None` when nothing is left.
pub fn normalize_text(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}
