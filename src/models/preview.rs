use serde::{Deserialize, Serialize};

/// Metadata returned by `GET /preview`.
///
/// Every field is optional: a page may carry none of the sources we look at,
/// and a partial result is still a successful one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewResult {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub domain: Option<String>,
}

impl PreviewResult {
    /// True when title, image and domain are all present. Description is not
    /// part of the condition.
    pub fn has_required_fields(&self) -> bool {
        self.title.is_some() && self.image.is_some() && self.domain.is_some()
    }
}
