use serde::Serialize;

/// Label attached to every record produced from the arXiv feed.
pub const ARXIV_SOURCE: &str = "arXiv";

/// One search hit. `title` is never empty; `link` and `doi` may be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperRecord {
    pub title: String,
    pub source: String,
    pub link: String,
    pub doi: String,
}

impl PaperRecord {
    /// Builds a record from raw feed fields, or `None` when the title is
    /// blank once whitespace runs (including newlines) are collapsed.
    pub fn from_feed_fields(title: &str, link: &str, doi: &str) -> Option<Self> {
        let title = collapse_whitespace(title);
        if title.is_empty() {
            return None;
        }

        Some(Self {
            title,
            source: ARXIV_SOURCE.to_string(),
            link: link.trim().to_string(),
            doi: doi.trim().to_string(),
        })
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
