// ============================================================
// Layer 3 — Issue Domain Type
// ============================================================
// One labelled GitHub issue exactly as it appears in the input
// JSON array. Immutable once deserialised.
//
// Input shape:
//   {
//     "number": 1234,
//     "html_url": "https://github.com/owner/repo/issues/1234",
//     "title": "...",
//     "description": "...",
//     "labels": "bug",
//     "commment_concat_str": "first concatcommentsign second"   (optional)
//   }

use serde::{Deserialize, Serialize};

/// Literal token the crawler used to join an issue's comments.
pub const COMMENT_DELIMITER: &str = "concatcommentsign";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Issue number within its repository
    pub number: u64,

    pub html_url: String,

    pub title: String,

    /// Free-text body; `null` in the source reads as empty
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,

    /// The single category this issue belongs to
    #[serde(rename = "labels")]
    pub label: String,

    /// Comments joined by [`COMMENT_DELIMITER`]. The field name keeps
    /// the triple-m spelling used by the dataset files.
    #[serde(
        default,
        rename = "commment_concat_str",
        skip_serializing_if = "Option::is_none"
    )]
    pub comments: Option<String>,
}

impl Issue {
    pub fn new(
        number: u64,
        title: impl Into<String>,
        description: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            number,
            html_url: format!("https://github.com/issues/{number}"),
            title: title.into(),
            description: description.into(),
            label: label.into(),
            comments: None,
        }
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    /// Comment segments in their original order, or `None` when the
    /// issue carries no comment field at all.
    pub fn comment_segments(&self) -> Option<Vec<&str>> {
        self.comments
            .as_deref()
            .map(|c| c.split(COMMENT_DELIMITER).collect())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
