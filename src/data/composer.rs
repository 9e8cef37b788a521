// ============================================================
// Layer 4 — Issue Text Composer
// ============================================================
// Builds the single string a model sees for one issue:
//
//   "Title: <title>" <sep> "Details: <description>"
//       [<sep> "Comments: <comment 1>" <sep> "<comment 2>" ...]
//
// Training sees only "<title> <description>", the same text the
// word vocabulary is counted over.
//
// <sep> is " [SEP] ", " </s> ", ... for tokenizer families that
// define a separator token, otherwise a single space.

use crate::domain::issue::Issue;

const TITLE_TAG: &str = "Title: ";
const DETAILS_TAG: &str = "Details: ";
const COMMENTS_TAG: &str = "Comments: ";

/// The labelled segments of an issue, in order.
pub fn issue_segments(issue: &Issue) -> Vec<String> {
    let mut segments = vec![
        format!("{TITLE_TAG}{}", issue.title),
        format!("{DETAILS_TAG}{}", issue.description),
    ];

    if let Some(comments) = issue.comment_segments() {
        for (i, comment) in comments.into_iter().enumerate() {
            if i == 0 {
                segments.push(format!("{COMMENTS_TAG}{comment}"));
            } else {
                segments.push(comment.to_string());
            }
        }
    }
    segments
}

/// Join segments with the tokenizer family's separator token.
pub fn join_segments(segments: &[String], separator: Option<&str>) -> String {
    match separator {
        Some(sep) => segments.join(&format!(" {sep} ")),
        None => segments.join(" "),
    }
}

/// Full evaluation string of an issue.
pub fn compose_issue_text(issue: &Issue, separator: Option<&str>) -> String {
    join_segments(&issue_segments(issue), separator)
}

/// Text of an issue as seen during training.
pub fn training_text(issue: &Issue) -> String {
    format!("{} {}", issue.title, issue.description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_and_description_only() {
        let issue = Issue::new(1, "Crash", "segfault in loader", "Error");
        assert_eq!(
            compose_issue_text(&issue, None),
            "Title: Crash Details: segfault in loader"
        );
    }

    #[test]
    fn test_comments_follow_description_in_order() {
        let issue = Issue::new(1, "T", "D", "Error")
            .with_comments("first bit concatcommentsign second bit");
        let segments = issue_segments(&issue);
        assert_eq!(
            segments,
            vec!["Title: T", "Details: D", "Comments: first bit ", " second bit"]
        );

        let text = compose_issue_text(&issue, Some("[SEP]"));
        let title = text.find("Title: T").unwrap();
        let details = text.find("Details: D").unwrap();
        let first = text.find("Comments: first bit").unwrap();
        let second = text.find("second bit").unwrap();
        assert!(title < details && details < first && first < second);
        // the second comment is its own segment
        assert!(text.contains("[SEP]  second bit"));
    }

    #[test]
    fn test_empty_comment_field_still_tags_first_segment() {
        let issue = Issue::new(1, "T", "D", "x").with_comments("");
        assert_eq!(issue_segments(&issue).last().unwrap(), "Comments: ");
    }
}
