//! Post-conversion cleanup for wiki output.
//!
//! Each cleanup pass is a function `&str -> String`. The pipeline runs both
//! passes until the text stops changing, so removing one construct can never
//! leave behind a freshly assembled marker or comment.

use std::sync::LazyLock;

use regex::Regex;

/// Opening raw-HTML passthrough marker emitted by the DokuWiki writer.
pub const HTML_OPEN_MARKER: &str = "<HTML>";

/// Closing raw-HTML passthrough marker.
pub const HTML_CLOSE_MARKER: &str = "</HTML>";

/// Run the full cleanup pipeline on converter output.
pub(crate) fn run_pipeline(text: &str) -> String {
    let mut result = text.to_string();

    loop {
        let next = strip_html_comments(&strip_passthrough_markers(&result));
        if next == result {
            return result;
        }
        result = next;
    }
}

// ---------------------------------------------------------------------------
// Pass 1: Strip passthrough markers
// ---------------------------------------------------------------------------

/// Remove every literal `<HTML>` and `</HTML>`, keeping what sat between them.
fn strip_passthrough_markers(text: &str) -> String {
    text.replace(HTML_OPEN_MARKER, "")
        .replace(HTML_CLOSE_MARKER, "")
}

// ---------------------------------------------------------------------------
// Pass 2: Strip HTML comments
// ---------------------------------------------------------------------------

/// Remove `<!-- ... -->` spans, shortest match, across line breaks.
///
/// An unterminated `<!--` is left alone.
fn strip_html_comments(text: &str) -> String {
    static COMMENT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

    COMMENT_RE.replace_all(text, "").into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
