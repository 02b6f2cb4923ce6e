// SPDX-License-Identifier: Apache-2.0

//! Keyword matching for tailed log lines.
//!
//! Matching is a case-sensitive substring containment test. Keywords are
//! checked in configured order and the first hit wins, so a line containing
//! several configured keywords always resolves to the earliest one.

/// A successful keyword match against a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMatch<'a> {
    /// The keyword that matched, borrowed from the configured keyword list.
    pub keyword: &'a str,
    /// The outgoing message: the first `word_limit` whitespace-delimited
    /// tokens of the line, rejoined with single spaces.
    pub message: String,
}

/// Check a line against the configured keywords.
///
/// Returns `None` when no keyword is contained in the line. Tokenization for
/// the message splits on runs of whitespace; original inter-token spacing is
/// not preserved.
pub fn match_line<'a>(
    line: &str,
    keywords: &'a [String],
    word_limit: usize,
) -> Option<LineMatch<'a>> {
    let keyword = keywords.iter().find(|k| line.contains(k.as_str()))?;

    let message = line
        .split_whitespace()
        .take(word_limit)
        .collect::<Vec<_>>()
        .join(" ");

    Some(LineMatch {
        keyword: keyword.as_str(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::match_line;

    fn keywords(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_no_match() {
        let kw = keywords(&["ERROR", "FATAL"]);
        assert!(match_line("all systems nominal", &kw, 5).is_none());
    }

    #[test]
    fn test_substring_match() {
        let kw = keywords(&["ERROR"]);
        let m = match_line("2024-01-01 ERRORS detected", &kw, 10).unwrap();
        assert_eq!(m.keyword, "ERROR");
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let kw = keywords(&["ERROR"]);
        assert!(match_line("error: lowercase only", &kw, 5).is_none());
    }

    #[test]
    fn test_first_configured_keyword_wins() {
        // Both keywords are present; the earlier configured one is reported
        // even though it appears later in the line.
        let kw = keywords(&["FATAL", "ERROR"]);
        let m = match_line("ERROR then FATAL", &kw, 5).unwrap();
        assert_eq!(m.keyword, "FATAL");
    }

    #[test]
    fn test_message_truncated_to_word_limit() {
        let kw = keywords(&["ERROR"]);
        let m = match_line("ERROR disk full on node7 retry scheduled", &kw, 3).unwrap();
        assert_eq!(m.message, "ERROR disk full");
    }

    #[test]
    fn test_short_line_yields_whole_line() {
        let kw = keywords(&["ERROR"]);
        let m = match_line("ERROR disk", &kw, 5).unwrap();
        assert_eq!(m.message, "ERROR disk");
    }

    #[test]
    fn test_whitespace_runs_collapse() {
        let kw = keywords(&["ERROR"]);
        let m = match_line("ERROR\t disk   full", &kw, 3).unwrap();
        assert_eq!(m.message, "ERROR disk full");
    }
}
