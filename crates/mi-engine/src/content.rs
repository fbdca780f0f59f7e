//! Pure, side-effect-free text post-processing for raw agent output
//! (spec.md §4.2, §6, §8 invariant 9).
//!
//! Two sentinels partition a stage's accumulated text into a thinking
//! prefix and a report body: everything before `THINKING_ENDS` is
//! thinking, everything after `REPORT_STARTS` is the report. If neither
//! sentinel is present, the whole text is thinking (nothing has been
//! "published" as report yet). Inline tool-call markers are stripped from
//! both halves before they are surfaced to a caller.

use std::sync::OnceLock;

use regex::Regex;

pub const THINKING_ENDS: &str = "<<<<THINKING_ENDS>>>>";
pub const REPORT_STARTS: &str = "<<<<REPORT_STARTS>>>>";
const REVISED_TRUE: &str = "<<<REVISED:true>>>";
const REVISED_FALSE: &str = "<<<REVISED:false>>>";

fn function_call_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<\|FunctionCallBegin\|>.*?<\|FunctionCallEnd\|>").expect("valid regex")
    })
}

/// Split raw accumulated agent text into `(thinking, report)` using the
/// `THINKING_ENDS` / `REPORT_STARTS` sentinels, stripping inline
/// function-call markers from both halves.
pub fn split_thinking_report(raw: &str) -> (String, String) {
    let (thinking, report) = match (raw.find(THINKING_ENDS), raw.find(REPORT_STARTS)) {
        (Some(end_idx), Some(start_idx)) => {
            let thinking = &raw[..end_idx];
            let report = &raw[start_idx + REPORT_STARTS.len()..];
            (thinking, report)
        }
        (Some(end_idx), None) => {
            let thinking = &raw[..end_idx];
            let report = &raw[end_idx + THINKING_ENDS.len()..];
            (thinking, report)
        }
        (None, Some(start_idx)) => ("", &raw[start_idx + REPORT_STARTS.len()..]),
        (None, None) => (raw, ""),
    };

    (strip_function_call_markers(thinking), strip_function_call_markers(report))
}

/// Remove `<|FunctionCallBegin|>...<|FunctionCallEnd|>` spans (non-greedy,
/// so adjacent calls don't get merged into one match).
pub fn strip_function_call_markers(text: &str) -> String {
    function_call_marker_re().replace_all(text, "").trim().to_string()
}

/// Parse a trailing `<<<REVISED:true|false>>>` footer off a responder's
/// reply, per the resolved Open Question (structured footer over content
/// diffing). Returns the reply with the footer stripped, and `Some(bool)`
/// if a footer was found.
pub fn extract_revised_footer(reply: &str) -> (String, Option<bool>) {
    let trimmed = reply.trim_end();
    if let Some(stripped) = trimmed.strip_suffix(REVISED_TRUE) {
        (stripped.trim_end().to_string(), Some(true))
    } else if let Some(stripped) = trimmed.strip_suffix(REVISED_FALSE) {
        (stripped.trim_end().to_string(), Some(false))
    } else {
        (reply.to_string(), None)
    }
}

/// Fallback revision decision when the structured footer is absent: a
/// crude content-difference ratio against the prior content, compared to
/// `orchestrator.revision_threshold_pct` (spec.md §9, Open Question 3).
pub fn content_differs_beyond_threshold(prior: &str, revised: &str, threshold_pct: f64) -> bool {
    if prior.is_empty() {
        return !revised.is_empty();
    }
    let prior_words: Vec<&str> = prior.split_whitespace().collect();
    let revised_words: Vec<&str> = revised.split_whitespace().collect();
    let shared = prior_words.iter().filter(|w| revised_words.contains(w)).count();
    let max_len = prior_words.len().max(revised_words.len()).max(1);
    let difference_pct = 100.0 * (1.0 - (shared as f64 / max_len as f64));
    difference_pct >= threshold_pct
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_both_sentinels() {
        let raw = format!("pondering{THINKING_ENDS}ignored-between{REPORT_STARTS}final report");
        let (thinking, report) = split_thinking_report(&raw);
        assert_eq!(thinking, "pondering");
        assert_eq!(report, "final report");
    }

    #[test]
    fn only_thinking_ends_present_rest_is_report() {
        let raw = format!("pondering{THINKING_ENDS}final report");
        let (thinking, report) = split_thinking_report(&raw);
        assert_eq!(thinking, "pondering");
        assert_eq!(report, "final report");
    }

    #[test]
    fn only_report_starts_present_thinking_is_empty() {
        let raw = format!("preamble{REPORT_STARTS}final report");
        let (thinking, report) = split_thinking_report(&raw);
        assert_eq!(thinking, "");
        assert_eq!(report, "final report");
    }

    #[test]
    fn neither_sentinel_present_everything_is_thinking() {
        let raw = "still working it out";
        let (thinking, report) = split_thinking_report(raw);
        assert_eq!(thinking, "still working it out");
        assert_eq!(report, "");
    }

    #[test]
    fn strips_function_call_markers_non_greedy() {
        let text = "before <|FunctionCallBegin|>call_one<|FunctionCallEnd|> middle \
                     <|FunctionCallBegin|>call_two<|FunctionCallEnd|> after";
        assert_eq!(strip_function_call_markers(text), "before  middle  after");
    }

    #[test]
    fn extract_revised_footer_true() {
        let (body, revised) = extract_revised_footer("updated analysis\n<<<REVISED:true>>>");
        assert_eq!(body, "updated analysis");
        assert_eq!(revised, Some(true));
    }

    #[test]
    fn extract_revised_footer_false() {
        let (body, revised) = extract_revised_footer("unchanged\n<<<REVISED:false>>>");
        assert_eq!(body, "unchanged");
        assert_eq!(revised, Some(false));
    }

    #[test]
    fn extract_revised_footer_missing_returns_none() {
        let (body, revised) = extract_revised_footer("no footer here");
        assert_eq!(body, "no footer here");
        assert_eq!(revised, None);
    }

    #[test]
    fn content_diff_below_threshold_is_not_revision() {
        assert!(!content_differs_beyond_threshold(
            "the market is growing steadily",
            "the market is growing steadily today",
            15.0
        ));
    }

    #[test]
    fn content_diff_above_threshold_is_revision() {
        assert!(content_differs_beyond_threshold(
            "the market is growing steadily",
            "competitive pressure from new entrants is intensifying rapidly",
            15.0
        ));
    }
}
