//! Scoring helpers shared by the individual validators.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::round_to;

/// Partial credit for a native tool run that reported `n_errors` errors.
pub fn partial(n_errors: usize) -> f64 {
    round_to((0.85 - n_errors as f64 * 0.12).max(0.15), 3)
}

/// Credit kept by grammar-checked types that miss their threshold.
pub const FAILED_GRAMMAR_FACTOR: f64 = 0.65;

/// Maximum error lines copied from native tool output.
pub const MAX_REPORTED_ERRORS: usize = 5;

/// Equal numbers of `{` and `}`.
pub fn braces_balanced(text: &str) -> bool {
    count_char(text, '{') == count_char(text, '}')
}

/// Equal numbers of `{}`, `[]` and `()`.
pub fn all_brackets_balanced(text: &str) -> bool {
    braces_balanced(text)
        && count_char(text, '[') == count_char(text, ']')
        && count_char(text, '(') == count_char(text, ')')
}

pub fn count_char(text: &str, c: char) -> usize {
    text.chars().filter(|&x| x == c).count()
}

/// True if `text` contains any of `needles`.
pub fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

/// The usual accept rule: enough credit and no reported errors.
pub fn accepted(score: f64, accept_at: f64, errors: &[String]) -> bool {
    score >= accept_at && errors.is_empty()
}

fn line_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r":(\d+):").expect("static regex"))
}

/// First `:<number>:` in a diagnostic line, i.e. the line number.
pub fn diagnostic_line(line: &str) -> Option<usize> {
    line_prefix()
        .captures(line)
        .and_then(|caps| caps[1].parse().ok())
}
