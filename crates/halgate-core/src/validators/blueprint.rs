//! Soong blueprint (`Android.bp`) build descriptors.
//!
//! Soong itself only runs inside a full platform checkout, so descriptors are
//! checked structurally: balanced delimiters, a known module block, the
//! mandatory fields and no dangling string literals.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use super::common::{accepted, count_char, FAILED_GRAMMAR_FACTOR};
use crate::domain::ValidatorResult;

pub const TOOL: &str = "blueprint-structure-parser";

/// Module types a VHAL build descriptor is expected to declare.
pub const MODULE_TYPES: [&str; 4] = [
    "aidl_interface",
    "cc_binary",
    "cc_library",
    "cc_library_shared",
];

struct Patterns {
    block: Regex,
    vendor: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        block: Regex::new(r"(?m)^\s*(\w+)\s*\{").expect("static regex"),
        vendor: Regex::new(r"vendor:\s*true").expect("static regex"),
    })
}

/// Whether `line` ends inside a string literal.
///
/// `//` starts a comment only outside a string; `\"` inside a string does
/// not close it.
fn ends_inside_string(line: &str) -> bool {
    let mut in_string = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if in_string => {
                chars.next();
            }
            '"' => in_string = !in_string,
            '/' if !in_string && chars.peek() == Some(&'/') => break,
            _ => {}
        }
    }
    in_string
}

/// First line (1-based) that leaves a string literal open.
pub fn unclosed_string_line(bp: &str) -> Option<usize> {
    bp.lines().position(ends_inside_string).map(|idx| idx + 1)
}

/// Module block names found at line starts.
pub fn module_blocks(bp: &str) -> BTreeSet<String> {
    patterns()
        .block
        .captures_iter(bp)
        .map(|c| c[1].to_string())
        .collect()
}

pub fn validate(bp: &str, accept_at: f64) -> ValidatorResult {
    let p = patterns();
    let mut errors = Vec::new();
    let mut score = 0.0;

    let (open, close) = (count_char(bp, '{'), count_char(bp, '}'));
    if open == close {
        score += 0.20;
    } else {
        errors.push(format!("Unbalanced braces: {} open, {} close", open, close));
    }
    if count_char(bp, '[') == count_char(bp, ']') {
        score += 0.05;
    } else {
        errors.push("Unbalanced square brackets in lists".to_string());
    }

    let found: Vec<String> = module_blocks(bp)
        .into_iter()
        .filter(|b| MODULE_TYPES.contains(&b.as_str()))
        .collect();
    if found.is_empty() {
        errors.push(format!(
            "No required block type found. Expected one of: {}",
            MODULE_TYPES.join(", ")
        ));
    } else {
        score += 0.25;
    }

    if bp.contains("name:") {
        score += 0.15;
    } else {
        errors.push("Missing 'name:' field".to_string());
    }
    if bp.contains("srcs:") {
        score += 0.10;
    } else {
        errors.push("Missing 'srcs:' field".to_string());
    }
    if p.vendor.is_match(bp) {
        score += 0.15;
    } else {
        errors.push(
            "Missing 'vendor: true'; HAL modules must be on the vendor partition".to_string(),
        );
    }
    match unclosed_string_line(bp) {
        Some(line) => errors.push(format!("Unclosed string literal detected (line {})", line)),
        None => score += 0.10,
    }

    let ok = accepted(score, accept_at, &errors);
    let reported = if ok { score } else { score * FAILED_GRAMMAR_FACTOR };
    let blocks = if found.is_empty() {
        "none".to_string()
    } else {
        found.join(", ")
    };
    ValidatorResult::new(ok, reported, errors, TOOL).with_detail(format!("blocks={}", blocks))
}
