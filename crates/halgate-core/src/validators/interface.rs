//! AIDL interface definitions.
//!
//! The platform `aidl` compiler cannot run standalone (imports need the full
//! source tree), so this type is always judged by a small grammar checker.

use std::sync::OnceLock;

use regex::Regex;

use super::common::{accepted, count_char, FAILED_GRAMMAR_FACTOR};
use crate::domain::ValidatorResult;

pub const TOOL: &str = "aidl-grammar-parser";

/// Return types accepted without further inspection.
const PRIMITIVE_TYPES: &[&str] = &[
    "void",
    "boolean",
    "byte",
    "char",
    "short",
    "int",
    "long",
    "float",
    "double",
    "String",
    "byte[]",
    "int[]",
    "long[]",
    "IBinder",
    "ParcelableHolder",
    "FileDescriptor",
];

struct Patterns {
    package: Regex,
    lower_dotted: Regex,
    interface: Regex,
    method: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        package: Regex::new(r"(?m)^\s*package\s+([\w.]+)\s*;").expect("static regex"),
        lower_dotted: Regex::new(r"^[a-z][a-z0-9]*(\.[a-z][a-z0-9]*)*$").expect("static regex"),
        interface: Regex::new(r"(?:@\w+\s*)*interface\s+(\w+)\s*\{").expect("static regex"),
        method: Regex::new(r"(?:oneway\s+)?(\w[\w<>\[\], ]*)\s+(\w+)\s*\(([^)]*)\)\s*;")
            .expect("static regex"),
    })
}

fn return_type_allowed(base: &str) -> bool {
    PRIMITIVE_TYPES.contains(&base) || base.chars().next().is_some_and(|c| c.is_uppercase())
}

pub fn validate(code: &str, accept_at: f64) -> ValidatorResult {
    let p = patterns();
    let mut errors = Vec::new();
    let mut score = 0.0;

    match p.package.captures(code) {
        Some(caps) => {
            score += 0.20;
            let pkg = &caps[1];
            if !p.lower_dotted.is_match(pkg) {
                errors.push(format!("Package '{}' should be lowercase.dot.separated", pkg));
            }
        }
        None => errors.push(
            "Missing package declaration, e.g. 'package vendor.vss.adas;'".to_string(),
        ),
    }

    match p.interface.captures(code) {
        Some(caps) => {
            score += 0.25;
            let name = &caps[1];
            if !name.starts_with('I') {
                errors.push(format!(
                    "Interface '{}' should start with 'I' per AIDL convention",
                    name
                ));
            }
        }
        None => errors
            .push("No interface block found; expected: 'interface IName { ... }'".to_string()),
    }

    let (open, close) = (count_char(code, '{'), count_char(code, '}'));
    if open == close {
        score += 0.10;
    } else {
        errors.push(format!("Unbalanced braces: {} open, {} close", open, close));
    }

    let methods: Vec<(String, String)> = p
        .method
        .captures_iter(code)
        .map(|c| (c[1].trim().to_string(), c[2].to_string()))
        .collect();
    if methods.is_empty() {
        errors.push("No method signatures found; expected: 'ReturnType method(args);'".to_string());
    } else {
        score += 0.20;
        let suspicious: Vec<String> = methods
            .iter()
            .filter_map(|(ret, name)| {
                let base = ret.split('<').next().unwrap_or(ret).trim();
                (!return_type_allowed(base)).then(|| format!("'{}' in '{}'", base, name))
            })
            .collect();
        if suspicious.is_empty() {
            score += 0.15;
        } else {
            errors.extend(
                suspicious
                    .iter()
                    .take(3)
                    .map(|t| format!("Suspicious AIDL type {}", t)),
            );
        }
    }

    if code.contains("@VintfStability") {
        score += 0.10;
    }

    let ok = accepted(score, accept_at, &errors);
    let reported = if ok { score } else { score * FAILED_GRAMMAR_FACTOR };
    ValidatorResult::new(ok, reported, errors, TOOL)
        .with_detail(format!("{} methods parsed", methods.len()))
}
