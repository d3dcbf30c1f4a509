//! Python sources: REST servers, data models and property simulators.
//!
//! Parsed with tree-sitter's Python grammar; the facts pulled from the tree
//! (classes, async functions, imports, decorators, annotated fields) drive
//! per-kind checks on top of a base credit for parsing cleanly.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use tree_sitter::{Node, Parser, Tree};

use super::common::accepted;
use crate::domain::{ArtifactType, ValidatorResult};

/// Credit for a tree without syntax errors.
const PARSE_BASE: f64 = 0.40;

/// Tool label for the given script kind, e.g. `tree-sitter-python[backend]`.
pub fn tool_label(kind: ArtifactType) -> String {
    format!("tree-sitter-python[{}]", kind.tag())
}

pub fn validate_rest_server(code: &str, accept_at: f64) -> ValidatorResult {
    validate(code, ArtifactType::RestServer, accept_at)
}

pub fn validate_data_model(code: &str, accept_at: f64) -> ValidatorResult {
    validate(code, ArtifactType::DataModel, accept_at)
}

pub fn validate_simulator(code: &str, accept_at: f64) -> ValidatorResult {
    validate(code, ArtifactType::Simulator, accept_at)
}

/// What the checks need to know about a parsed module.
#[derive(Debug, Default)]
pub struct ScriptFacts {
    pub classes: BTreeSet<String>,
    pub functions: BTreeSet<String>,
    pub async_functions: usize,
    pub imports: BTreeSet<String>,
    pub decorators: Vec<String>,
    pub annotated_assignments: usize,
}

pub fn parse(code: &str) -> Result<Tree, String> {
    let mut parser = Parser::new();
    parser
        .set_language(tree_sitter_python::language())
        .map_err(|e| format!("python grammar unavailable: {}", e))?;
    parser
        .parse(code, None)
        .ok_or_else(|| "parser produced no tree".to_string())
}

/// Every node of the tree, pre-order.
fn nodes(root: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut cursor = root.walk();
    loop {
        out.push(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return out;
            }
        }
    }
}

/// First syntax problem as `SyntaxError line N: ...`, if any.
///
/// Besides parse errors this rejects the Python 2 forms the grammar still
/// accepts but a Python 3 interpreter does not.
pub fn syntax_error(tree: &Tree, src: &str) -> Option<String> {
    let root = tree.root_node();
    let (bad, msg) = if root.has_error() {
        let bad = nodes(root)
            .into_iter()
            .find(|n| n.is_error() || n.is_missing())
            .unwrap_or(root);
        let msg = if bad.is_missing() {
            format!("missing '{}'", bad.kind())
        } else {
            "invalid syntax".to_string()
        };
        (bad, msg)
    } else {
        nodes(root)
            .into_iter()
            .find_map(|n| python2_only(n, src).map(|msg| (n, msg)))?
    };
    Some(format!(
        "SyntaxError line {}: {}",
        bad.start_position().row + 1,
        msg
    ))
}

fn legacy_integer() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:0[0-9_]*[1-9][0-9_]*|.*[lL])$").expect("static regex"))
}

/// Message for a node that only Python 2 accepts.
fn python2_only(node: Node<'_>, src: &str) -> Option<String> {
    let has_token = |token: &str| {
        let mut cursor = node.walk();
        let found = node.children(&mut cursor).any(|c| c.kind() == token);
        found
    };
    match node.kind() {
        "print_statement" => {
            Some("Missing parentheses in call to 'print'. Did you mean print(...)?".to_string())
        }
        "exec_statement" => Some("Missing parentheses in call to 'exec'".to_string()),
        "comparison_operator" if has_token("<>") => Some("invalid syntax".to_string()),
        "except_clause" if has_token(",") => {
            Some("multiple exception types must be parenthesized".to_string())
        }
        "integer" => {
            let literal = text(node, src);
            legacy_integer().is_match(literal).then(|| {
                if literal.ends_with(['l', 'L']) {
                    "invalid decimal literal".to_string()
                } else {
                    "leading zeros in decimal integer literals are not permitted".to_string()
                }
            })
        }
        _ => None,
    }
}

fn text<'a>(node: Node<'_>, src: &'a str) -> &'a str {
    node.utf8_text(src.as_bytes()).unwrap_or("")
}

pub fn collect_facts(tree: &Tree, src: &str) -> ScriptFacts {
    let mut facts = ScriptFacts::default();
    for node in nodes(tree.root_node()) {
        match node.kind() {
            "class_definition" => {
                if let Some(name) = node.child_by_field_name("name") {
                    facts.classes.insert(text(name, src).to_string());
                }
            }
            "function_definition" => {
                if let Some(name) = node.child_by_field_name("name") {
                    facts.functions.insert(text(name, src).to_string());
                }
                if node.child(0).is_some_and(|c| c.kind() == "async") {
                    facts.async_functions += 1;
                }
            }
            "import_statement" => {
                let mut cursor = node.walk();
                for name in node.children_by_field_name("name", &mut cursor) {
                    let dotted = match name.kind() {
                        "aliased_import" => name.child_by_field_name("name").unwrap_or(name),
                        _ => name,
                    };
                    facts.imports.insert(text(dotted, src).to_string());
                }
            }
            "import_from_statement" => {
                if let Some(module) = node.child_by_field_name("module_name") {
                    facts.imports.insert(text(module, src).to_string());
                }
            }
            "decorator" => facts.decorators.push(text(node, src).to_string()),
            "assignment" if node.child_by_field_name("type").is_some() => {
                facts.annotated_assignments += 1;
            }
            _ => {}
        }
    }
    facts
}

fn imports_containing(facts: &ScriptFacts, needle: &str) -> bool {
    facts.imports.iter().any(|m| m.to_lowercase().contains(needle))
}

/// Validate `code` as the given script kind.
///
/// Kinds other than the three script types only get the parse check.
pub fn validate(code: &str, kind: ArtifactType, accept_at: f64) -> ValidatorResult {
    let tool = tool_label(kind);
    let tree = match parse(code) {
        Ok(tree) => tree,
        Err(e) => return ValidatorResult::fail(0.0, vec![e], tool),
    };
    if let Some(err) = syntax_error(&tree, code) {
        return ValidatorResult::fail(0.1, vec![err], tool);
    }

    let facts = collect_facts(&tree, code);
    let mut errors = Vec::new();
    let mut score = PARSE_BASE;

    match kind {
        ArtifactType::RestServer => {
            if imports_containing(&facts, "fastapi") {
                score += 0.20;
            } else {
                errors.push("Missing FastAPI import".to_string());
            }
            if facts.async_functions > 0 {
                score += 0.20;
            } else {
                errors.push("No async def endpoints found".to_string());
            }
            let routed = facts
                .decorators
                .iter()
                .any(|d| ["get", "post", "put", "delete"].iter().any(|m| d.contains(m)));
            if routed {
                score += 0.20;
            } else {
                errors.push("No route decorator (@app.get/post) found".to_string());
            }
        }
        ArtifactType::DataModel => {
            if imports_containing(&facts, "pydantic") || code.contains("BaseModel") {
                score += 0.20;
            } else {
                errors.push("Missing Pydantic import".to_string());
            }
            if facts.classes.is_empty() {
                errors.push("No class definitions found".to_string());
            } else {
                score += 0.20;
            }
            if facts.annotated_assignments > 0 {
                score += 0.20;
            } else {
                errors.push("No type-annotated fields found".to_string());
            }
        }
        ArtifactType::Simulator => {
            if !facts.classes.is_empty() {
                score += 0.15;
            }
            if facts.async_functions > 0 || facts.imports.contains("asyncio") {
                score += 0.20;
            } else {
                errors.push("No asyncio usage; a simulator should be async".to_string());
            }
            if ["start", "stop", "run", "generate"]
                .iter()
                .any(|f| facts.functions.contains(*f))
            {
                score += 0.20;
            } else {
                errors.push("Missing start()/stop()/run() method".to_string());
            }
            if code.contains("random") {
                score += 0.05;
            }
        }
        _ => {}
    }

    let ok = accepted(score, accept_at, &errors);
    ValidatorResult::new(ok, score, errors, tool).with_detail(format!(
        "classes={}, async_fns={}",
        facts.classes.len(),
        facts.async_functions
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKEND: &str = r#"
from fastapi import FastAPI
from pydantic import BaseModel

app = FastAPI()

class SpeedReading(BaseModel):
    value: float
    unit: str = "kmh"

@app.get("/speed")
async def read_speed() -> SpeedReading:
    return SpeedReading(value=42.0)

@app.post("/speed")
async def write_speed(reading: SpeedReading):
    return {"ok": True}
"#;

    const SIMULATOR: &str = r#"
import asyncio
import random

class SpeedSimulator:
    def __init__(self):
        self.running = False

    async def run(self):
        self.running = True
        while self.running:
            await asyncio.sleep(1)
            print(random.uniform(0, 120))

    def stop(self):
        self.running = False
"#;

    #[test]
    fn test_backend_full_credit() {
        let r = validate_rest_server(BACKEND, 0.75);
        assert!(r.ok, "{:?}", r.errors);
        assert_eq!(r.score, 1.0);
        assert_eq!(r.tool, "tree-sitter-python[backend]");
        assert_eq!(r.detail.as_deref(), Some("classes=1, async_fns=2"));
    }

    #[test]
    fn test_data_model_full_credit() {
        let r = validate_data_model(BACKEND, 0.75);
        assert!(r.ok, "{:?}", r.errors);
        assert_eq!(r.score, 1.0);
    }

    #[test]
    fn test_simulator() {
        let r = validate_simulator(SIMULATOR, 0.75);
        assert!(r.ok, "{:?}", r.errors);
        assert_eq!(r.score, 1.0);
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let r = validate_rest_server("import fastapi\n\ndef broken(:\n    pass\n", 0.75);
        assert!(!r.ok);
        assert_eq!(r.score, 0.1);
        assert!(r.errors[0].starts_with("SyntaxError line "), "{:?}", r.errors);
    }

    fn first_error(code: &str) -> String {
        let r = validate_rest_server(code, 0.75);
        assert!(!r.ok, "{code:?} should be rejected");
        assert_eq!(r.score, 0.1);
        r.errors[0].clone()
    }

    #[test]
    fn test_print_statement_is_rejected() {
        let code = "from fastapi import FastAPI\napp = FastAPI()\n\n@app.get('/')\nasync def root():\n    print \"hi\"\n    return 1\n";
        assert_eq!(
            first_error(code),
            "SyntaxError line 6: Missing parentheses in call to 'print'. Did you mean print(...)?"
        );
        assert_eq!(
            first_error("import sys\nprint >>sys.stderr, 'x'\n"),
            "SyntaxError line 2: Missing parentheses in call to 'print'. Did you mean print(...)?"
        );
    }

    #[test]
    fn test_exec_statement_is_rejected() {
        assert_eq!(
            first_error("code = 'x = 1'\nexec code\n"),
            "SyntaxError line 2: Missing parentheses in call to 'exec'"
        );
    }

    #[test]
    fn test_legacy_operators_and_clauses_are_rejected() {
        assert_eq!(first_error("a, b = 1, 2\nok = a <> b\n"), "SyntaxError line 2: invalid syntax");
        assert_eq!(
            first_error("try:\n    pass\nexcept ValueError, e:\n    pass\n"),
            "SyntaxError line 3: multiple exception types must be parenthesized"
        );
    }

    #[test]
    fn test_legacy_integer_literals_are_rejected() {
        assert_eq!(
            first_error("mode = 0755\n"),
            "SyntaxError line 1: leading zeros in decimal integer literals are not permitted"
        );
        assert_eq!(first_error("big = 10L\n"), "SyntaxError line 1: invalid decimal literal");
    }

    #[test]
    fn test_legacy_forms_fail_every_script_kind() {
        let code = "import random\nprint random.uniform(0, 120)\n";
        for r in [validate_simulator(code, 0.70), validate_data_model(code, 0.70)] {
            assert!(!r.ok);
            assert_eq!(r.score, 0.1);
            assert!(r.errors[0].starts_with("SyntaxError line 2:"), "{:?}", r.errors);
        }
    }

    #[test]
    fn test_python3_forms_still_parse() {
        let code = "import sys\nprint('x', file=sys.stderr)\nexec('y = 2')\nz = 0\nw = 0x1F\ntry:\n    pass\nexcept (ValueError, KeyError) as e:\n    pass\n";
        let tree = parse(code).unwrap();
        assert_eq!(syntax_error(&tree, code), None);
    }

    #[test]
    fn test_sync_backend_missing_async() {
        let code = "from fastapi import FastAPI\napp = FastAPI()\n\n@app.get('/')\ndef root():\n    return 1\n";
        let r = validate_rest_server(code, 0.75);
        assert!(!r.ok);
        assert_eq!(r.errors, vec!["No async def endpoints found".to_string()]);
        assert_eq!(r.score, 0.8);
    }

    #[test]
    fn test_facts() {
        let tree = parse(BACKEND).unwrap();
        let facts = collect_facts(&tree, BACKEND);
        assert!(facts.imports.contains("fastapi"));
        assert!(facts.imports.contains("pydantic"));
        assert_eq!(facts.annotated_assignments, 2);
        assert_eq!(facts.decorators.len(), 2);
        assert!(facts.functions.contains("read_speed"));
    }
}
