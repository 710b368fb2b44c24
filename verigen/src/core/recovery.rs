//! Argument recovery: coerce whatever the model put after `Action Input:`
//! into the mapping every tool expects, and infer a missing action name.
//!
//! Normalization stops at the first layer that succeeds:
//! fence stripping, then a structured (JSON-like) parse, then a literal
//! `content` fallback. Nothing here fails; the worst case is
//! `{content: <raw text>}` or [`Resolution::Unresolved`].

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::core::types::{CONTENT_KEY, Step, ToolArguments};

static OPEN_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(```|~~~)[\w.+-]*\s*$").expect("open fence pattern should compile")
});
static CLOSE_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(```|~~~)\s*$").expect("close fence pattern should compile")
});

/// Remove a single leading/trailing fenced-code delimiter pair.
///
/// The opening line may carry a language tag (```` ```json ````); the closing
/// line must be a bare fence of the same kind. Anything else is returned
/// trimmed but otherwise untouched.
pub fn strip_fence(raw: &str) -> Cow<'_, str> {
    let trimmed = raw.trim();
    let lines: Vec<&str> = trimmed.lines().collect();
    if lines.len() < 2 {
        return Cow::Borrowed(trimmed);
    }
    let (first, last) = (lines[0], lines[lines.len() - 1]);
    let (Some(open), Some(close)) = (OPEN_FENCE_RE.captures(first), CLOSE_FENCE_RE.captures(last))
    else {
        return Cow::Borrowed(trimmed);
    };
    if open[1] != close[1] {
        return Cow::Borrowed(trimmed);
    }
    Cow::Owned(lines[1..lines.len() - 1].join("\n").trim().to_string())
}

/// Normalize a raw argument block into tool arguments.
///
/// A missing block yields `{content: ""}` so tools can report what they got.
pub fn normalize_arguments(raw: Option<&str>) -> ToolArguments {
    let Some(raw) = raw else {
        return literal_content("");
    };
    let text = strip_fence(raw);
    match parse_object(&text) {
        Some(object) => arguments_from_object(object),
        None => literal_content(&text),
    }
}

fn literal_content(text: &str) -> ToolArguments {
    ToolArguments::from([(CONTENT_KEY.to_string(), text.to_string())])
}

/// Flatten a parsed object into string arguments, synthesizing `content`
/// from the whole object when the model used other keys.
fn arguments_from_object(object: Map<String, Value>) -> ToolArguments {
    let synthesized = if object.contains_key(CONTENT_KEY) {
        None
    } else {
        Some(Value::Object(object.clone()).to_string())
    };

    let mut arguments: ToolArguments = object
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, text)
        })
        .collect();

    if let Some(content) = synthesized {
        arguments.insert(CONTENT_KEY.to_string(), content);
    }
    arguments
}

/// Try increasingly lenient readings of `text` as a JSON object.
///
/// Only a block that is itself an object qualifies. An object quoted inside
/// a document body leaves the body to the literal fallback.
fn parse_object(text: &str) -> Option<Map<String, Value>> {
    let text = text.trim();
    if !(text.starts_with('{') && text.ends_with('}')) {
        return None;
    }
    let escaped = escape_raw_control_chars(text);
    let mut candidates: Vec<Cow<'_, str>> = vec![Cow::Borrowed(text)];
    if escaped != text {
        candidates.push(Cow::Owned(escaped));
    }
    if text.contains('\'') {
        candidates.push(Cow::Owned(escape_raw_control_chars(&text.replace('\'', "\""))));
    }

    candidates
        .iter()
        .find_map(|candidate| match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(object)) => Some(object),
            _ => None,
        })
}

/// Escape literal newlines and tabs that appear inside JSON string literals.
///
/// Models routinely emit multi-line document bodies inside a quoted value,
/// which strict JSON rejects.
fn escape_raw_control_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    for c in text.chars() {
        if in_string {
            match c {
                _ if escaped => {
                    escaped = false;
                    out.push(c);
                }
                '\\' => {
                    escaped = true;
                    out.push(c);
                }
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                '\r' => {}
                '\t' => out.push_str("\\t"),
                _ => out.push(c),
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
        }
    }
    out
}

/// Ordered keyword table used to guess a tool from free text.
///
/// Earlier rules win when several match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceTable {
    rules: Vec<(String, Vec<String>)>,
}

impl InferenceTable {
    pub fn new(rules: Vec<(String, Vec<String>)>) -> Self {
        let rules = rules
            .into_iter()
            .map(|(tool, keywords)| {
                let keywords = keywords.into_iter().map(|k| k.to_lowercase()).collect();
                (tool, keywords)
            })
            .collect();
        Self { rules }
    }

    /// First tool whose keywords appear in `text` (case-insensitive).
    pub fn infer(&self, text: &str) -> Option<&str> {
        let haystack = text.to_lowercase();
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| haystack.contains(k.as_str())))
            .map(|(tool, _)| tool.as_str())
    }
}

impl Default for InferenceTable {
    fn default() -> Self {
        Self::new(vec![
            ("write_readme".to_string(), vec!["readme".to_string()]),
            (
                "write_testmatrix".to_string(),
                vec![
                    "test matrix".to_string(),
                    "testmatrix".to_string(),
                    "test_matrix".to_string(),
                    "scenario id".to_string(),
                ],
            ),
        ])
    }
}

/// Outcome of recovery for one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Dispatch `action` with `arguments`. `inferred` is set when the name
    /// came from the keyword table rather than the reply's `Action:` line.
    Call {
        action: String,
        arguments: ToolArguments,
        inferred: bool,
    },
    /// No action could be determined.
    Unresolved,
}

/// Completes a parsed [`Step`] into something the executor can dispatch.
#[derive(Debug, Clone, Default)]
pub struct ArgumentRecovery {
    table: InferenceTable,
}

impl ArgumentRecovery {
    pub fn new(table: InferenceTable) -> Self {
        Self { table }
    }

    /// Fill `step.parsed_arguments` and, when possible, `step.action`.
    ///
    /// `is_known` reports whether a name exists in the tool registry.
    /// Unrecognized names are only re-inferred from the name itself; a
    /// missing name is inferred from the thought plus the whole reply.
    pub fn resolve<F>(&self, step: &mut Step, reply: &str, is_known: F) -> Resolution
    where
        F: Fn(&str) -> bool,
    {
        step.parsed_arguments = normalize_arguments(step.raw_argument_block.as_deref());
        if step.is_final {
            return Resolution::Unresolved;
        }

        let (action, inferred) = match step.action.take() {
            Some(name) if is_known(&name) => (Some(name), false),
            Some(name) => match self.table.infer(&name) {
                Some(tool) => (Some(tool.to_string()), true),
                None => (Some(name), false),
            },
            None => {
                let combined = match &step.thought {
                    Some(thought) => format!("{thought}\n{reply}"),
                    None => reply.to_string(),
                };
                (self.table.infer(&combined).map(str::to_string), true)
            }
        };

        step.action = action;
        match &step.action {
            Some(action) => Resolution::Call {
                action: action.clone(),
                arguments: step.parsed_arguments.clone(),
                inferred,
            },
            None => Resolution::Unresolved,
        }
    }
}
