//! Permissive, line-oriented parser for ReAct replies.
//!
//! Recognized markers are matched case-insensitively at the start of a line
//! (leading whitespace allowed): `Thought:`, `Action:`, `Action Input:`,
//! `Final Answer:` and `Observation:`. A field's value is the rest of the
//! marker line plus every following line up to the next recognized marker.
//! Only the first occurrence of each marker counts. Markers in the middle of
//! a sentence are plain text.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::Step;

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(thought|action[\s_]+input|action|final[\s_]+answer|observation)\s*:")
        .expect("marker pattern should compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Thought,
    Action,
    ActionInput,
    FinalAnswer,
    Observation,
}

impl Marker {
    fn from_label(label: &str) -> Self {
        let normalized: String = label
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "thought" => Marker::Thought,
            "actioninput" => Marker::ActionInput,
            "action" => Marker::Action,
            "finalanswer" => Marker::FinalAnswer,
            _ => Marker::Observation,
        }
    }
}

/// Raw field values captured from one reply.
#[derive(Debug, Default)]
struct Fields {
    thought: Option<String>,
    action: Option<String>,
    action_input: Option<String>,
    final_answer: Option<String>,
    // Echoed observations are captured only so they terminate the previous field.
    observation: Option<String>,
}

impl Fields {
    fn slot(&mut self, marker: Marker) -> &mut Option<String> {
        match marker {
            Marker::Thought => &mut self.thought,
            Marker::Action => &mut self.action,
            Marker::ActionInput => &mut self.action_input,
            Marker::FinalAnswer => &mut self.final_answer,
            Marker::Observation => &mut self.observation,
        }
    }
}

/// Turns one raw reply into a [`Step`].
#[derive(Debug, Clone)]
pub struct ActionParser {
    known_actions: Vec<String>,
}

impl ActionParser {
    /// Create a parser that canonicalizes action names against `known_actions`.
    pub fn new<I, S>(known_actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known_actions: known_actions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn parse(&self, reply: &str) -> Step {
        let Some(fields) = scan_fields(reply) else {
            return Step {
                raw_argument_block: Some(reply.trim().to_string()),
                ..Step::default()
            };
        };

        let thought = fields.thought.filter(|t| !t.is_empty());

        // A completion signal wins over any narrated action in the same reply.
        if let Some(final_text) = fields.final_answer {
            return Step {
                thought,
                is_final: true,
                final_text: Some(final_text),
                ..Step::default()
            };
        }

        Step {
            thought,
            action: fields.action.and_then(|raw| self.resolve_action(&raw)),
            raw_argument_block: fields.action_input,
            ..Step::default()
        }
    }

    /// Look up a known action name, ignoring ASCII case.
    pub fn canonical(&self, name: &str) -> Option<&str> {
        self.known_actions
            .iter()
            .find(|known| known.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    /// Clean the raw `Action:` value and map it onto a known name when possible.
    ///
    /// Unknown names are returned cleaned rather than dropped so that
    /// recovery can try inference and the executor can report them.
    fn resolve_action(&self, raw: &str) -> Option<String> {
        let first_line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
        let cleaned = clean_name(first_line);
        if cleaned.is_empty() {
            return None;
        }
        if let Some(known) = self.canonical(cleaned) {
            return Some(known.to_string());
        }
        let head = cleaned.split_whitespace().next().map(clean_name);
        if let Some(known) = head.and_then(|h| self.canonical(h)) {
            return Some(known.to_string());
        }
        Some(cleaned.to_string())
    }
}

/// Strip quotes, backticks, brackets and trailing punctuation around a name.
fn clean_name(raw: &str) -> &str {
    raw.trim()
        .trim_matches(|c: char| !(c.is_alphanumeric() || c == '_'))
}

/// Scan marker fields. Returns `None` when no marker appears at all.
fn scan_fields(reply: &str) -> Option<Fields> {
    let mut fields = Fields::default();
    let mut found_any = false;
    let mut current: Option<(Marker, Vec<&str>)> = None;

    for line in reply.lines() {
        if let Some(caps) = MARKER_RE.captures(line) {
            found_any = true;
            flush(&mut fields, current.take());
            let whole = caps.get(0).map_or(0, |m| m.end());
            let marker = Marker::from_label(&caps[1]);
            // Later occurrences of a marker end the previous field but are dropped.
            if fields.slot(marker).is_none() {
                current = Some((marker, vec![&line[whole..]]));
            }
            continue;
        }
        if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
        }
    }
    flush(&mut fields, current.take());

    found_any.then_some(fields)
}

fn flush(fields: &mut Fields, pending: Option<(Marker, Vec<&str>)>) {
    if let Some((marker, lines)) = pending {
        let value = lines.join("\n").trim().to_string();
        *fields.slot(marker) = Some(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ActionParser {
        ActionParser::new(["write_readme", "write_testmatrix", "explain", "debug"])
    }

    #[test]
    fn parses_thought_action_and_input() {
        let step = parser().parse(
            "Thought: ok\nAction: write_testmatrix\nAction Input: {\"content\": \"| A | B |\"}",
        );
        assert_eq!(step.thought.as_deref(), Some("ok"));
        assert_eq!(step.action.as_deref(), Some("write_testmatrix"));
        assert_eq!(
            step.raw_argument_block.as_deref(),
            Some("{\"content\": \"| A | B |\"}")
        );
        assert!(!step.is_final);
    }

    #[test]
    fn final_answer_wins_over_action() {
        let step = parser().parse(
            "Thought: all written\nAction: write_readme\nAction Input: {}\nFinal Answer:  done  ",
        );
        assert!(step.is_final);
        assert_eq!(step.final_text.as_deref(), Some("done"));
        assert_eq!(step.action, None);
    }

    #[test]
    fn final_answer_keeps_multiline_text() {
        let step = parser().parse("Final Answer: Generated README\nand test matrix\n");
        assert_eq!(
            step.final_text.as_deref(),
            Some("Generated README\nand test matrix")
        );
    }

    #[test]
    fn no_markers_carries_full_reply() {
        let reply = "  I think the spec looks fine and I am happy.  ";
        let step = parser().parse(reply);
        assert!(step.is_unresolved());
        assert_eq!(step.raw_argument_block.as_deref(), Some(reply.trim()));
    }

    #[test]
    fn mid_sentence_markers_are_ignored() {
        let step = parser().parse("I will write Action: write_readme later.");
        assert!(step.is_unresolved());
        assert_eq!(
            step.raw_argument_block.as_deref(),
            Some("I will write Action: write_readme later.")
        );
    }

    #[test]
    fn first_action_wins() {
        let step = parser().parse("Action: explain\nAction: debug\n");
        assert_eq!(step.action.as_deref(), Some("explain"));
    }

    #[test]
    fn repeated_marker_ends_previous_field() {
        let step = parser().parse("Action: explain\nAction Input: {}\nAction: debug\ntrailing");
        assert_eq!(step.raw_argument_block.as_deref(), Some("{}"));
    }

    #[test]
    fn echoed_observation_is_tolerated() {
        let step = parser().parse(
            "Thought: go\nAction: debug\nAction Input: {}\nObservation: OK: No obvious issues found",
        );
        assert_eq!(step.action.as_deref(), Some("debug"));
        assert_eq!(step.raw_argument_block.as_deref(), Some("{}"));
    }

    #[test]
    fn markers_are_case_insensitive() {
        let step = parser().parse("THOUGHT: hi\naction: Write_Readme\naction input: body");
        assert_eq!(step.action.as_deref(), Some("write_readme"));
        assert_eq!(step.raw_argument_block.as_deref(), Some("body"));
    }

    #[test]
    fn action_name_quotes_and_punctuation_are_stripped() {
        assert_eq!(
            parser().parse("Action: \"write_readme\".").action.as_deref(),
            Some("write_readme")
        );
        assert_eq!(
            parser().parse("Action: `write_testmatrix`").action.as_deref(),
            Some("write_testmatrix")
        );
        assert_eq!(
            parser()
                .parse("Action: [debug] to check the spec")
                .action
                .as_deref(),
            Some("debug")
        );
    }

    #[test]
    fn unknown_action_is_passed_through() {
        let step = parser().parse("Action: launch_rockets\nAction Input: {}");
        assert_eq!(step.action.as_deref(), Some("launch_rockets"));
    }

    #[test]
    fn empty_action_value_is_none() {
        let step = parser().parse("Thought: hmm\nAction:\n");
        assert!(step.is_unresolved());
        assert_eq!(step.raw_argument_block, None);
    }

    #[test]
    fn action_input_keeps_fences_verbatim() {
        let step = parser()
            .parse("Action: write_readme\nAction Input: ```\nproject: X\nfeatures: a,b\n```");
        assert_eq!(
            step.raw_argument_block.as_deref(),
            Some("```\nproject: X\nfeatures: a,b\n```")
        );
    }
}
