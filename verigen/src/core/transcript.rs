//! In-memory, append-only conversation transcript.

use serde::Serialize;
use tracing::debug;

use crate::core::types::Turn;

/// Line inserted where older turns were left out of a rendered prompt.
pub const TRUNCATION_NOTICE: &str = "[Previous steps truncated]";

/// Ordered turns of one run. Turns can only be appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Start a transcript with the fixed head (preamble, then task + spec).
    pub fn with_head(preamble: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            turns: vec![
                Turn::SystemPreamble(preamble.into()),
                Turn::TaskSpec(task.into()),
            ],
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Most recent model reply, if any.
    pub fn last_reply(&self) -> Option<&str> {
        self.turns.iter().rev().find_map(|turn| match turn {
            Turn::ModelReply(text) => Some(text.as_str()),
            _ => None,
        })
    }

    /// Render the prompt sent to the model.
    ///
    /// Without a budget this is every turn in order. With a budget the head
    /// turns are always kept and the oldest remaining turns are dropped until
    /// the rendered text fits, leaving [`TRUNCATION_NOTICE`] in their place.
    pub fn render(&self, budget_bytes: Option<usize>) -> String {
        let (head, body): (Vec<&Turn>, Vec<&Turn>) =
            self.turns.iter().partition(|turn| turn.is_head());
        let head_blocks: Vec<String> = head.iter().map(|turn| render_turn(turn)).collect();
        let mut body_blocks: Vec<String> = body.iter().map(|turn| render_turn(turn)).collect();

        let Some(budget) = budget_bytes else {
            return join_blocks(&head_blocks, &body_blocks, false);
        };

        let full = join_blocks(&head_blocks, &body_blocks, false);
        if full.len() <= budget {
            return full;
        }

        let mut dropped = 0usize;
        while !body_blocks.is_empty() && join_blocks(&head_blocks, &body_blocks, true).len() > budget
        {
            body_blocks.remove(0);
            dropped += 1;
        }
        debug!(dropped_turns = dropped, budget, "trimmed history for prompt budget");
        join_blocks(&head_blocks, &body_blocks, true)
    }
}

fn render_turn(turn: &Turn) -> String {
    match turn {
        Turn::Observation(text) => format!("Observation: {}", text.trim()),
        other => other.text().trim().to_string(),
    }
}

fn join_blocks(head: &[String], body: &[String], truncated: bool) -> String {
    let mut blocks: Vec<&str> = head.iter().map(String::as_str).collect();
    if truncated {
        blocks.push(TRUNCATION_NOTICE);
    }
    blocks.extend(body.iter().map(String::as_str));
    let mut prompt = blocks.join("\n\n");
    prompt.push('\n');
    prompt
}
