//! Shared deterministic types for the ReAct loop.
//!
//! These types define stable contracts between the parser, recovery, the
//! executor and the transcript store. They carry no I/O and serialize to a
//! stable JSON shape for `last_response.json`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Argument mapping handed to a tool.
///
/// Ordered so that observations listing the received keys are deterministic.
pub type ToolArguments = BTreeMap<String, String>;

/// Key every tool contract expects to find in its arguments.
pub const CONTENT_KEY: &str = "content";

/// One entry in the conversational context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Turn {
    SystemPreamble(String),
    TaskSpec(String),
    ModelReply(String),
    Observation(String),
}

impl Turn {
    pub fn text(&self) -> &str {
        match self {
            Turn::SystemPreamble(text)
            | Turn::TaskSpec(text)
            | Turn::ModelReply(text)
            | Turn::Observation(text) => text,
        }
    }

    /// Banner label used by the persisted transcript log.
    pub fn label(&self) -> &'static str {
        match self {
            Turn::SystemPreamble(_) => "SYSTEM PREAMBLE",
            Turn::TaskSpec(_) => "TASK",
            Turn::ModelReply(_) => "MODEL REPLY",
            Turn::Observation(_) => "OBSERVATION",
        }
    }

    /// Head turns are resent verbatim on every call and never pruned.
    pub fn is_head(&self) -> bool {
        matches!(self, Turn::SystemPreamble(_) | Turn::TaskSpec(_))
    }
}

/// Structured reading of one model reply.
///
/// Produced fresh per iteration by the parser and completed by argument
/// recovery. After recovery exactly one of these holds: `action` is set,
/// `is_final` is true, or both are absent (parse failure).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Step {
    pub thought: Option<String>,
    pub action: Option<String>,
    pub raw_argument_block: Option<String>,
    pub parsed_arguments: ToolArguments,
    pub is_final: bool,
    pub final_text: Option<String>,
}

impl Step {
    pub fn is_unresolved(&self) -> bool {
        !self.is_final && self.action.is_none()
    }
}

/// Why a run ended without a final answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Too many consecutive replies had no resolvable action.
    UnparseableReplies,
    /// The step budget ran out.
    MaxStepsExceeded,
    /// Too many consecutive tool calls reported errors (opt-in).
    ToolErrors,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureReason::UnparseableReplies => "unparseable replies",
            FailureReason::MaxStepsExceeded => "max steps exceeded",
            FailureReason::ToolErrors => "repeated tool errors",
        };
        f.write_str(label)
    }
}

/// Terminal record of a run, created once at loop exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunResult {
    Success {
        final_text: String,
        steps: u32,
    },
    Failure {
        reason: FailureReason,
        steps: u32,
        last_raw_reply: Option<String>,
    },
}

impl RunResult {
    pub fn steps(&self) -> u32 {
        match self {
            RunResult::Success { steps, .. } | RunResult::Failure { steps, .. } => *steps,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunResult::Success { .. })
    }
}
