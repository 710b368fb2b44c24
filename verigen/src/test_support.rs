//! Test-only doubles for the generator and tools.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::core::registry::{Tool, ToolOutcome};
use crate::core::types::ToolArguments;
use crate::io::generator::Generator;
use crate::io::spec_file::{VerificationSpec, spec_from_value};

/// Reply returned once the script runs out.
pub const EXHAUSTED_REPLY: &str = "[scripted generator exhausted]";

/// Generator that replays canned replies in order and records every prompt.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    replies: RefCell<VecDeque<String>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: RefCell::new(replies.into_iter().map(Into::into).collect()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    /// Generator that gives the same reply forever.
    pub fn repeating(reply: &str, times: usize) -> Self {
        Self::new(std::iter::repeat_n(reply, times))
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.borrow().len()
    }
}

impl Generator for ScriptedGenerator {
    fn generate(&self, prompt: &str) -> String {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| EXHAUSTED_REPLY.to_string())
    }
}

/// Tool that records the arguments it receives.
#[derive(Debug, Clone)]
pub struct RecordingTool {
    name: String,
    fail: bool,
    calls: Arc<Mutex<Vec<ToolArguments>>>,
}

impl RecordingTool {
    /// Succeeds with `recorded <name>`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fails with `[error: <name> failed]`.
    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(name)
        }
    }

    /// Shared handle to the recorded calls; stays valid after the tool moves
    /// into a registry.
    pub fn calls(&self) -> Arc<Mutex<Vec<ToolArguments>>> {
        Arc::clone(&self.calls)
    }
}

impl Tool for RecordingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "records its arguments"
    }

    fn execute(&self, arguments: &ToolArguments) -> ToolOutcome {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(arguments.clone());
        }
        if self.fail {
            ToolOutcome::Error(format!("[error: {} failed]", self.name))
        } else {
            ToolOutcome::Ok(format!("recorded {}", self.name))
        }
    }
}

/// The AHB-Lite spec used throughout the tests.
pub fn sample_spec() -> VerificationSpec {
    spec_from_value(json!({
        "project_name": "AHB-Lite Verification",
        "short_description": "Verify a simple AHB-Lite-like interface with bursts and IDLE behavior.",
        "dut": "u_core.core_i.if_stage_i",
        "methodology": "UVM",
        "simulator": "VCS",
        "stimulus": "constrained-random",
        "features": ["handshake", "burst transfers", "idle insertion", "error response"],
        "coverage": ["fsm_states", "burst_lengths", "addr_alignments"]
    }))
    .expect("sample spec should satisfy the schema")
}
