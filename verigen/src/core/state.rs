//! Loop bookkeeping: step counters and terminal-state decisions.
//!
//! The executor reports one [`StepEvent`] per model reply and gets back a
//! [`Verdict`]. Keeping this pure lets the termination rules be tested
//! without a generator or tools.

use serde::{Deserialize, Serialize};

use crate::core::types::FailureReason;

/// Limits that bound one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopLimits {
    pub max_steps: u32,
    pub max_consecutive_unparseable: u32,
    /// `None` keeps tool errors recoverable for the whole step budget.
    pub max_consecutive_tool_errors: Option<u32>,
}

impl Default for LoopLimits {
    fn default() -> Self {
        Self {
            max_steps: 30,
            max_consecutive_unparseable: 3,
            max_consecutive_tool_errors: None,
        }
    }
}

/// What one iteration of the loop amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
    Final,
    Unparseable,
    UnknownTool,
    ToolSucceeded,
    ToolFailed,
}

/// Decision after recording an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Succeeded,
    Failed(FailureReason),
}

/// Per-run counters. Every event, final replies included, consumes a step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopCounters {
    pub steps: u32,
    pub consecutive_unparseable: u32,
    pub consecutive_tool_errors: u32,
}

impl LoopCounters {
    /// True once no further model call fits in the step budget.
    pub fn exhausted(&self, limits: &LoopLimits) -> bool {
        self.steps >= limits.max_steps
    }

    /// Record `event` and decide whether the run ends here.
    ///
    /// A final answer always succeeds. Otherwise the consecutive caps are
    /// checked before the step budget, so a reply that hits both ends the run
    /// as a parse failure.
    pub fn record(&mut self, event: StepEvent, limits: &LoopLimits) -> Verdict {
        self.steps = self.steps.saturating_add(1);

        match event {
            StepEvent::Final => return Verdict::Succeeded,
            StepEvent::Unparseable => {
                self.consecutive_unparseable += 1;
            }
            StepEvent::UnknownTool => {
                self.consecutive_unparseable = 0;
            }
            StepEvent::ToolFailed => {
                self.consecutive_unparseable = 0;
                self.consecutive_tool_errors += 1;
            }
            StepEvent::ToolSucceeded => {
                self.consecutive_unparseable = 0;
                self.consecutive_tool_errors = 0;
            }
        }

        if self.consecutive_unparseable >= limits.max_consecutive_unparseable {
            return Verdict::Failed(FailureReason::UnparseableReplies);
        }
        if limits
            .max_consecutive_tool_errors
            .is_some_and(|cap| self.consecutive_tool_errors >= cap)
        {
            return Verdict::Failed(FailureReason::ToolErrors);
        }
        if self.exhausted(limits) {
            return Verdict::Failed(FailureReason::MaxStepsExceeded);
        }
        Verdict::Continue
    }
}
