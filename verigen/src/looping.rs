//! The ReAct loop: repeat steps until a final answer or a limit.

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::recovery::InferenceTable;
use crate::core::registry::ToolRegistry;
use crate::core::state::{LoopCounters, LoopLimits, Verdict};
use crate::core::transcript::Transcript;
use crate::core::types::{FailureReason, RunResult};
use crate::io::generator::Generator;
use crate::io::transcript_store::{TranscriptPaths, TranscriptStore};
use crate::step::{StepOutcome, StepRunner};

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub result: RunResult,
    pub transcript: Transcript,
    pub paths: TranscriptPaths,
}

/// Drives a generator through the ReAct protocol against a fixed registry.
///
/// The executor holds no per-run state, so one instance may serve several
/// sequential runs. Each run owns its transcript and store.
#[derive(Debug)]
pub struct ReactExecutor {
    steps: StepRunner,
    limits: LoopLimits,
    history_budget: Option<usize>,
}

impl ReactExecutor {
    pub fn new(registry: ToolRegistry, limits: LoopLimits) -> Self {
        Self {
            steps: StepRunner::new(registry),
            limits,
            history_budget: None,
        }
    }

    pub fn with_history_budget(mut self, budget_bytes: Option<usize>) -> Self {
        self.history_budget = budget_bytes;
        self
    }

    pub fn with_excerpt_chars(mut self, excerpt_chars: usize) -> Self {
        self.steps = self.steps.with_excerpt_chars(excerpt_chars);
        self
    }

    pub fn with_inference(mut self, table: InferenceTable) -> Self {
        self.steps = self.steps.with_inference(table);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.steps.registry()
    }

    pub fn limits(&self) -> &LoopLimits {
        &self.limits
    }

    /// Run until the model gives a final answer or a limit ends the run.
    ///
    /// `transcript` must already hold the head turns. `on_step` sees the
    /// 1-based step number and outcome after each iteration. Failures of the
    /// model or tools end up in the returned [`RunResult`]; `Err` means the
    /// transcript could not be persisted.
    #[instrument(skip_all, fields(max_steps = self.limits.max_steps))]
    pub fn run<G, F>(
        &self,
        generator: &G,
        mut transcript: Transcript,
        mut store: TranscriptStore,
        mut on_step: F,
    ) -> Result<RunReport>
    where
        G: Generator,
        F: FnMut(u32, &StepOutcome),
    {
        store.sync(&transcript)?;
        let mut counters = LoopCounters::default();

        let result = loop {
            if counters.exhausted(&self.limits) {
                break failure(FailureReason::MaxStepsExceeded, &counters, &transcript);
            }
            let outcome = self
                .steps
                .run_step(generator, &mut transcript, self.history_budget);
            let verdict = counters.record(outcome.event(), &self.limits);
            store.sync(&transcript)?;
            on_step(counters.steps, &outcome);

            if let StepOutcome::Final { text } = outcome {
                break RunResult::Success {
                    final_text: text,
                    steps: counters.steps,
                };
            }
            if let Verdict::Failed(reason) = verdict {
                break failure(reason, &counters, &transcript);
            }
        };

        match &result {
            RunResult::Success { steps, .. } => info!(steps, "run succeeded"),
            RunResult::Failure { reason, steps, .. } => {
                warn!(%reason, steps, "run failed");
            }
        }

        let paths = store.finish(&transcript, &result)?;
        Ok(RunReport {
            result,
            transcript,
            paths,
        })
    }
}

fn failure(reason: FailureReason, counters: &LoopCounters, transcript: &Transcript) -> RunResult {
    RunResult::Failure {
        reason,
        steps: counters.steps,
        last_raw_reply: transcript.last_reply().map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingTool, ScriptedGenerator};

    fn executor(limits: LoopLimits) -> ReactExecutor {
        let registry = ToolRegistry::new(vec![
            Box::new(RecordingTool::new("write_readme")),
            Box::new(RecordingTool::failing("write_testmatrix")),
        ])
        .expect("registry");
        ReactExecutor::new(registry, limits)
    }

    #[test]
    fn loop_stops_on_final_answer() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = TranscriptStore::create(temp.path()).expect("store");
        let generator = ScriptedGenerator::new([
            "Action: write_readme\nAction Input: {\"content\": \"# X\"}",
            "Final Answer: done",
        ]);
        let mut seen = Vec::new();

        let report = executor(LoopLimits::default())
            .run(
                &generator,
                Transcript::with_head("p", "t"),
                store,
                |step, outcome| seen.push((step, outcome.to_string())),
            )
            .expect("run");

        assert_eq!(
            report.result,
            RunResult::Success {
                final_text: "done".to_string(),
                steps: 2
            }
        );
        assert_eq!(
            seen,
            vec![
                (1, "write_readme ok".to_string()),
                (2, "final answer".to_string())
            ]
        );
        assert!(report.paths.response_path.is_file());
    }

    #[test]
    fn zero_step_budget_never_calls_generator() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = TranscriptStore::create(temp.path()).expect("store");
        let generator = ScriptedGenerator::new(["Final Answer: done"]);
        let limits = LoopLimits {
            max_steps: 0,
            ..LoopLimits::default()
        };

        let report = executor(limits)
            .run(&generator, Transcript::with_head("p", "t"), store, |_, _| {})
            .expect("run");

        assert_eq!(
            report.result,
            RunResult::Failure {
                reason: FailureReason::MaxStepsExceeded,
                steps: 0,
                last_raw_reply: None,
            }
        );
        assert_eq!(generator.calls(), 0);
        assert!(report.paths.response_path.is_file());
    }

    #[test]
    fn tool_error_cap_ends_run() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = TranscriptStore::create(temp.path()).expect("store");
        let generator =
            ScriptedGenerator::repeating("Action: write_testmatrix\nAction Input: rows", 10);
        let limits = LoopLimits {
            max_consecutive_tool_errors: Some(2),
            ..LoopLimits::default()
        };

        let report = executor(limits)
            .run(&generator, Transcript::with_head("p", "t"), store, |_, _| {})
            .expect("run");

        assert_eq!(
            report.result,
            RunResult::Failure {
                reason: FailureReason::ToolErrors,
                steps: 2,
                last_raw_reply: Some("Action: write_testmatrix\nAction Input: rows".to_string()),
            }
        );
        assert_eq!(generator.calls(), 2);
    }
}
