//! One iteration of the ReAct loop: prompt, reply, parse, dispatch, observe.

use std::fmt;

use tracing::{debug, info, instrument, warn};

use crate::core::parser::ActionParser;
use crate::core::recovery::{ArgumentRecovery, InferenceTable, Resolution};
use crate::core::registry::ToolRegistry;
use crate::core::state::StepEvent;
use crate::core::transcript::Transcript;
use crate::core::types::Turn;
use crate::io::generator::Generator;

/// What happened in one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The reply carried `Final Answer:`.
    Final { text: String },
    /// No action could be resolved, even after inference.
    Unparseable { excerpt: String },
    /// The resolved action names no registered tool.
    UnknownTool { name: String },
    ToolSucceeded { tool: String, inferred: bool },
    /// The tool ran and reported an error observation.
    ToolFailed { tool: String, inferred: bool },
}

impl StepOutcome {
    pub fn event(&self) -> StepEvent {
        match self {
            StepOutcome::Final { .. } => StepEvent::Final,
            StepOutcome::Unparseable { .. } => StepEvent::Unparseable,
            StepOutcome::UnknownTool { .. } => StepEvent::UnknownTool,
            StepOutcome::ToolSucceeded { .. } => StepEvent::ToolSucceeded,
            StepOutcome::ToolFailed { .. } => StepEvent::ToolFailed,
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Final { .. } => write!(f, "final answer"),
            StepOutcome::Unparseable { .. } => write!(f, "unparseable reply"),
            StepOutcome::UnknownTool { name } => write!(f, "unknown tool '{name}'"),
            StepOutcome::ToolSucceeded { tool, inferred } => {
                write!(f, "{tool} ok{}", if *inferred { " (inferred)" } else { "" })
            }
            StepOutcome::ToolFailed { tool, inferred } => {
                write!(f, "{tool} error{}", if *inferred { " (inferred)" } else { "" })
            }
        }
    }
}

/// Parses replies and dispatches tools for one run.
#[derive(Debug)]
pub struct StepRunner {
    registry: ToolRegistry,
    parser: ActionParser,
    recovery: ArgumentRecovery,
    excerpt_chars: usize,
}

impl StepRunner {
    pub fn new(registry: ToolRegistry) -> Self {
        let parser = ActionParser::new(registry.names());
        Self {
            registry,
            parser,
            recovery: ArgumentRecovery::default(),
            excerpt_chars: 200,
        }
    }

    pub fn with_inference(mut self, table: InferenceTable) -> Self {
        self.recovery = ArgumentRecovery::new(table);
        self
    }

    pub fn with_excerpt_chars(mut self, excerpt_chars: usize) -> Self {
        self.excerpt_chars = excerpt_chars;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one iteration against `transcript`.
    ///
    /// Appends the model reply and, unless the reply is final, the
    /// observation the model will see next. Never fails: every problem
    /// becomes an observation.
    #[instrument(skip_all, fields(turns = transcript.len()))]
    pub fn run_step<G: Generator>(
        &self,
        generator: &G,
        transcript: &mut Transcript,
        history_budget: Option<usize>,
    ) -> StepOutcome {
        let prompt = transcript.render(history_budget);
        let reply = generator.generate(&prompt);
        transcript.push(Turn::ModelReply(reply.clone()));

        let mut step = self.parser.parse(&reply);
        if step.is_final {
            let text = step.final_text.unwrap_or_default();
            info!(final_bytes = text.len(), "final answer");
            return StepOutcome::Final { text };
        }

        let resolution = self
            .recovery
            .resolve(&mut step, &reply, |name| self.registry.contains(name));
        let (action, arguments, inferred) = match resolution {
            Resolution::Call {
                action,
                arguments,
                inferred,
            } => (action, arguments, inferred),
            Resolution::Unresolved => {
                let excerpt = excerpt(&reply, self.excerpt_chars);
                warn!(excerpt = %excerpt, "unparseable reply");
                transcript.push(Turn::Observation(unparseable_observation(&excerpt)));
                return StepOutcome::Unparseable { excerpt };
            }
        };

        let Some(tool) = self.registry.get(&action) else {
            warn!(action = %action, "unknown tool");
            transcript.push(Turn::Observation(format!(
                "Unknown tool '{action}'. Available tools: {}.",
                self.registry.names().join(", ")
            )));
            return StepOutcome::UnknownTool { name: action };
        };

        let tool_name = tool.name().to_string();
        debug!(tool = %tool_name, inferred, keys = arguments.len(), "dispatching tool");
        let outcome = tool.execute(&arguments);
        transcript.push(Turn::Observation(outcome.observation().to_string()));
        if outcome.is_error() {
            warn!(tool = %tool_name, observation = outcome.observation(), "tool reported error");
            StepOutcome::ToolFailed {
                tool: tool_name,
                inferred,
            }
        } else {
            info!(tool = %tool_name, inferred, "tool succeeded");
            StepOutcome::ToolSucceeded {
                tool: tool_name,
                inferred,
            }
        }
    }
}

fn unparseable_observation(excerpt: &str) -> String {
    format!(
        "Your reply could not be parsed. Respond with 'Thought:', 'Action:' and \
         'Action Input:' lines, or 'Final Answer:' when all files are written. \
         Reply excerpt: \"{excerpt}\""
    )
}

/// First `max_chars` characters of `reply`, trimmed, with an ellipsis when cut.
fn excerpt(reply: &str, max_chars: usize) -> String {
    let trimmed = reply.trim();
    let mut chars = trimmed.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head.trim_end())
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingTool, ScriptedGenerator};

    fn runner(tools: Vec<RecordingTool>) -> StepRunner {
        let registry = ToolRegistry::new(
            tools
                .into_iter()
                .map(|tool| Box::new(tool) as Box<dyn crate::core::registry::Tool>)
                .collect(),
        )
        .expect("registry");
        StepRunner::new(registry)
    }

    #[test]
    fn final_reply_appends_no_observation() {
        let runner = runner(vec![RecordingTool::new("write_readme")]);
        let generator = ScriptedGenerator::new(["Final Answer: done"]);
        let mut transcript = Transcript::with_head("p", "t");

        let outcome = runner.run_step(&generator, &mut transcript, None);

        assert_eq!(
            outcome,
            StepOutcome::Final {
                text: "done".to_string()
            }
        );
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.last_reply(), Some("Final Answer: done"));
    }

    #[test]
    fn tool_call_appends_reply_and_observation() {
        let tool = RecordingTool::new("write_readme");
        let calls = tool.calls();
        let runner = runner(vec![tool]);
        let generator =
            ScriptedGenerator::new(["Action: write_readme\nAction Input: {\"content\": \"# X\"}"]);
        let mut transcript = Transcript::with_head("p", "t");

        let outcome = runner.run_step(&generator, &mut transcript, None);

        assert_eq!(
            outcome,
            StepOutcome::ToolSucceeded {
                tool: "write_readme".to_string(),
                inferred: false
            }
        );
        assert_eq!(transcript.len(), 4);
        assert_eq!(
            transcript.turns()[3],
            Turn::Observation("recorded write_readme".to_string())
        );
        let calls = calls.lock().expect("calls");
        assert_eq!(calls[0].get("content").map(String::as_str), Some("# X"));
    }

    #[test]
    fn unknown_tool_lists_available_tools() {
        let runner = runner(vec![RecordingTool::new("explain")]);
        let generator = ScriptedGenerator::new(["Action: launch\nAction Input: {}"]);
        let mut transcript = Transcript::with_head("p", "t");

        let outcome = runner.run_step(&generator, &mut transcript, None);

        assert_eq!(
            outcome,
            StepOutcome::UnknownTool {
                name: "launch".to_string()
            }
        );
        assert_eq!(
            transcript.turns()[3],
            Turn::Observation("Unknown tool 'launch'. Available tools: explain.".to_string())
        );
    }

    #[test]
    fn unparseable_reply_quotes_an_excerpt() {
        let runner = runner(vec![RecordingTool::new("explain")]).with_excerpt_chars(5);
        let generator = ScriptedGenerator::new(["hello there, nothing useful"]);
        let mut transcript = Transcript::with_head("p", "t");

        let outcome = runner.run_step(&generator, &mut transcript, None);

        assert_eq!(
            outcome,
            StepOutcome::Unparseable {
                excerpt: "hello...".to_string()
            }
        );
        let observation = transcript.turns()[3].text();
        assert!(observation.starts_with("Your reply could not be parsed."));
        assert!(observation.ends_with("Reply excerpt: \"hello...\""));
    }

    #[test]
    fn tool_error_is_recorded_as_failure() {
        let runner = runner(vec![RecordingTool::failing("write_testmatrix")]);
        let generator = ScriptedGenerator::new(["Action: write_testmatrix\nAction Input: x"]);
        let mut transcript = Transcript::with_head("p", "t");

        let outcome = runner.run_step(&generator, &mut transcript, None);

        assert_eq!(outcome.event(), StepEvent::ToolFailed);
        assert_eq!(
            transcript.turns()[3],
            Turn::Observation("[error: write_testmatrix failed]".to_string())
        );
    }

    #[test]
    fn excerpt_keeps_short_replies_whole() {
        assert_eq!(excerpt("  short  ", 200), "short");
        assert_eq!(excerpt("abcdef", 3), "abc...");
    }
}
