//! Prompt rendering for the transcript head and the one-shot explain call.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use tracing::debug;

use crate::core::registry::{ToolRegistry, ToolSummary};
use crate::core::transcript::Transcript;
use crate::io::spec_file::VerificationSpec;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");
const TASK_TEMPLATE: &str = include_str!("prompts/task.md");
const EXPLAIN_TEMPLATE: &str = include_str!("prompts/explain.md");

/// Minimum number of scenario rows requested for the test matrix.
const MIN_SCENARIOS: usize = 8;

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("system", SYSTEM_TEMPLATE)
            .context("load system template")?;
        env.add_template("task", TASK_TEMPLATE)
            .context("load task template")?;
        env.add_template("explain", EXPLAIN_TEMPLATE)
            .context("load explain template")?;
        Ok(Self { env })
    }

    /// Fixed instructions plus the tool list, optionally followed by a
    /// reply from an earlier run.
    pub fn render_preamble(&self, tools: &[ToolSummary], seed: Option<&str>) -> Result<String> {
        let template = self.env.get_template("system")?;
        let rendered = template
            .render(context! { tools => tools, seed => seed.map(str::trim) })
            .context("render system prompt")?;
        Ok(rendered)
    }

    /// Task description with the spec payload embedded.
    pub fn render_task(&self, spec: &VerificationSpec) -> Result<String> {
        let template = self.env.get_template("task")?;
        let rendered = template
            .render(context! {
                spec => spec.prompt_payload()?,
                project_name => spec.project_name.trim(),
                min_scenarios => MIN_SCENARIOS,
            })
            .context("render task prompt")?;
        Ok(rendered)
    }

    pub fn render_explain(&self, spec: &VerificationSpec) -> Result<String> {
        let template = self.env.get_template("explain")?;
        let rendered = template
            .render(context! { spec => spec.prompt_payload()? })
            .context("render explain prompt")?;
        Ok(rendered)
    }

    /// Start a transcript whose head describes `registry` and `spec`.
    ///
    /// `seed` is appended to the preamble when rerunning from an earlier reply.
    pub fn transcript_head(
        &self,
        registry: &ToolRegistry,
        spec: &VerificationSpec,
        seed: Option<&str>,
    ) -> Result<Transcript> {
        let preamble = self.render_preamble(&registry.summaries(), seed)?;
        let task = self.render_task(spec)?;
        debug!(
            preamble_bytes = preamble.len(),
            task_bytes = task.len(),
            "rendered transcript head"
        );
        Ok(Transcript::with_head(preamble, task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Turn;
    use crate::io::tools::default_registry;
    use crate::test_support::sample_spec;

    #[test]
    fn preamble_lists_every_tool() {
        let temp = tempfile::tempdir().expect("tempdir");
        let registry = default_registry(temp.path(), &sample_spec()).expect("registry");
        let engine = PromptEngine::new().expect("engine");
        let preamble = engine
            .render_preamble(&registry.summaries(), None)
            .expect("preamble");
        for name in ["write_readme", "write_testmatrix", "explain", "debug"] {
            assert!(preamble.contains(&format!("- {name}: ")), "missing {name}");
        }
        assert!(preamble.ends_with("Final Answer: Generated README and test matrix successfully"));
        assert!(!preamble.contains("Seeded with previous response"));
    }

    #[test]
    fn seed_is_appended_after_instructions() {
        let temp = tempfile::tempdir().expect("tempdir");
        let spec = sample_spec();
        let registry = default_registry(temp.path(), &spec).expect("registry");
        let engine = PromptEngine::new().expect("engine");
        let transcript = engine
            .transcript_head(&registry, &spec, Some("  Thought: half done\nAction: write_readme\n"))
            .expect("head");
        let preamble = transcript.turns()[0].text();
        assert!(preamble.ends_with(
            "successfully\n\nSeeded with previous response:\nThought: half done\nAction: write_readme"
        ));
        assert!(matches!(transcript.turns()[1], Turn::TaskSpec(_)));
    }

    #[test]
    fn task_embeds_spec_payload() {
        let engine = PromptEngine::new().expect("engine");
        let task = engine.render_task(&sample_spec()).expect("task");
        assert!(task.contains("\"project_name\": \"AHB-Lite Verification\""));
        assert!(task.contains("at least 8 scenario rows"));
        assert!(task.contains("# AHB-Lite Verification\\n\\nProject details here"));
    }

    #[test]
    fn head_has_preamble_then_task() {
        let temp = tempfile::tempdir().expect("tempdir");
        let spec = sample_spec();
        let registry = default_registry(temp.path(), &spec).expect("registry");
        let engine = PromptEngine::new().expect("engine");
        let transcript = engine.transcript_head(&registry, &spec, None).expect("head");
        assert_eq!(transcript.len(), 2);
        assert!(matches!(transcript.turns()[0], Turn::SystemPreamble(_)));
        assert!(matches!(transcript.turns()[1], Turn::TaskSpec(_)));
    }

    #[test]
    fn explain_prompt_carries_spec() {
        let engine = PromptEngine::new().expect("engine");
        let prompt = engine.render_explain(&sample_spec()).expect("explain");
        assert!(prompt.starts_with("Explain the verification plan briefly."));
        assert!(prompt.contains("\"methodology\": \"UVM\""));
    }
}
