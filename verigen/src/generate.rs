//! `verigen run`: wire spec, tools, prompts and the loop into one run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::io::config::AgentConfig;
use crate::io::generator::Generator;
use crate::io::prompt::PromptEngine;
use crate::io::spec_file::load_spec;
use crate::io::tools::default_registry;
use crate::io::transcript_store::TranscriptStore;
use crate::looping::{ReactExecutor, RunReport};
use crate::step::StepOutcome;

/// Inputs for one generation run.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub spec_path: PathBuf,
    /// Where documents, `transcript.log` and `last_response.json` go.
    pub outdir: PathBuf,
    pub config: AgentConfig,
    /// Earlier reply to append to the system preamble.
    pub seed_response: Option<PathBuf>,
}

impl GenerateRequest {
    pub fn new(spec_path: &Path, outdir: &Path, config: AgentConfig) -> Self {
        Self {
            spec_path: spec_path.to_path_buf(),
            outdir: outdir.to_path_buf(),
            config,
            seed_response: None,
        }
    }

    pub fn with_seed_response(mut self, path: Option<PathBuf>) -> Self {
        self.seed_response = path;
        self
    }
}

/// Load the spec, build the registry and run the ReAct loop to completion.
///
/// Returns `Err` only for setup or persistence problems; a run that ends
/// without a final answer is an `Ok` report carrying a failure result.
#[instrument(skip_all, fields(spec = %request.spec_path.display(), outdir = %request.outdir.display()))]
pub fn generate<G, F>(generator: &G, request: &GenerateRequest, on_step: F) -> Result<RunReport>
where
    G: Generator,
    F: FnMut(u32, &StepOutcome),
{
    let config = &request.config;
    config.validate().context("validate config")?;
    let spec = load_spec(&request.spec_path)?;
    let seed = request
        .seed_response
        .as_deref()
        .map(|path| {
            fs::read_to_string(path)
                .with_context(|| format!("read seed response {}", path.display()))
        })
        .transpose()?;

    let registry = default_registry(&request.outdir, &spec)?;
    let transcript = PromptEngine::new()?.transcript_head(&registry, &spec, seed.as_deref())?;
    let executor = ReactExecutor::new(registry, config.limits())
        .with_history_budget(config.history_budget_bytes)
        .with_excerpt_chars(config.excerpt_chars);
    let store = TranscriptStore::create(&request.outdir)?;

    info!(project = %spec.project_name, seeded = seed.is_some(), "starting run");
    executor.run(generator, transcript, store, on_step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RunResult;
    use crate::io::tools::{README_FILE, TEST_MATRIX_FILE};
    use crate::test_support::ScriptedGenerator;

    #[test]
    fn full_run_writes_both_documents() {
        let temp = tempfile::tempdir().expect("tempdir");
        let spec_path = temp.path().join("spec.toml");
        fs::write(&spec_path, include_str!("../specs/ahb_lite.toml")).expect("write spec");
        let outdir = temp.path().join("out");
        let generator = ScriptedGenerator::new([
            "Thought: readme first\nAction: write_readme\nAction Input: {\"content\": \"# AHB-Lite\"}",
            "Thought: now the matrix\nAction: write_testmatrix\nAction Input: {\"content\": \"| ID |\\n|---|\\n| T001 |\"}",
            "Final Answer: Generated README and test matrix successfully",
        ]);

        let report = generate(
            &generator,
            &GenerateRequest::new(&spec_path, &outdir, AgentConfig::default()),
            |_, _| {},
        )
        .expect("run");

        assert!(report.result.is_success());
        assert_eq!(report.result.steps(), 3);
        assert_eq!(
            fs::read_to_string(outdir.join(README_FILE)).expect("readme"),
            "# AHB-Lite"
        );
        assert!(outdir.join(TEST_MATRIX_FILE).is_file());
        assert!(outdir.join("transcript.log").is_file());
        assert!(generator.prompts()[0].contains("\"project_name\": \"AHB-Lite Verification\""));
        assert!(matches!(report.result, RunResult::Success { .. }));
    }

    #[test]
    fn seeded_run_carries_previous_reply_in_preamble() {
        let temp = tempfile::tempdir().expect("tempdir");
        let spec_path = temp.path().join("spec.toml");
        fs::write(&spec_path, include_str!("../specs/ahb_lite.toml")).expect("write spec");
        let seed_path = temp.path().join("previous.txt");
        fs::write(&seed_path, "Thought: the README is written\n").expect("write seed");
        let generator = ScriptedGenerator::new(["Final Answer: done"]);

        let request = GenerateRequest::new(&spec_path, &temp.path().join("out"), AgentConfig::default())
            .with_seed_response(Some(seed_path));
        let report = generate(&generator, &request, |_, _| {}).expect("run");

        assert!(report.result.is_success());
        assert!(generator.prompts()[0]
            .contains("Seeded with previous response:\nThought: the README is written"));
    }

    #[test]
    fn missing_seed_file_fails_before_any_model_call() {
        let temp = tempfile::tempdir().expect("tempdir");
        let spec_path = temp.path().join("spec.toml");
        fs::write(&spec_path, include_str!("../specs/ahb_lite.toml")).expect("write spec");
        let generator = ScriptedGenerator::new(["Final Answer: x"]);

        let request = GenerateRequest::new(&spec_path, &temp.path().join("out"), AgentConfig::default())
            .with_seed_response(Some(temp.path().join("absent.txt")));
        let err = generate(&generator, &request, |_, _| {}).unwrap_err();

        assert!(format!("{err:#}").contains("read seed response"));
        assert_eq!(generator.calls(), 0);
    }

    #[test]
    fn invalid_spec_fails_before_any_model_call() {
        let temp = tempfile::tempdir().expect("tempdir");
        let spec_path = temp.path().join("spec.json");
        fs::write(&spec_path, "{\"features\": []}").expect("write spec");
        let generator = ScriptedGenerator::new(["Final Answer: x"]);

        let err = generate(
            &generator,
            &GenerateRequest::new(&spec_path, temp.path(), AgentConfig::default()),
            |_, _| {},
        )
        .unwrap_err();

        assert!(format!("{err:#}").contains("spec schema validation failed"));
        assert_eq!(generator.calls(), 0);
    }
}
