//! verigen CLI.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};

use verigen::core::types::{FailureReason, RunResult};
use verigen::exit_codes;
use verigen::explain::explain_spec;
use verigen::generate::{GenerateRequest, generate};
use verigen::io::config::{AgentConfig, DEFAULT_CONFIG_PATH, load_config, write_config};
use verigen::io::generator::OllamaGenerator;
use verigen::io::spec_file::load_spec;
use verigen::logging;
use verigen::validate::validate_spec;

#[derive(Parser)]
#[command(
    name = "verigen",
    version,
    about = "Draft a verification README and test matrix with a local model"
)]
struct Cli {
    /// Config file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the ReAct loop and write the generated documents.
    Run {
        /// Verification spec (.toml or .json).
        spec: PathBuf,
        /// Model name passed to the generator command.
        #[arg(long)]
        model: Option<String>,
        /// Output directory for documents and transcripts.
        #[arg(long, default_value = "output")]
        outdir: PathBuf,
        #[arg(long)]
        max_steps: Option<u32>,
        /// Consecutive unparseable replies tolerated before giving up.
        #[arg(long)]
        max_unparseable: Option<u32>,
        /// File holding an earlier reply to seed the system prompt with.
        #[arg(long)]
        seed_response: Option<PathBuf>,
    },
    /// Ask the model for a short explanation of the spec.
    Explain {
        spec: PathBuf,
        #[arg(long)]
        model: Option<String>,
    },
    /// Check a spec against the schema and list obvious gaps.
    Validate { spec: PathBuf },
    /// Write the default config file.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    logging::init();
    match run() {
        Ok(code) => exit_code(code),
        Err(err) => {
            eprintln!("{err:#}");
            exit_code(exit_codes::INVALID)
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            spec,
            model,
            outdir,
            max_steps,
            max_unparseable,
            seed_response,
        } => {
            let mut config = load_config(&cli.config)?;
            apply_overrides(&mut config, model, max_steps, max_unparseable);
            let request =
                GenerateRequest::new(&spec, &outdir, config).with_seed_response(seed_response);
            cmd_run(&request)
        }
        Command::Explain { spec, model } => {
            let mut config = load_config(&cli.config)?;
            apply_overrides(&mut config, model, None, None);
            cmd_explain(&spec, config)
        }
        Command::Validate { spec } => cmd_validate(&spec),
        Command::Init { force } => cmd_init(&cli.config, force),
    }
}

fn apply_overrides(
    config: &mut AgentConfig,
    model: Option<String>,
    max_steps: Option<u32>,
    max_unparseable: Option<u32>,
) {
    if let Some(model) = model {
        config.generator.model = model;
    }
    if let Some(max_steps) = max_steps {
        config.max_steps = max_steps;
    }
    if let Some(max_unparseable) = max_unparseable {
        config.max_consecutive_unparseable = max_unparseable;
    }
}

fn cmd_run(request: &GenerateRequest) -> Result<i32> {
    let generator = OllamaGenerator::new(request.config.generator.clone());
    let max_steps = request.config.max_steps;
    let report = generate(&generator, request, |step, outcome| {
        println!("[step {step}/{max_steps}] {outcome}");
    })?;

    println!("transcript: {}", report.paths.log_path.display());
    match &report.result {
        RunResult::Success { final_text, steps } => {
            println!("succeeded after {steps} steps: {final_text}");
        }
        RunResult::Failure { reason, steps, .. } => {
            println!("failed after {steps} steps: {reason}");
        }
    }
    Ok(result_exit_code(&report.result))
}

fn result_exit_code(result: &RunResult) -> i32 {
    match result {
        RunResult::Success { .. } => exit_codes::OK,
        RunResult::Failure { reason, .. } => match reason {
            FailureReason::UnparseableReplies => exit_codes::FAILED_PARSE,
            FailureReason::MaxStepsExceeded => exit_codes::FAILED_MAX_STEPS,
            FailureReason::ToolErrors => exit_codes::FAILED_TOOL,
        },
    }
}

fn cmd_explain(spec: &Path, config: AgentConfig) -> Result<i32> {
    config.validate()?;
    let spec = load_spec(spec)?;
    let generator = OllamaGenerator::new(config.generator);
    println!("{}", explain_spec(&generator, &spec)?);
    Ok(exit_codes::OK)
}

fn cmd_validate(spec: &Path) -> Result<i32> {
    let validation = validate_spec(spec)?;
    if validation.is_clean() {
        println!("OK: No obvious issues found");
    } else {
        for problem in &validation.problems {
            println!("warning: {problem}");
        }
    }
    Ok(exit_codes::OK)
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &AgentConfig::default())?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_with_overrides() {
        let cli = Cli::parse_from([
            "verigen",
            "run",
            "spec.toml",
            "--model",
            "llama3",
            "--max-steps",
            "5",
            "--max-unparseable",
            "2",
            "--seed-response",
            "output/last_response.json",
        ]);
        let Command::Run {
            spec,
            model,
            outdir,
            max_steps,
            max_unparseable,
            seed_response,
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(spec, PathBuf::from("spec.toml"));
        assert_eq!(model.as_deref(), Some("llama3"));
        assert_eq!(outdir, PathBuf::from("output"));
        assert_eq!(max_steps, Some(5));
        assert_eq!(max_unparseable, Some(2));
        assert_eq!(seed_response, Some(PathBuf::from("output/last_response.json")));
        assert_eq!(cli.config, PathBuf::from("verigen.toml"));
    }

    #[test]
    fn parse_init_force_with_global_config() {
        let cli = Cli::parse_from(["verigen", "init", "--force", "--config", "alt.toml"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
        assert_eq!(cli.config, PathBuf::from("alt.toml"));
    }

    #[test]
    fn overrides_replace_config_values() {
        let mut config = AgentConfig::default();
        apply_overrides(&mut config, Some("llama3".to_string()), Some(7), None);
        assert_eq!(config.generator.model, "llama3");
        assert_eq!(config.max_steps, 7);
        assert_eq!(config.max_consecutive_unparseable, 3);
    }

    #[test]
    fn failure_reasons_map_to_distinct_codes() {
        let failure = |reason| RunResult::Failure {
            reason,
            steps: 1,
            last_raw_reply: None,
        };
        assert_eq!(
            result_exit_code(&RunResult::Success {
                final_text: String::new(),
                steps: 1
            }),
            exit_codes::OK
        );
        assert_eq!(
            result_exit_code(&failure(FailureReason::UnparseableReplies)),
            exit_codes::FAILED_PARSE
        );
        assert_eq!(
            result_exit_code(&failure(FailureReason::MaxStepsExceeded)),
            exit_codes::FAILED_MAX_STEPS
        );
        assert_eq!(
            result_exit_code(&failure(FailureReason::ToolErrors)),
            exit_codes::FAILED_TOOL
        );
    }
}
