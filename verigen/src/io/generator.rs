//! Model-invocation collaborator.
//!
//! The [`Generator`] trait decouples the ReAct loop from the model backend
//! (currently a local `ollama run <model>`). Tests use scripted generators
//! that replay canned replies without spawning processes.

use std::io::ErrorKind;
use std::process::Command;

use tracing::{debug, info, instrument, warn};

use crate::io::config::GeneratorConfig;
use crate::io::process::run_command_with_timeout;

/// Blocking text generator.
///
/// Implementations never fail: an unavailable or broken backend yields a
/// sentinel reply that the loop treats like any other unparseable text.
pub trait Generator {
    fn generate(&self, prompt: &str) -> String;
}

/// Generator that pipes the prompt into `<command...> <model>` and returns
/// trimmed stdout.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    config: GeneratorConfig,
}

impl OllamaGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn program(&self) -> &str {
        self.config.command.first().map_or("ollama", String::as_str)
    }
}

impl Generator for OllamaGenerator {
    #[instrument(skip_all, fields(model = %self.config.model, prompt_bytes = prompt.len()))]
    fn generate(&self, prompt: &str) -> String {
        let mut cmd = Command::new(self.program());
        cmd.args(self.config.command.iter().skip(1))
            .arg(&self.config.model);

        info!("invoking generator");
        let output = match run_command_with_timeout(
            cmd,
            Some(prompt.as_bytes()),
            self.config.timeout(),
            self.config.output_limit_bytes,
        ) {
            Ok(output) => output,
            Err(err) => {
                let not_found = err
                    .root_cause()
                    .downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == ErrorKind::NotFound);
                if not_found {
                    warn!(program = self.program(), "generator program not found");
                    return format!(
                        "[generator_unavailable] {} is not installed or not on PATH (see https://ollama.com)",
                        self.program()
                    );
                }
                warn!(err = %format!("{err:#}"), "generator invocation failed");
                return format!("[generator_error] {err:#}");
            }
        };

        if output.timed_out {
            return format!(
                "[generator_error] timed out after {}s",
                self.config.timeout_secs
            );
        }

        let stdout = output.stdout_text();
        let reply = stdout.trim();
        if reply.is_empty() {
            let stderr = output.stderr_text();
            warn!(exit_code = ?output.status.code(), "generator produced no output");
            return format!("[generator_no_output] stderr={}", stderr.trim());
        }

        debug!(reply_bytes = reply.len(), "generator replied");
        reply.to_string()
    }
}
