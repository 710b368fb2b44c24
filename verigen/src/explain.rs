//! `verigen explain`: one model call that summarizes the verification plan.

use anyhow::Result;
use tracing::instrument;

use crate::io::generator::Generator;
use crate::io::prompt::PromptEngine;
use crate::io::spec_file::VerificationSpec;

/// Ask the model for a short explanation of `spec`. No tools, no loop.
#[instrument(skip_all, fields(project = %spec.project_name))]
pub fn explain_spec<G: Generator>(generator: &G, spec: &VerificationSpec) -> Result<String> {
    let prompt = PromptEngine::new()?.render_explain(spec)?;
    Ok(generator.generate(&prompt))
}
