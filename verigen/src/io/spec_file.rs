//! Verification specification loading with schema validation.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow};
use jsonschema::Validator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

const SPEC_SCHEMA: &str = include_str!("../../schemas/verification_spec.schema.json");

static SPEC_VALIDATOR: LazyLock<Result<Validator, String>> = LazyLock::new(|| {
    let schema: Value =
        serde_json::from_str(SPEC_SCHEMA).map_err(|err| format!("parse spec schema: {err}"))?;
    jsonschema::validator_for(&schema).map_err(|err| format!("invalid spec schema: {err}"))
});

/// Input describing the design under verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationSpec {
    pub project_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dut: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methodology: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stimulus: Option<String>,
    pub features: Vec<String>,
    pub coverage: Vec<String>,
    /// Keys this crate does not interpret; forwarded to the model as-is.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl VerificationSpec {
    /// Pretty JSON sent to the model as part of the task turn.
    pub fn prompt_payload(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serialize spec payload")
    }

    /// Short human-readable overview.
    pub fn summary(&self) -> String {
        format!(
            "Specification Summary:\n\
             - Project: {}\n\
             - Features to verify: {} items\n\
             - Coverage bins: {} items\n\
             - Methodology: {}\n",
            non_blank(Some(&self.project_name)).unwrap_or("N/A"),
            self.features.len(),
            self.coverage.len(),
            non_blank(self.methodology.as_ref()).unwrap_or("N/A"),
        )
    }

    /// Obvious gaps in the spec, in a fixed order. Empty when nothing is missing.
    pub fn lint(&self) -> Vec<&'static str> {
        let mut problems = Vec::new();
        if self.features.is_empty() {
            problems.push("no features listed");
        }
        if self.coverage.is_empty() {
            problems.push("no coverage bins listed");
        }
        if non_blank(Some(&self.project_name)).is_none() {
            problems.push("no project name");
        }
        if non_blank(self.methodology.as_ref()).is_none() {
            problems.push("no methodology specified");
        }
        problems
    }

    /// One-line lint verdict as reported by the `debug` tool.
    pub fn lint_report(&self) -> String {
        let problems = self.lint();
        if problems.is_empty() {
            "OK: No obvious issues found".to_string()
        } else {
            format!("ISSUES FOUND: {}", problems.join(", "))
        }
    }
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Load a spec from `.json` or `.toml`. Other extensions are read as TOML.
pub fn load_spec(path: &Path) -> Result<VerificationSpec> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read spec {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let value: Value = if is_json {
        serde_json::from_str(&contents).with_context(|| format!("parse spec {}", path.display()))?
    } else {
        toml::from_str(&contents).with_context(|| format!("parse spec {}", path.display()))?
    };
    let spec = spec_from_value(value).with_context(|| format!("load spec {}", path.display()))?;
    debug!(project = %spec.project_name, features = spec.features.len(), "loaded spec");
    Ok(spec)
}

/// Validate a parsed document against the spec schema and deserialize it.
pub fn spec_from_value(value: Value) -> Result<VerificationSpec> {
    let validator = SPEC_VALIDATOR
        .as_ref()
        .map_err(|err| anyhow!("{err}"))?;
    if !validator.is_valid(&value) {
        let messages = validator
            .iter_errors(&value)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "spec schema validation failed: {}",
            messages.join("; ")
        ));
    }
    serde_json::from_value(value).context("deserialize spec")
}
