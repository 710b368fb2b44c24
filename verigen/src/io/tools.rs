//! Concrete tools exposed to the model.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::core::registry::{Tool, ToolOutcome, ToolRegistry};
use crate::core::table::{align_markdown_table, contains_table};
use crate::core::types::{CONTENT_KEY, ToolArguments};
use crate::io::spec_file::VerificationSpec;

pub const README_FILE: &str = "README_generated.md";
pub const TEST_MATRIX_FILE: &str = "TEST_MATRIX_generated.md";

/// Writes the model-supplied `content` to a fixed file in the run's output
/// directory.
#[derive(Debug, Clone)]
pub struct DocumentTool {
    name: &'static str,
    description: &'static str,
    file_name: &'static str,
    outdir: PathBuf,
    align_tables: bool,
}

impl DocumentTool {
    pub fn readme(outdir: &Path) -> Self {
        Self {
            name: "write_readme",
            description: "Creates README_generated.md. Needs: {\"content\": \"full README text\"}",
            file_name: README_FILE,
            outdir: outdir.to_path_buf(),
            align_tables: false,
        }
    }

    pub fn test_matrix(outdir: &Path) -> Self {
        Self {
            name: "write_testmatrix",
            description: "Creates TEST_MATRIX_generated.md. Needs: {\"content\": \"full table markdown\"}",
            file_name: TEST_MATRIX_FILE,
            outdir: outdir.to_path_buf(),
            align_tables: true,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.outdir.join(self.file_name)
    }

    fn write(&self, content: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.outdir)
            .with_context(|| format!("create output dir {}", self.outdir.display()))?;
        let path = self.path();
        fs::write(&path, content).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}

impl Tool for DocumentTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn execute(&self, arguments: &ToolArguments) -> ToolOutcome {
        let content = arguments.get(CONTENT_KEY).map_or("", String::as_str);
        if content.trim().is_empty() {
            let keys: Vec<&String> = arguments.keys().collect();
            return ToolOutcome::Error(format!(
                "[error: no content provided] input_keys={keys:?} content_repr={content:?}"
            ));
        }
        if arguments.contains_key("outdir") {
            debug!(tool = self.name, "ignoring model-supplied outdir");
        }

        let body = if self.align_tables && contains_table(content) {
            align_markdown_table(content)
        } else {
            content.to_string()
        };

        match self.write(&body) {
            Ok(path) => {
                info!(tool = self.name, path = %path.display(), "wrote document");
                ToolOutcome::Ok(format!(
                    "SUCCESS: wrote {} chars to {}",
                    body.chars().count(),
                    path.display()
                ))
            }
            Err(err) => ToolOutcome::Error(format!("[error: {err:#}]")),
        }
    }
}

/// Summarizes the spec the run was started with.
#[derive(Debug, Clone)]
pub struct ExplainTool {
    spec: Arc<VerificationSpec>,
}

impl Tool for ExplainTool {
    fn name(&self) -> &str {
        "explain"
    }

    fn description(&self) -> &str {
        "Explains the spec"
    }

    fn execute(&self, _arguments: &ToolArguments) -> ToolOutcome {
        ToolOutcome::Ok(self.spec.summary())
    }
}

/// Lists obvious gaps in the spec the run was started with.
#[derive(Debug, Clone)]
pub struct DebugTool {
    spec: Arc<VerificationSpec>,
}

impl Tool for DebugTool {
    fn name(&self) -> &str {
        "debug"
    }

    fn description(&self) -> &str {
        "Checks for issues"
    }

    fn execute(&self, _arguments: &ToolArguments) -> ToolOutcome {
        ToolOutcome::Ok(self.spec.lint_report())
    }
}

/// The four tools a generation run offers, writing into `outdir`.
pub fn default_registry(outdir: &Path, spec: &VerificationSpec) -> Result<ToolRegistry> {
    let spec = Arc::new(spec.clone());
    ToolRegistry::new(vec![
        Box::new(DocumentTool::readme(outdir)),
        Box::new(DocumentTool::test_matrix(outdir)),
        Box::new(ExplainTool {
            spec: Arc::clone(&spec),
        }),
        Box::new(DebugTool { spec }),
    ])
}
