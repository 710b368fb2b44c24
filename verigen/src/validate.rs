//! `verigen validate`: schema check plus spec lint.

use std::path::Path;

use anyhow::Result;

use crate::io::spec_file::{VerificationSpec, load_spec};

/// Outcome of validating a spec file that passed the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecValidation {
    pub spec: VerificationSpec,
    /// Lint findings; empty when the spec has no obvious gaps.
    pub problems: Vec<&'static str>,
}

impl SpecValidation {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Load `path`, failing on parse or schema errors, and lint the result.
///
/// Lint findings are warnings, not errors: a spec with an empty feature list
/// is still usable, the model is just told less.
pub fn validate_spec(path: &Path) -> Result<SpecValidation> {
    let spec = load_spec(path)?;
    let problems = spec.lint();
    Ok(SpecValidation { spec, problems })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn valid_spec_with_gaps_reports_problems() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("spec.json");
        fs::write(
            &path,
            r#"{"project_name": "AHB", "features": ["handshake"], "coverage": []}"#,
        )
        .expect("write");
        let validation = validate_spec(&path).expect("validate");
        assert!(!validation.is_clean());
        assert_eq!(
            validation.problems,
            vec!["no coverage bins listed", "no methodology specified"]
        );
    }

    #[test]
    fn schema_violation_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("spec.toml");
        fs::write(&path, "features = []\ncoverage = []\n").expect("write");
        let err = validate_spec(&path).unwrap_err();
        assert!(format!("{err:#}").contains("project_name"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = validate_spec(&temp.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("read spec"));
    }
}
