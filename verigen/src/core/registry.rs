//! Tool contract and the fixed name -> tool mapping.
//!
//! The registry is built once and is read-only afterwards, so a single
//! instance may be shared by concurrent runs.

use std::fmt;

use anyhow::{Result, bail};

use crate::core::types::ToolArguments;

/// Result of one tool invocation. Tools never panic or return `Err`; a
/// failure is an observation the model gets to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Ok(String),
    Error(String),
}

impl ToolOutcome {
    pub fn observation(&self) -> &str {
        match self {
            ToolOutcome::Ok(text) | ToolOutcome::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutcome::Error(_))
    }
}

/// A callable the model can name in an `Action:` line.
pub trait Tool: Send + Sync {
    /// Unique registry key.
    fn name(&self) -> &str;

    /// One-line usage hint rendered into the system preamble.
    fn description(&self) -> &str;

    /// Run the tool. Missing or odd keys must be reported, not panicked on.
    fn execute(&self, arguments: &ToolArguments) -> ToolOutcome;
}

/// Name and description pair for prompt rendering.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
}

/// Immutable mapping from action name to tool.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Build a registry, rejecting names that collide ignoring ASCII case.
    pub fn new(tools: Vec<Box<dyn Tool>>) -> Result<Self> {
        for (idx, tool) in tools.iter().enumerate() {
            if tool.name().trim().is_empty() {
                bail!("tool at position {idx} has an empty name");
            }
            let duplicate = tools[..idx]
                .iter()
                .any(|earlier| earlier.name().eq_ignore_ascii_case(tool.name()));
            if duplicate {
                bail!("duplicate tool name '{}'", tool.name());
            }
        }
        Ok(Self { tools })
    }

    /// Case-insensitive exact lookup.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|tool| tool.name().eq_ignore_ascii_case(name))
            .map(Box::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    pub fn summaries(&self) -> Vec<ToolSummary> {
        self.tools
            .iter()
            .map(|tool| ToolSummary {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
