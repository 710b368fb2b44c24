//! ReAct-style agent that drafts a verification README and test matrix.
//!
//! A text generator is driven through a Thought / Action / Action Input /
//! Observation protocol until it gives a `Final Answer:` or a limit ends the
//! run. The crate keeps a strict split:
//!
//! - **[`core`]**: Pure, deterministic logic (reply parsing, argument
//!   recovery, the tool registry, loop state, transcript rendering).
//! - **[`io`]**: Side effects (config and spec files, the model process,
//!   document-writing tools, persisted transcripts).
//!
//! Orchestration modules ([`step`], [`looping`], [`generate`], [`explain`],
//! [`validate`]) join the two to implement CLI commands.

pub mod core;
pub mod exit_codes;
pub mod explain;
pub mod generate;
pub mod io;
pub mod logging;
pub mod looping;
pub mod step;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod validate;
