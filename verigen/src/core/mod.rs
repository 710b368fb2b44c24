//! Deterministic, pure logic for the ReAct loop.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod parser;
pub mod recovery;
pub mod registry;
pub mod state;
pub mod table;
pub mod transcript;
pub mod types;
