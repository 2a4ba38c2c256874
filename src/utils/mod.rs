//! Generic utility primitives with zero domain knowledge.
//!
//! - `command` - Process execution with error handling
//! - `shell` - Shell escaping and word splitting

pub mod command;
pub mod shell;
