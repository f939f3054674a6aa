//! Library half of the `notecase` binary
//!
//! Argument parsing, configuration resolution and the command handlers live
//! here so they can be tested without spawning a process.

pub mod cli;
pub mod commands;
pub mod logging;
