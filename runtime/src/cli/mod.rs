//! CLI subcommand implementations for the feedharvest binary.

pub mod doctor;
pub mod prompt;
pub mod run_cmd;
