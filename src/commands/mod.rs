//! Subcommand implementations

pub mod analyze;
pub mod serve;
pub mod weights;
