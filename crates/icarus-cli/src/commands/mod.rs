//! CLI subcommand implementations.

pub mod insights;
pub mod journal;
pub mod report;
pub mod session;
pub mod suggest;
pub mod task;
pub mod util;
