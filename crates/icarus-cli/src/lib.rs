//! Performance journal CLI library.
//!
//! This crate provides the `icarus` command-line surface over the journal
//! engine and its SQLite store.

mod cli;
pub mod commands;
mod config;

pub use cli::{
    AfterArgs, BeforeArgs, Cli, Commands, ContextArgs, EndArgs, LogArgs, OutcomeArgs, RangeArgs,
    SessionsArgs, SleepAction, SleepArgs, StartArgs, TaskAction,
};
pub use config::Config;
