use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use icarus_core::{local_now, local_today};
use icarus_db::Database;
use tracing_subscriber::EnvFilter;

use icarus_cli::commands::{insights, journal, report, session, suggest, task};
use icarus_cli::{Cli, Commands, Config, SleepAction, TaskAction};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // logs go to stderr so --json output stays clean
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut db, config) = open_database(cli.config.as_deref())?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let now = local_now();
    let today = local_today();

    match command {
        Commands::Start(args) => session::start(&mut out, &mut db, args, now)?,
        Commands::End(args) => session::end(&mut out, &mut db, args, &config.patterns, now)?,
        Commands::Status { json } => session::status(&mut out, &db, *json, now)?,
        Commands::Correct { id, work_type } => {
            session::correct(&mut out, &mut db, id, *work_type)?;
        }
        Commands::Delete { id } => session::delete(&mut out, &mut db, id)?,
        Commands::Log(args) => session::log(&mut out, &mut db, args, &config.patterns, now)?,
        Commands::Sessions(args) => session::sessions(&mut out, &db, args, today)?,
        Commands::Task(action) => match action {
            TaskAction::Add(args) => task::add(&mut out, &mut db, args, now)?,
            TaskAction::List { json } => task::list(&mut out, &db, *json)?,
            TaskAction::Start { id, before } => task::start(&mut out, &mut db, id, before, now)?,
            TaskAction::Delete { id } => task::delete(&mut out, &mut db, id)?,
        },
        Commands::Sleep(action) => match action {
            SleepAction::Log(args) => journal::sleep(&mut out, &mut db, args, today)?,
            SleepAction::Show { date, json } => {
                journal::sleep_show(&mut out, &db, date, *json, today)?;
            }
            SleepAction::List(args) => journal::sleep_list(&mut out, &db, args, today)?,
        },
        Commands::Intake { date, to, json } => {
            journal::intake(&mut out, &db, date, to.as_deref(), *json, today)?;
        }
        Commands::Water { date } => journal::water(&mut out, &mut db, date, today)?,
        Commands::Meal { meal, date, at } => {
            journal::meal(&mut out, &mut db, *meal, date, at.as_deref(), now)?;
        }
        Commands::Day { date, json } => report::day(&mut out, &db, date, *json, today)?,
        Commands::Week { date, json } => report::week(&mut out, &db, date, *json, today)?,
        Commands::Range { start, end, json } => {
            report::range(&mut out, &db, start, end, *json, today)?;
        }
        Commands::Score { date, to, json } => {
            report::score(&mut out, &db, date, to.as_deref(), *json, today)?;
        }
        Commands::Chronotype(args) => insights::chronotype(&mut out, &db, args, today)?,
        Commands::Ledger(args) => insights::ledger(&mut out, &db, args, today)?,
        Commands::Calendar { metric, json } => {
            insights::calendar(&mut out, &db, *metric, *json, today)?;
        }
        Commands::SleepDeep(args) => insights::sleep_deep(&mut out, &db, args, today)?,
        Commands::Patterns(args) => {
            insights::patterns(&mut out, &db, args, &config.patterns, today)?;
        }
        Commands::Suggest { text, json } => suggest::suggest(&mut out, &db, text, *json, today)?,
    }

    out.flush()?;
    Ok(())
}
