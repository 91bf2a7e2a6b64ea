//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use icarus_core::{CalendarMetric, CompletionStatus, Domain, Meal, SessionId, TaskId, WorkType};

/// Personal performance journal.
///
/// Records focused work sessions, sleep and intake, and turns them into daily
/// scores, summaries and heatmaps.
#[derive(Debug, Parser)]
#[command(name = "icarus", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start a session.
    Start(StartArgs),

    /// End the active session.
    End(EndArgs),

    /// Show the active session.
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Correct the work type of an ended session.
    Correct {
        id: SessionId,
        #[arg(value_name = "TYPE")]
        work_type: WorkType,
    },

    /// Delete a session.
    Delete { id: SessionId },

    /// Record a session that already happened.
    Log(LogArgs),

    /// Manage the task queue.
    #[command(subcommand)]
    Task(TaskAction),

    /// List sessions in a date range, or the most recent ones.
    Sessions(SessionsArgs),

    /// Log and look up sleep.
    #[command(subcommand)]
    Sleep(SleepAction),

    /// Log a glass of water.
    Water {
        #[arg(long, default_value = "today")]
        date: String,
    },

    /// Show water and meals for a date, or every logged date up to --to.
    Intake {
        #[arg(default_value = "today")]
        date: String,
        /// End of a range starting at DATE.
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Log a meal.
    Meal {
        meal: Meal,
        #[arg(long, default_value = "today")]
        date: String,
        /// Time eaten (HH:MM or a full timestamp). Defaults to now.
        #[arg(long)]
        at: Option<String>,
    },

    /// Summarize one day.
    Day {
        #[arg(default_value = "today")]
        date: String,
        #[arg(long)]
        json: bool,
    },

    /// Summarize the Monday-to-Sunday week containing a date.
    Week {
        #[arg(default_value = "today")]
        date: String,
        #[arg(long)]
        json: bool,
    },

    /// Summarize an arbitrary date range.
    Range {
        start: String,
        end: String,
        #[arg(long)]
        json: bool,
    },

    /// Show the daily score, or the aggregate score with --to.
    Score {
        #[arg(default_value = "today")]
        date: String,
        /// End of an aggregate range starting at DATE.
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Mean focus per hour of day.
    Chronotype(RangeArgs),

    /// Mean energy change per domain.
    Ledger(RangeArgs),

    /// Year-long calendar heatmap.
    Calendar {
        #[arg(long, default_value_t = CalendarMetric::Performance)]
        metric: CalendarMetric,
        #[arg(long)]
        json: bool,
    },

    /// Sleep minutes next to deep-work minutes per day.
    SleepDeep(RangeArgs),

    /// Count sessions per pattern.
    Patterns(RangeArgs),

    /// Suggest a work type for an activity description.
    Suggest {
        text: String,
        #[arg(long)]
        json: bool,
    },
}

/// Task queue operations.
#[derive(Debug, Subcommand)]
pub enum TaskAction {
    /// Queue a task.
    Add(ContextArgs),

    /// List queued tasks, oldest first.
    List {
        #[arg(long)]
        json: bool,
    },

    /// Start a session from a queued task.
    Start {
        id: TaskId,
        #[command(flatten)]
        before: BeforeArgs,
    },

    /// Remove a queued task.
    Delete { id: TaskId },
}

/// Sleep operations.
#[derive(Debug, Subcommand)]
pub enum SleepAction {
    /// Log a night of sleep.
    Log(SleepArgs),

    /// Show the sleep attributed to a waking date.
    Show {
        #[arg(default_value = "today")]
        date: String,
        #[arg(long)]
        json: bool,
    },

    /// List logged nights in a date range.
    List(RangeArgs),
}

/// Which sessions to list.
#[derive(Debug, Clone, Args)]
pub struct SessionsArgs {
    /// First start date (defaults to today).
    #[arg(long, conflicts_with = "limit")]
    pub from: Option<String>,

    /// Last start date (defaults to today).
    #[arg(long, conflicts_with = "limit")]
    pub to: Option<String>,

    /// Show the N most recently started sessions instead, newest first.
    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long)]
    pub json: bool,
}

/// What a session is about.
#[derive(Debug, Clone, Args)]
pub struct ContextArgs {
    /// What you are about to do.
    pub activity: String,

    /// Project the work belongs to.
    #[arg(short, long)]
    pub project: String,

    /// Life area (e.g. work, personal-project, admin).
    #[arg(short, long)]
    pub domain: Domain,

    /// Work type. Suggested from the activity when omitted.
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub work_type: Option<WorkType>,

    /// Planned length in minutes.
    #[arg(long)]
    pub planned: Option<u32>,
}

/// State before a session starts.
#[derive(Debug, Clone, Args)]
pub struct BeforeArgs {
    /// Energy (1-10). Defaults to where your last session today left it.
    #[arg(long)]
    pub energy: Option<u8>,

    /// Stress (1-10). Defaults to where your last session today left it.
    #[arg(long)]
    pub stress: Option<u8>,

    /// How hard it is to get started (1-5).
    #[arg(long, default_value_t = 3)]
    pub resistance: u8,
}

#[derive(Debug, Clone, Args)]
pub struct StartArgs {
    #[command(flatten)]
    pub context: ContextArgs,

    #[command(flatten)]
    pub before: BeforeArgs,

    #[arg(long)]
    pub json: bool,
}

/// Self-evaluation of a finished session.
#[derive(Debug, Clone, Args)]
pub struct OutcomeArgs {
    #[arg(long, default_value = "completed")]
    pub status: CompletionStatus,

    /// Progress (1-5).
    #[arg(long)]
    pub progress: u8,

    /// Quality (1-5).
    #[arg(long)]
    pub quality: u8,

    /// Focus (1-5).
    #[arg(long)]
    pub focus: u8,

    /// The session moved your main goal forward.
    #[arg(long)]
    pub moves_goal: bool,

    /// What you have to show for it.
    #[arg(long)]
    pub evidence: Option<String>,
}

/// State after a session ends.
#[derive(Debug, Clone, Args)]
pub struct AfterArgs {
    /// Energy afterwards (1-10).
    #[arg(long)]
    pub energy_after: u8,

    /// Stress afterwards (1-10).
    #[arg(long)]
    pub stress_after: u8,

    /// One word for how it felt.
    #[arg(long)]
    pub feel: String,
}

#[derive(Debug, Clone, Args)]
pub struct EndArgs {
    /// Session to end. Defaults to the active session.
    pub id: Option<SessionId>,

    #[command(flatten)]
    pub outcome: OutcomeArgs,

    #[command(flatten)]
    pub after: AfterArgs,

    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct LogArgs {
    #[command(flatten)]
    pub context: ContextArgs,

    /// When it started (e.g. "2025-03-03 09:00", "09:00", "2 hours ago").
    #[arg(long)]
    pub from: String,

    /// When it ended.
    #[arg(long)]
    pub until: String,

    #[command(flatten)]
    pub before: BeforeArgs,

    #[command(flatten)]
    pub outcome: OutcomeArgs,

    #[command(flatten)]
    pub after: AfterArgs,

    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct SleepArgs {
    /// Date you woke up.
    #[arg(long, default_value = "today")]
    pub date: String,

    /// Bedtime (HH:MM). Times later than the wake time fall on the previous day.
    #[arg(long)]
    pub bed: String,

    /// Wake time (HH:MM).
    #[arg(long)]
    pub wake: String,

    /// Sleep quality (1-5).
    #[arg(long)]
    pub quality: u8,

    #[arg(long, default_value_t = 0)]
    pub awakenings: u32,

    /// Morning energy (1-10).
    #[arg(long)]
    pub energy: u8,

    /// Morning mood (1-10).
    #[arg(long)]
    pub mood: u8,

    /// Looked at a screen in the last hour before bed.
    #[arg(long)]
    pub screen: Option<bool>,

    /// Had caffeine late in the day.
    #[arg(long)]
    pub caffeine: Option<bool>,

    /// Went to bed at the usual time.
    #[arg(long)]
    pub consistent: Option<bool>,
}

/// An inclusive date range, defaulting to the last four weeks.
#[derive(Debug, Clone, Args)]
pub struct RangeArgs {
    #[arg(long, default_value = "27 days ago")]
    pub from: String,

    #[arg(long, default_value = "today")]
    pub to: String,

    #[arg(long)]
    pub json: bool,
}
