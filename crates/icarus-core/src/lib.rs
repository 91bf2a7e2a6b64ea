//! Core domain logic for the performance journal.
//!
//! This crate contains:
//! - Records: sessions, sleep, queued tasks and daily intake, with validated
//!   rating scales and labelled categories
//! - The [`RecordStore`] seam and an in-memory implementation
//! - Session lifecycle: start, end, correct, delete, task activation
//! - Scoring: per-session score, daily performance index, intake bonus,
//!   system load
//! - Aggregation: day/week/range summaries, chronotype and calendar
//!   heatmaps, energy ledger, sleep-vs-deep-work series, session patterns
//! - Work-type suggestion from activity descriptions

pub mod analytics;
pub mod category;
pub mod dates;
pub mod heatmap;
pub mod journal;
mod ledger;
pub mod lifecycle;
pub mod patterns;
pub mod record;
pub mod scoring;
pub mod store;
pub mod suggest;
pub mod summary;
pub mod types;

pub use analytics::Analytics;
pub use category::{CompletionStatus, Domain, Meal, WorkType};
pub use dates::{DateRange, local_now, local_today};
pub use heatmap::{CalendarCell, CalendarGrid, CalendarMetric};
pub use journal::{Journal, JournalView};
pub use ledger::energy_ledger;
pub use lifecycle::{CompletedSession, EngineError, SessionManager};
pub use patterns::{Pattern, PatternPolicy};
pub use record::{
    AfterState, BeforeState, Intake, Outcome, Session, SessionContext, SessionEnd, Sleep, Task,
};
pub use scoring::{DailyIndex, ScoreCard, session_score};
pub use store::{MemoryStore, RecordStore, StoreError};
pub use suggest::{Confidence, KeywordSuggester, Suggestion, WorkTypeSuggester};
pub use summary::{DaySummary, PeriodSummary, SessionTotals, SleepDeepPoint};
pub use types::{Level, Rating, SessionId, TaskId, ValidationError};
