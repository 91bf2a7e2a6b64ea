//! Storage layer for the performance journal.
//!
//! Provides a SQLite-backed [`RecordStore`] using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` can move between threads but cannot be shared without external
//! synchronization. Open one connection per caller instead; the schema
//! constraints below keep concurrent writers honest.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are local wall-clock times stored as TEXT (`2025-03-05T09:30:00`),
//! dates as `2025-03-05`. Lexicographic ordering matches chronological ordering.
//!
//! ## Invariants enforced by SQLite
//!
//! - At most one open session: a partial unique index over rows whose
//!   `end_time` is NULL. A second open insert fails even if the caller's own
//!   check raced with another writer.
//! - No torn sessions: a CHECK constraint requires `end_time`, the outcome
//!   columns and the after-state columns to be all NULL or all set, and ending
//!   a session is a single UPDATE.
//! - One sleep record and one intake record per date (date primary keys,
//!   written with upserts).

use std::fmt;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use icarus_core::{
    AfterState, BeforeState, Intake, Level, Meal, Outcome, Rating, RecordStore, Session,
    SessionContext, SessionEnd, SessionId, Sleep, StoreError, Task, TaskId, WorkType,
};
use rusqlite::{Connection, ErrorCode, Row, params};
use thiserror::Error;
use tracing::debug;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";
const SINGLE_OPEN_INDEX: &str = "idx_sessions_single_open";

const SESSION_COLUMNS: &str = "
    id, created_at, start_time, end_time,
    domain, work_type, project_name, activity_description, planned_duration_min,
    energy_before, stress_before, resistance,
    completion_status, progress_rating, quality_rating, focus_quality,
    moves_main_goal, evidence_note,
    energy_after, stress_after, feel_tag
";

const SLEEP_COLUMNS: &str = "
    date, sleep_start, sleep_end, sleep_quality, awakenings_count,
    energy_morning, mood_morning, screen_last_hour, caffeine_late, bedtime_consistent
";

const TASK_COLUMNS: &str = "
    id, created_at, domain, work_type, project_name, activity_description, planned_duration_min
";

const INTAKE_COLUMNS: &str = "date, water_count, breakfast_time, lunch_time, dinner_time";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored row does not describe a valid record.
    #[error("invalid {table} record {key}: {message}")]
    InvalidRecord {
        table: &'static str,
        key: String,
        message: String,
    },
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        Self::backend(err)
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        debug!(path = %path.display(), "database opened");
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Sessions: one intentional block of work.
            -- end_time, outcome and after-state are NULL while the session is open.
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT,
                domain TEXT NOT NULL,
                work_type TEXT NOT NULL,
                project_name TEXT NOT NULL,
                activity_description TEXT NOT NULL,
                planned_duration_min INTEGER,
                energy_before INTEGER NOT NULL,
                stress_before INTEGER NOT NULL,
                resistance INTEGER NOT NULL,
                completion_status TEXT,
                progress_rating INTEGER,
                quality_rating INTEGER,
                focus_quality INTEGER,
                moves_main_goal INTEGER,
                evidence_note TEXT,
                energy_after INTEGER,
                stress_after INTEGER,
                feel_tag TEXT,
                CHECK (
                    (end_time IS NULL
                        AND completion_status IS NULL AND progress_rating IS NULL
                        AND quality_rating IS NULL AND focus_quality IS NULL
                        AND moves_main_goal IS NULL AND energy_after IS NULL
                        AND stress_after IS NULL AND feel_tag IS NULL)
                    OR
                    (end_time IS NOT NULL
                        AND completion_status IS NOT NULL AND progress_rating IS NOT NULL
                        AND quality_rating IS NOT NULL AND focus_quality IS NOT NULL
                        AND moves_main_goal IS NOT NULL AND energy_after IS NOT NULL
                        AND stress_after IS NOT NULL AND feel_tag IS NOT NULL)
                )
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_start ON sessions(start_time);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_single_open
                ON sessions((end_time IS NULL)) WHERE end_time IS NULL;

            -- Sleep: one row per waking date.
            CREATE TABLE IF NOT EXISTS sleep (
                date TEXT PRIMARY KEY,
                sleep_start TEXT NOT NULL,
                sleep_end TEXT NOT NULL,
                sleep_quality INTEGER NOT NULL,
                awakenings_count INTEGER NOT NULL DEFAULT 0,
                energy_morning INTEGER NOT NULL,
                mood_morning INTEGER NOT NULL,
                screen_last_hour INTEGER,
                caffeine_late INTEGER,
                bedtime_consistent INTEGER
            );

            -- Tasks: queued work that has not started yet.
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                domain TEXT NOT NULL,
                work_type TEXT NOT NULL,
                project_name TEXT NOT NULL,
                activity_description TEXT NOT NULL,
                planned_duration_min INTEGER
            );

            -- Daily intake: one row per date.
            CREATE TABLE IF NOT EXISTS daily_intake (
                date TEXT PRIMARY KEY,
                water_count INTEGER NOT NULL DEFAULT 0,
                breakfast_time TEXT,
                lunch_time TEXT,
                dinner_time TEXT
            );
            ",
        )?;
        Ok(())
    }

    fn query_sessions(
        &self,
        filter: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Session>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions {filter} ORDER BY start_time ASC, id ASC"
        ))?;
        let rows = stmt.query_map(params, SessionRow::from_row)?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?.into_session()?);
        }
        Ok(sessions)
    }

    fn query_sleep(
        &self,
        filter: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Sleep>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SLEEP_COLUMNS} FROM sleep {filter} ORDER BY date ASC"
        ))?;
        let rows = stmt.query_map(params, SleepRow::from_row)?;
        let mut nights = Vec::new();
        for row in rows {
            nights.push(row?.into_sleep()?);
        }
        Ok(nights)
    }

    fn query_tasks(
        &self,
        filter: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Task>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks {filter} ORDER BY created_at ASC, id ASC"
        ))?;
        let rows = stmt.query_map(params, TaskRow::from_row)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?.into_task()?);
        }
        Ok(tasks)
    }

    fn query_intake(
        &self,
        filter: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Intake>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {INTAKE_COLUMNS} FROM daily_intake {filter} ORDER BY date ASC"
        ))?;
        let rows = stmt.query_map(params, IntakeRow::from_row)?;
        let mut days = Vec::new();
        for row in rows {
            days.push(row?.into_intake()?);
        }
        Ok(days)
    }
}

impl RecordStore for Database {
    fn insert_session(&mut self, session: &Session) -> Result<(), StoreError> {
        insert_session(&self.conn, session)
    }

    fn get_session(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        Ok(self
            .query_sessions("WHERE id = ?", [id.as_str()])?
            .into_iter()
            .next())
    }

    fn active_session(&self) -> Result<Option<Session>, StoreError> {
        Ok(self
            .query_sessions("WHERE end_time IS NULL", [])?
            .into_iter()
            .next())
    }

    fn finish_session(&mut self, id: &SessionId, end: &SessionEnd) -> Result<(), StoreError> {
        let outcome = &end.outcome;
        let updated = self
            .conn
            .execute(
                "
                UPDATE sessions SET
                    end_time = ?,
                    completion_status = ?,
                    progress_rating = ?,
                    quality_rating = ?,
                    focus_quality = ?,
                    moves_main_goal = ?,
                    evidence_note = ?,
                    energy_after = ?,
                    stress_after = ?,
                    feel_tag = ?
                WHERE id = ? AND end_time IS NULL
                ",
                params![
                    format_timestamp(end.end_time),
                    outcome.completion_status.label(),
                    outcome.progress_rating.get(),
                    outcome.quality_rating.get(),
                    outcome.focus_quality.get(),
                    outcome.moves_main_goal,
                    outcome.evidence_note,
                    end.after.energy.get(),
                    end.after.stress.get(),
                    end.after.feel_tag,
                    id.as_str(),
                ],
            )
            .map_err(DbError::from)?;
        if updated == 0 {
            return Err(StoreError::Missing { id: id.to_string() });
        }
        debug!(%id, "session row finished");
        Ok(())
    }

    fn set_work_type(&mut self, id: &SessionId, work_type: WorkType) -> Result<(), StoreError> {
        let updated = self
            .conn
            .execute(
                "UPDATE sessions SET work_type = ? WHERE id = ?",
                params![work_type.label(), id.as_str()],
            )
            .map_err(DbError::from)?;
        if updated == 0 {
            return Err(StoreError::Missing { id: id.to_string() });
        }
        Ok(())
    }

    fn delete_session(&mut self, id: &SessionId) -> Result<bool, StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM sessions WHERE id = ?", [id.as_str()])
            .map_err(DbError::from)?;
        Ok(deleted > 0)
    }

    fn sessions_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Session>, StoreError> {
        Ok(self.query_sessions(
            "WHERE start_time >= ? AND start_time <= ?",
            [format!("{start}T00:00:00"), format!("{end}T23:59:59")],
        )?)
    }

    fn recent_sessions(&self, limit: usize) -> Result<Vec<Session>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut sessions = self.query_sessions(
            "WHERE id IN (SELECT id FROM sessions ORDER BY start_time DESC, id DESC LIMIT ?)",
            [limit],
        )?;
        sessions.reverse();
        Ok(sessions)
    }

    fn upsert_sleep(&mut self, sleep: &Sleep) -> Result<(), StoreError> {
        self.conn
            .execute(
                &format!(
                    "
                    INSERT INTO sleep ({SLEEP_COLUMNS})
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    ON CONFLICT(date) DO UPDATE SET
                        sleep_start = excluded.sleep_start,
                        sleep_end = excluded.sleep_end,
                        sleep_quality = excluded.sleep_quality,
                        awakenings_count = excluded.awakenings_count,
                        energy_morning = excluded.energy_morning,
                        mood_morning = excluded.mood_morning,
                        screen_last_hour = excluded.screen_last_hour,
                        caffeine_late = excluded.caffeine_late,
                        bedtime_consistent = excluded.bedtime_consistent
                    "
                ),
                params![
                    sleep.date.to_string(),
                    format_timestamp(sleep.sleep_start),
                    format_timestamp(sleep.sleep_end),
                    sleep.sleep_quality.get(),
                    sleep.awakenings_count,
                    sleep.energy_morning.get(),
                    sleep.mood_morning.get(),
                    sleep.screen_last_hour,
                    sleep.caffeine_late,
                    sleep.bedtime_consistent,
                ],
            )
            .map_err(DbError::from)?;
        debug!(date = %sleep.date, "sleep row upserted");
        Ok(())
    }

    fn sleep_on(&self, date: NaiveDate) -> Result<Option<Sleep>, StoreError> {
        Ok(self
            .query_sleep("WHERE date = ?", [date.to_string()])?
            .into_iter()
            .next())
    }

    fn sleep_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Sleep>, StoreError> {
        Ok(self.query_sleep(
            "WHERE date >= ? AND date <= ?",
            [start.to_string(), end.to_string()],
        )?)
    }

    fn insert_task(&mut self, task: &Task) -> Result<(), StoreError> {
        let ctx = &task.context;
        self.conn
            .execute(
                &format!("INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)"),
                params![
                    task.id.as_str(),
                    format_timestamp(task.created_at),
                    ctx.domain.label(),
                    ctx.work_type.label(),
                    ctx.project_name,
                    ctx.activity_description,
                    ctx.planned_duration_min,
                ],
            )
            .map_err(DbError::from)?;
        Ok(())
    }

    fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self
            .query_tasks("WHERE id = ?", [id.as_str()])?
            .into_iter()
            .next())
    }

    fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.query_tasks("", [])?)
    }

    fn update_task(&mut self, id: &TaskId, context: &SessionContext) -> Result<(), StoreError> {
        let updated = self
            .conn
            .execute(
                "
                UPDATE tasks SET
                    domain = ?,
                    work_type = ?,
                    project_name = ?,
                    activity_description = ?,
                    planned_duration_min = ?
                WHERE id = ?
                ",
                params![
                    context.domain.label(),
                    context.work_type.label(),
                    context.project_name,
                    context.activity_description,
                    context.planned_duration_min,
                    id.as_str(),
                ],
            )
            .map_err(DbError::from)?;
        if updated == 0 {
            return Err(StoreError::Missing { id: id.to_string() });
        }
        Ok(())
    }

    fn delete_task(&mut self, id: &TaskId) -> Result<bool, StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?", [id.as_str()])
            .map_err(DbError::from)?;
        Ok(deleted > 0)
    }

    fn promote_task(&mut self, id: &TaskId, session: &Session) -> Result<(), StoreError> {
        let tx = self.conn.transaction().map_err(DbError::from)?;
        let deleted = tx
            .execute("DELETE FROM tasks WHERE id = ?", [id.as_str()])
            .map_err(DbError::from)?;
        if deleted == 0 {
            return Err(StoreError::Missing { id: id.to_string() });
        }
        insert_session(&tx, session)?;
        tx.commit().map_err(DbError::from)?;
        debug!(task = %id, session = %session.id, "task promoted");
        Ok(())
    }

    fn intake_on(&self, date: NaiveDate) -> Result<Option<Intake>, StoreError> {
        Ok(self
            .query_intake("WHERE date = ?", [date.to_string()])?
            .into_iter()
            .next())
    }

    fn intake_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Intake>, StoreError> {
        Ok(self.query_intake(
            "WHERE date >= ? AND date <= ?",
            [start.to_string(), end.to_string()],
        )?)
    }

    fn add_water(&mut self, date: NaiveDate) -> Result<Intake, StoreError> {
        self.conn
            .execute(
                "
                INSERT INTO daily_intake (date, water_count) VALUES (?, 1)
                ON CONFLICT(date) DO UPDATE SET water_count = water_count + 1
                ",
                [date.to_string()],
            )
            .map_err(DbError::from)?;
        self.intake_or_empty(date)
    }

    fn log_meal(
        &mut self,
        date: NaiveDate,
        meal: Meal,
        at: NaiveDateTime,
    ) -> Result<Intake, StoreError> {
        let column = meal_column(meal);
        self.conn
            .execute(
                &format!(
                    "
                    INSERT INTO daily_intake (date, {column}) VALUES (?, ?)
                    ON CONFLICT(date) DO UPDATE SET {column} = excluded.{column}
                    "
                ),
                [date.to_string(), format_timestamp(at)],
            )
            .map_err(DbError::from)?;
        self.intake_or_empty(date)
    }
}

impl Database {
    fn intake_or_empty(&self, date: NaiveDate) -> Result<Intake, StoreError> {
        Ok(self
            .intake_on(date)?
            .unwrap_or_else(|| Intake::empty(date)))
    }
}

/// Inserts a session row, reporting a tripped single-open index as
/// [`StoreError::OpenSessionExists`].
fn insert_session(conn: &Connection, session: &Session) -> Result<(), StoreError> {
    let ctx = &session.context;
    let end = session.end.as_ref();
    let outcome = session.outcome();
    let after = session.after();
    let result = conn.execute(
        &format!(
            "INSERT INTO sessions ({SESSION_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ),
        params![
            session.id.as_str(),
            format_timestamp(session.created_at),
            format_timestamp(session.start_time),
            end.map(|end| format_timestamp(end.end_time)),
            ctx.domain.label(),
            ctx.work_type.label(),
            ctx.project_name,
            ctx.activity_description,
            ctx.planned_duration_min,
            session.before.energy.get(),
            session.before.stress.get(),
            session.before.resistance.get(),
            outcome.map(|o| o.completion_status.label()),
            outcome.map(|o| o.progress_rating.get()),
            outcome.map(|o| o.quality_rating.get()),
            outcome.map(|o| o.focus_quality.get()),
            outcome.map(|o| o.moves_main_goal),
            outcome.and_then(|o| o.evidence_note.as_deref()),
            after.map(|a| a.energy.get()),
            after.map(|a| a.stress.get()),
            after.map(|a| a.feel_tag.as_str()),
        ],
    );
    match result {
        Ok(_) => Ok(()),
        Err(err) if is_single_open_violation(&err) => Err(StoreError::OpenSessionExists),
        Err(err) => Err(DbError::from(err).into()),
    }
}

fn is_single_open_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, Some(message))
            if failure.code == ErrorCode::ConstraintViolation
                && message.contains(SINGLE_OPEN_INDEX)
    )
}

const fn meal_column(meal: Meal) -> &'static str {
    match meal {
        Meal::Breakfast => "breakfast_time",
        Meal::Lunch => "lunch_time",
        Meal::Dinner => "dinner_time",
    }
}

fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Converts row-level parse failures into [`DbError::InvalidRecord`].
struct RowContext {
    table: &'static str,
    key: String,
}

impl RowContext {
    fn new(table: &'static str, key: &str) -> Self {
        Self {
            table,
            key: key.to_string(),
        }
    }

    fn invalid(&self, message: impl fmt::Display) -> DbError {
        DbError::InvalidRecord {
            table: self.table,
            key: self.key.clone(),
            message: message.to_string(),
        }
    }

    fn timestamp(&self, value: &str) -> Result<NaiveDateTime, DbError> {
        NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
            .map_err(|err| self.invalid(format!("timestamp {value:?}: {err}")))
    }

    fn date(&self, value: &str) -> Result<NaiveDate, DbError> {
        NaiveDate::parse_from_str(value, DATE_FORMAT)
            .map_err(|err| self.invalid(format!("date {value:?}: {err}")))
    }

    fn parse<T>(&self, value: &str) -> Result<T, DbError>
    where
        T: std::str::FromStr,
        T::Err: fmt::Display,
    {
        value.parse().map_err(|err| self.invalid(err))
    }

    fn level(&self, value: u8) -> Result<Level, DbError> {
        Level::new(value).map_err(|err| self.invalid(err))
    }

    fn rating(&self, value: u8) -> Result<Rating, DbError> {
        Rating::new(value).map_err(|err| self.invalid(err))
    }

    fn required<T>(&self, value: Option<T>, column: &str) -> Result<T, DbError> {
        value.ok_or_else(|| self.invalid(format!("ended session is missing {column}")))
    }

    fn context(&self, row: ContextColumns) -> Result<SessionContext, DbError> {
        Ok(SessionContext {
            domain: self.parse(&row.domain)?,
            work_type: self.parse(&row.work_type)?,
            project_name: row.project_name,
            activity_description: row.activity_description,
            planned_duration_min: row.planned_duration_min,
        })
    }
}

/// Context columns shared by the sessions and tasks tables.
struct ContextColumns {
    domain: String,
    work_type: String,
    project_name: String,
    activity_description: String,
    planned_duration_min: Option<u32>,
}

struct SessionRow {
    id: String,
    created_at: String,
    start_time: String,
    end_time: Option<String>,
    context: ContextColumns,
    energy_before: u8,
    stress_before: u8,
    resistance: u8,
    completion_status: Option<String>,
    progress_rating: Option<u8>,
    quality_rating: Option<u8>,
    focus_quality: Option<u8>,
    moves_main_goal: Option<bool>,
    evidence_note: Option<String>,
    energy_after: Option<u8>,
    stress_after: Option<u8>,
    feel_tag: Option<String>,
}

impl SessionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            created_at: row.get(1)?,
            start_time: row.get(2)?,
            end_time: row.get(3)?,
            context: ContextColumns {
                domain: row.get(4)?,
                work_type: row.get(5)?,
                project_name: row.get(6)?,
                activity_description: row.get(7)?,
                planned_duration_min: row.get(8)?,
            },
            energy_before: row.get(9)?,
            stress_before: row.get(10)?,
            resistance: row.get(11)?,
            completion_status: row.get(12)?,
            progress_rating: row.get(13)?,
            quality_rating: row.get(14)?,
            focus_quality: row.get(15)?,
            moves_main_goal: row.get(16)?,
            evidence_note: row.get(17)?,
            energy_after: row.get(18)?,
            stress_after: row.get(19)?,
            feel_tag: row.get(20)?,
        })
    }

    fn into_session(self) -> Result<Session, DbError> {
        let cx = RowContext::new("sessions", &self.id);

        let end = match self.end_time {
            None => None,
            Some(end_time) => {
                let status = cx.required(self.completion_status, "completion_status")?;
                Some(SessionEnd {
                    end_time: cx.timestamp(&end_time)?,
                    outcome: Outcome {
                        completion_status: cx.parse(&status)?,
                        progress_rating: cx
                            .rating(cx.required(self.progress_rating, "progress_rating")?)?,
                        quality_rating: cx
                            .rating(cx.required(self.quality_rating, "quality_rating")?)?,
                        focus_quality: cx
                            .rating(cx.required(self.focus_quality, "focus_quality")?)?,
                        moves_main_goal: cx.required(self.moves_main_goal, "moves_main_goal")?,
                        evidence_note: self.evidence_note,
                    },
                    after: AfterState {
                        energy: cx.level(cx.required(self.energy_after, "energy_after")?)?,
                        stress: cx.level(cx.required(self.stress_after, "stress_after")?)?,
                        feel_tag: cx.required(self.feel_tag, "feel_tag")?,
                    },
                })
            }
        };

        Ok(Session {
            id: cx.parse(&self.id)?,
            created_at: cx.timestamp(&self.created_at)?,
            start_time: cx.timestamp(&self.start_time)?,
            context: cx.context(self.context)?,
            before: BeforeState {
                energy: cx.level(self.energy_before)?,
                stress: cx.level(self.stress_before)?,
                resistance: cx.rating(self.resistance)?,
            },
            end,
        })
    }
}

struct SleepRow {
    date: String,
    sleep_start: String,
    sleep_end: String,
    sleep_quality: u8,
    awakenings_count: u32,
    energy_morning: u8,
    mood_morning: u8,
    screen_last_hour: Option<bool>,
    caffeine_late: Option<bool>,
    bedtime_consistent: Option<bool>,
}

impl SleepRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            date: row.get(0)?,
            sleep_start: row.get(1)?,
            sleep_end: row.get(2)?,
            sleep_quality: row.get(3)?,
            awakenings_count: row.get(4)?,
            energy_morning: row.get(5)?,
            mood_morning: row.get(6)?,
            screen_last_hour: row.get(7)?,
            caffeine_late: row.get(8)?,
            bedtime_consistent: row.get(9)?,
        })
    }

    fn into_sleep(self) -> Result<Sleep, DbError> {
        let cx = RowContext::new("sleep", &self.date);
        Ok(Sleep {
            date: cx.date(&self.date)?,
            sleep_start: cx.timestamp(&self.sleep_start)?,
            sleep_end: cx.timestamp(&self.sleep_end)?,
            sleep_quality: cx.rating(self.sleep_quality)?,
            awakenings_count: self.awakenings_count,
            energy_morning: cx.level(self.energy_morning)?,
            mood_morning: cx.level(self.mood_morning)?,
            screen_last_hour: self.screen_last_hour,
            caffeine_late: self.caffeine_late,
            bedtime_consistent: self.bedtime_consistent,
        })
    }
}

struct TaskRow {
    id: String,
    created_at: String,
    context: ContextColumns,
}

impl TaskRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            created_at: row.get(1)?,
            context: ContextColumns {
                domain: row.get(2)?,
                work_type: row.get(3)?,
                project_name: row.get(4)?,
                activity_description: row.get(5)?,
                planned_duration_min: row.get(6)?,
            },
        })
    }

    fn into_task(self) -> Result<Task, DbError> {
        let cx = RowContext::new("tasks", &self.id);
        Ok(Task {
            id: cx.parse(&self.id)?,
            created_at: cx.timestamp(&self.created_at)?,
            context: cx.context(self.context)?,
        })
    }
}

struct IntakeRow {
    date: String,
    water_count: u32,
    breakfast_time: Option<String>,
    lunch_time: Option<String>,
    dinner_time: Option<String>,
}

impl IntakeRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            date: row.get(0)?,
            water_count: row.get(1)?,
            breakfast_time: row.get(2)?,
            lunch_time: row.get(3)?,
            dinner_time: row.get(4)?,
        })
    }

    fn into_intake(self) -> Result<Intake, DbError> {
        let cx = RowContext::new("daily_intake", &self.date);
        let meal = |value: Option<String>| value.map(|v| cx.timestamp(&v)).transpose();
        Ok(Intake {
            date: cx.date(&self.date)?,
            water_count: self.water_count,
            breakfast_time: meal(self.breakfast_time)?,
            lunch_time: meal(self.lunch_time)?,
            dinner_time: meal(self.dinner_time)?,
        })
    }
}
