//! The record store seam.
//!
//! The engine reads and writes journal records only through [`RecordStore`].
//! Every write method is a single atomic operation against the store; in
//! particular [`RecordStore::finish_session`] attaches the end time, outcome
//! and after-state together so readers never observe a half-ended session.
//!
//! The at-most-one-active-session rule is a uniqueness invariant of the
//! store itself: [`RecordStore::insert_session`] must refuse a second open
//! session with [`StoreError::OpenSessionExists`] even if the caller's own
//! precondition check raced with another writer.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::category::{Meal, WorkType};
use crate::record::{Intake, Session, SessionContext, SessionEnd, Sleep, Task};
use crate::types::{SessionId, TaskId};

/// Errors raised by a record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Inserting this session would create a second open session.
    #[error("another session is already active")]
    OpenSessionExists,

    /// The referenced record disappeared between read and write.
    #[error("record {id} not found")]
    Missing { id: String },

    /// Failure in the storage backend.
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps any backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// Durable storage for sessions, sleep, tasks and intake.
///
/// Date-range reads are inclusive on both ends and return records ordered by
/// their start time (sessions) or date (sleep).
pub trait RecordStore {
    // ---- sessions ----

    /// Inserts a new session. Fails with [`StoreError::OpenSessionExists`] if
    /// `session` is open and another open session is already stored.
    fn insert_session(&mut self, session: &Session) -> Result<(), StoreError>;

    fn get_session(&self, id: &SessionId) -> Result<Option<Session>, StoreError>;

    /// The open session, if any.
    fn active_session(&self) -> Result<Option<Session>, StoreError>;

    /// Atomically attaches `end` to the session with `id`.
    fn finish_session(&mut self, id: &SessionId, end: &SessionEnd) -> Result<(), StoreError>;

    /// Overwrites the work type of a stored session.
    fn set_work_type(&mut self, id: &SessionId, work_type: WorkType) -> Result<(), StoreError>;

    /// Hard delete. Returns whether a record was removed.
    fn delete_session(&mut self, id: &SessionId) -> Result<bool, StoreError>;

    /// Sessions whose start date lies in `start..=end`.
    fn sessions_between(&self, start: NaiveDate, end: NaiveDate)
    -> Result<Vec<Session>, StoreError>;

    /// Sessions started on `date`.
    fn sessions_on(&self, date: NaiveDate) -> Result<Vec<Session>, StoreError> {
        self.sessions_between(date, date)
    }

    /// The `limit` most recently started sessions, newest first.
    fn recent_sessions(&self, limit: usize) -> Result<Vec<Session>, StoreError>;

    // ---- sleep ----

    /// Inserts or replaces the sleep record for `sleep.date`.
    fn upsert_sleep(&mut self, sleep: &Sleep) -> Result<(), StoreError>;

    fn sleep_on(&self, date: NaiveDate) -> Result<Option<Sleep>, StoreError>;

    fn sleep_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Sleep>, StoreError>;

    // ---- tasks ----

    fn insert_task(&mut self, task: &Task) -> Result<(), StoreError>;

    fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError>;

    /// All queued tasks, oldest first.
    fn list_tasks(&self) -> Result<Vec<Task>, StoreError>;

    /// Replaces the context of a queued task.
    fn update_task(&mut self, id: &TaskId, context: &SessionContext) -> Result<(), StoreError>;

    fn delete_task(&mut self, id: &TaskId) -> Result<bool, StoreError>;

    /// Atomically inserts `session` and deletes the task it came from.
    fn promote_task(&mut self, id: &TaskId, session: &Session) -> Result<(), StoreError>;

    // ---- intake ----

    fn intake_on(&self, date: NaiveDate) -> Result<Option<Intake>, StoreError>;

    fn intake_between(&self, start: NaiveDate, end: NaiveDate)
    -> Result<Vec<Intake>, StoreError>;

    /// Increments the water counter for `date`, creating the record if needed.
    fn add_water(&mut self, date: NaiveDate) -> Result<Intake, StoreError>;

    /// Sets a meal timestamp for `date`, creating the record if needed.
    fn log_meal(
        &mut self,
        date: NaiveDate,
        meal: Meal,
        at: NaiveDateTime,
    ) -> Result<Intake, StoreError>;
}

/// A [`RecordStore`] held entirely in memory.
///
/// Used by tests and by embedders that persist elsewhere.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    sessions: BTreeMap<SessionId, Session>,
    sleep: BTreeMap<NaiveDate, Sleep>,
    tasks: BTreeMap<TaskId, Task>,
    intake: BTreeMap<NaiveDate, Intake>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn session_mut(&mut self, id: &SessionId) -> Result<&mut Session, StoreError> {
        self.sessions.get_mut(id).ok_or_else(|| StoreError::Missing {
            id: id.to_string(),
        })
    }
}

impl RecordStore for MemoryStore {
    fn insert_session(&mut self, session: &Session) -> Result<(), StoreError> {
        if session.is_active() && self.sessions.values().any(Session::is_active) {
            return Err(StoreError::OpenSessionExists);
        }
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    fn get_session(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.get(id).cloned())
    }

    fn active_session(&self) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.values().find(|s| s.is_active()).cloned())
    }

    fn finish_session(&mut self, id: &SessionId, end: &SessionEnd) -> Result<(), StoreError> {
        self.session_mut(id)?.end = Some(end.clone());
        Ok(())
    }

    fn set_work_type(&mut self, id: &SessionId, work_type: WorkType) -> Result<(), StoreError> {
        self.session_mut(id)?.context.work_type = work_type;
        Ok(())
    }

    fn delete_session(&mut self, id: &SessionId) -> Result<bool, StoreError> {
        Ok(self.sessions.remove(id).is_some())
    }

    fn sessions_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Session>, StoreError> {
        let mut sessions: Vec<Session> = self
            .sessions
            .values()
            .filter(|s| (start..=end).contains(&s.date()))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
        Ok(sessions)
    }

    fn recent_sessions(&self, limit: usize) -> Result<Vec<Session>, StoreError> {
        let mut sessions: Vec<Session> = self.sessions.values().cloned().collect();
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time).then_with(|| b.id.cmp(&a.id)));
        sessions.truncate(limit);
        Ok(sessions)
    }

    fn upsert_sleep(&mut self, sleep: &Sleep) -> Result<(), StoreError> {
        self.sleep.insert(sleep.date, sleep.clone());
        Ok(())
    }

    fn sleep_on(&self, date: NaiveDate) -> Result<Option<Sleep>, StoreError> {
        Ok(self.sleep.get(&date).cloned())
    }

    fn sleep_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Sleep>, StoreError> {
        if end < start {
            return Ok(Vec::new());
        }
        Ok(self.sleep.range(start..=end).map(|(_, s)| s.clone()).collect())
    }

    fn insert_task(&mut self, task: &Task) -> Result<(), StoreError> {
        self.tasks.insert(task.id.clone(), task.clone());
        Ok(())
    }

    fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.get(id).cloned())
    }

    fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self.tasks.values().cloned().collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(tasks)
    }

    fn update_task(&mut self, id: &TaskId, context: &SessionContext) -> Result<(), StoreError> {
        let task = self.tasks.get_mut(id).ok_or_else(|| StoreError::Missing {
            id: id.to_string(),
        })?;
        task.context = context.clone();
        Ok(())
    }

    fn delete_task(&mut self, id: &TaskId) -> Result<bool, StoreError> {
        Ok(self.tasks.remove(id).is_some())
    }

    fn promote_task(&mut self, id: &TaskId, session: &Session) -> Result<(), StoreError> {
        if !self.tasks.contains_key(id) {
            return Err(StoreError::Missing { id: id.to_string() });
        }
        self.insert_session(session)?;
        self.tasks.remove(id);
        Ok(())
    }

    fn intake_on(&self, date: NaiveDate) -> Result<Option<Intake>, StoreError> {
        Ok(self.intake.get(&date).cloned())
    }

    fn intake_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Intake>, StoreError> {
        if end < start {
            return Ok(Vec::new());
        }
        Ok(self.intake.range(start..=end).map(|(_, i)| i.clone()).collect())
    }

    fn add_water(&mut self, date: NaiveDate) -> Result<Intake, StoreError> {
        let intake = self
            .intake
            .entry(date)
            .or_insert_with(|| Intake::empty(date));
        intake.water_count += 1;
        Ok(intake.clone())
    }

    fn log_meal(
        &mut self,
        date: NaiveDate,
        meal: Meal,
        at: NaiveDateTime,
    ) -> Result<Intake, StoreError> {
        let intake = self
            .intake
            .entry(date)
            .or_insert_with(|| Intake::empty(date));
        intake.set_meal_time(meal, at);
        Ok(intake.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::*;

    #[test]
    fn refuses_second_open_session() {
        let mut store = MemoryStore::new();
        store.insert_session(&active(at(3, 9, 0), WorkType::Deep)).unwrap();
        let err = store
            .insert_session(&active(at(3, 10, 0), WorkType::Deep))
            .unwrap_err();
        assert!(matches!(err, StoreError::OpenSessionExists));
        assert_eq!(store.sessions_on(day(3)).unwrap().len(), 1);
    }

    #[test]
    fn ended_sessions_do_not_occupy_the_open_slot() {
        let mut store = MemoryStore::new();
        let done = rated(at(3, 8, 0), 30, crate::Domain::Work, WorkType::Deep, (3, 3, 3));
        store.insert_session(&done).unwrap();
        store.insert_session(&active(at(3, 9, 0), WorkType::Deep)).unwrap();
        assert!(store.active_session().unwrap().is_some());
    }

    #[test]
    fn sessions_between_is_inclusive_and_ordered() {
        let mut store = MemoryStore::new();
        let late = rated(at(5, 15, 0), 30, crate::Domain::Work, WorkType::Deep, (3, 3, 3));
        let early = rated(at(3, 8, 0), 30, crate::Domain::Work, WorkType::Deep, (3, 3, 3));
        let outside = rated(at(6, 8, 0), 30, crate::Domain::Work, WorkType::Deep, (3, 3, 3));
        for s in [&late, &early, &outside] {
            store.insert_session(s).unwrap();
        }
        let found = store.sessions_between(day(3), day(5)).unwrap();
        assert_eq!(found, vec![early.clone(), late.clone()]);

        assert_eq!(store.recent_sessions(2).unwrap(), vec![outside, late]);
        assert_eq!(store.recent_sessions(10).unwrap().len(), 3);
        assert!(store.recent_sessions(0).unwrap().is_empty());
    }

    #[test]
    fn sleep_upsert_replaces_by_date() {
        let mut store = MemoryStore::new();
        store.upsert_sleep(&sleep(day(4), 400, 3)).unwrap();
        store.upsert_sleep(&sleep(day(4), 480, 5)).unwrap();
        let stored = store.sleep_on(day(4)).unwrap().unwrap();
        assert_eq!(stored.duration_minutes(), 480);
        assert_eq!(store.sleep_between(day(1), day(30)).unwrap().len(), 1);
    }

    #[test]
    fn intake_upserts_accumulate() {
        let mut store = MemoryStore::new();
        store.add_water(day(5)).unwrap();
        store.add_water(day(5)).unwrap();
        let intake = store.log_meal(day(5), Meal::Breakfast, at(5, 8, 0)).unwrap();
        assert_eq!(intake.water_count, 2);
        assert_eq!(intake.meals_logged(), 1);
        assert_eq!(store.intake_on(day(6)).unwrap(), None);
    }
}
