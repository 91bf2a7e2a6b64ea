//! Session lifecycle: Idle → Active → Idle.
//!
//! [`SessionManager`] is the only writer of session and task records. It
//! enforces the start/end state machine and surfaces the single-open-session
//! rule as [`EngineError::Conflict`]. The precondition check in `start` gives a
//! friendly error naming the open session; the store's own uniqueness
//! constraint closes the check-then-act race.
//!
//! Carrying the previous session's after-state into the next before-state is
//! left to callers.

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::{debug, info};

use crate::category::WorkType;
use crate::dates::local_now;
use crate::record::{
    AfterState, BeforeState, MAX_SESSION_MINUTES, MIN_LOGGED_SESSION_MINUTES, Outcome, Session,
    SessionContext, SessionEnd, Task,
};
use crate::store::{RecordStore, StoreError};
use crate::types::{SessionId, TaskId, ValidationError};

/// Errors returned by lifecycle and journal operations.
///
/// Every variant leaves stored state unchanged.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The operation would create a second active session.
    #[error("a session is already active{}", describe_active(.active))]
    Conflict { active: Option<SessionId> },

    /// The referenced record does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// The record is in the wrong lifecycle state for this operation.
    #[error("session {id} {reason}")]
    InvalidState { id: SessionId, reason: &'static str },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OpenSessionExists => Self::Conflict { active: None },
            StoreError::Missing { id } => Self::NotFound { kind: "record", id },
            other => Self::Store(other),
        }
    }
}

/// A completed session recorded after the fact.
#[derive(Debug, Clone)]
pub struct CompletedSession {
    pub context: SessionContext,
    pub before: BeforeState,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub outcome: Outcome,
    pub after: AfterState,
}

/// Start/end/correct/delete operations over a borrowed record store.
pub struct SessionManager<'s, S: ?Sized> {
    store: &'s mut S,
}

impl<'s, S: RecordStore + ?Sized> SessionManager<'s, S> {
    pub const fn new(store: &'s mut S) -> Self {
        Self { store }
    }

    /// The currently open session, if any.
    pub fn active_session(&self) -> Result<Option<Session>, EngineError> {
        Ok(self.store.active_session()?)
    }

    pub fn get_session(&self, id: &SessionId) -> Result<Session, EngineError> {
        self.store
            .get_session(id)?
            .ok_or_else(|| not_found("session", id))
    }

    /// Starts a session now.
    pub fn start(
        &mut self,
        context: SessionContext,
        before: BeforeState,
    ) -> Result<Session, EngineError> {
        self.start_at(context, before, local_now())
    }

    /// Starts a session at `now`.
    pub fn start_at(
        &mut self,
        context: SessionContext,
        before: BeforeState,
        now: NaiveDateTime,
    ) -> Result<Session, EngineError> {
        let context = context.normalized()?;
        if let Some(open) = self.store.active_session()? {
            return Err(EngineError::Conflict {
                active: Some(open.id),
            });
        }

        let session = new_session(context, before, now);
        self.store.insert_session(&session)?;
        info!(id = %session.id, project = %session.context.project_name, "session started");
        Ok(session)
    }

    /// Ends the session with `id` now.
    pub fn end(
        &mut self,
        id: &SessionId,
        outcome: Outcome,
        after: AfterState,
    ) -> Result<Session, EngineError> {
        self.end_at(id, outcome, after, local_now())
    }

    /// Ends the session with `id` at `now`, attaching outcome and after-state.
    ///
    /// Unlike [`Self::log_completed_at`] there is no length check: a live
    /// session can always be closed, however short or long it ran.
    pub fn end_at(
        &mut self,
        id: &SessionId,
        outcome: Outcome,
        after: AfterState,
        now: NaiveDateTime,
    ) -> Result<Session, EngineError> {
        let mut session = self.get_session(id)?;
        if !session.is_active() {
            return Err(EngineError::InvalidState {
                id: id.clone(),
                reason: "is already ended",
            });
        }

        let end = SessionEnd {
            end_time: now.max(session.start_time),
            outcome: outcome.normalized(),
            after: after.normalized()?,
        };
        self.store.finish_session(id, &end)?;
        session.end = Some(end);
        info!(
            id = %session.id,
            minutes = session.duration_minutes().unwrap_or_default(),
            "session ended"
        );
        Ok(session)
    }

    /// Overwrites the work type of an ended session. Nothing else changes.
    pub fn correct_work_type(
        &mut self,
        id: &SessionId,
        work_type: WorkType,
    ) -> Result<Session, EngineError> {
        let mut session = self.get_session(id)?;
        if session.is_active() {
            return Err(EngineError::InvalidState {
                id: id.clone(),
                reason: "is still active; work type can only be corrected after it ends",
            });
        }
        self.store.set_work_type(id, work_type)?;
        debug!(%id, from = %session.context.work_type, to = %work_type, "work type corrected");
        session.context.work_type = work_type;
        Ok(session)
    }

    /// Hard-deletes a session. Deleting the active session returns to Idle;
    /// deleting an unknown id is a no-op.
    pub fn delete(&mut self, id: &SessionId) -> Result<(), EngineError> {
        let removed = self.store.delete_session(id)?;
        debug!(%id, removed, "session delete");
        Ok(())
    }

    /// Records a session that already happened. It never occupies the
    /// active slot.
    pub fn log_completed(&mut self, completed: CompletedSession) -> Result<Session, EngineError> {
        self.log_completed_at(completed, local_now())
    }

    pub fn log_completed_at(
        &mut self,
        completed: CompletedSession,
        now: NaiveDateTime,
    ) -> Result<Session, EngineError> {
        let context = completed.context.normalized()?;
        if completed.end_time <= completed.start_time {
            return Err(ValidationError::EndBeforeStart { what: "session" }.into());
        }
        let minutes = (completed.end_time - completed.start_time).num_minutes();
        if !(MIN_LOGGED_SESSION_MINUTES..=MAX_SESSION_MINUTES).contains(&minutes) {
            return Err(ValidationError::ImplausibleDuration {
                what: "session",
                minutes,
                min: MIN_LOGGED_SESSION_MINUTES,
                max: MAX_SESSION_MINUTES,
            }
            .into());
        }

        let session = Session {
            id: SessionId::generate(),
            created_at: now,
            start_time: completed.start_time,
            context,
            before: completed.before,
            end: Some(SessionEnd {
                end_time: completed.end_time,
                outcome: completed.outcome.normalized(),
                after: completed.after.normalized()?,
            }),
        };
        self.store.insert_session(&session)?;
        info!(id = %session.id, minutes, "completed session logged");
        Ok(session)
    }

    // ---- task queue ----

    pub fn create_task(&mut self, context: SessionContext) -> Result<Task, EngineError> {
        self.create_task_at(context, local_now())
    }

    pub fn create_task_at(
        &mut self,
        context: SessionContext,
        now: NaiveDateTime,
    ) -> Result<Task, EngineError> {
        let task = Task {
            id: TaskId::generate(),
            created_at: now,
            context: context.normalized()?,
        };
        self.store.insert_task(&task)?;
        debug!(id = %task.id, "task queued");
        Ok(task)
    }

    pub fn list_tasks(&self) -> Result<Vec<Task>, EngineError> {
        Ok(self.store.list_tasks()?)
    }

    pub fn update_task(
        &mut self,
        id: &TaskId,
        context: SessionContext,
    ) -> Result<Task, EngineError> {
        let mut task = self
            .store
            .get_task(id)?
            .ok_or_else(|| not_found("task", id))?;
        task.context = context.normalized()?;
        self.store.update_task(id, &task.context)?;
        Ok(task)
    }

    pub fn delete_task(&mut self, id: &TaskId) -> Result<(), EngineError> {
        let removed = self.store.delete_task(id)?;
        debug!(%id, removed, "task delete");
        Ok(())
    }

    /// Turns a queued task into an active session now.
    pub fn activate_task(
        &mut self,
        id: &TaskId,
        before: BeforeState,
    ) -> Result<Session, EngineError> {
        self.activate_task_at(id, before, local_now())
    }

    /// Turns a queued task into an active session at `now`. The session is
    /// created and the task removed in one store operation.
    pub fn activate_task_at(
        &mut self,
        id: &TaskId,
        before: BeforeState,
        now: NaiveDateTime,
    ) -> Result<Session, EngineError> {
        let task = self
            .store
            .get_task(id)?
            .ok_or_else(|| not_found("task", id))?;
        if let Some(open) = self.store.active_session()? {
            return Err(EngineError::Conflict {
                active: Some(open.id),
            });
        }

        let session = new_session(task.context, before, now);
        self.store.promote_task(id, &session)?;
        info!(task = %id, id = %session.id, "task activated");
        Ok(session)
    }
}

fn new_session(context: SessionContext, before: BeforeState, now: NaiveDateTime) -> Session {
    Session {
        id: SessionId::generate(),
        created_at: now,
        start_time: now,
        context,
        before,
        end: None,
    }
}

fn describe_active(active: &Option<SessionId>) -> String {
    active
        .as_ref()
        .map(|id| format!(" ({id})"))
        .unwrap_or_default()
}

fn not_found(kind: &'static str, id: impl ToString) -> EngineError {
    EngineError::NotFound {
        kind,
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Domain;
    use crate::record::fixtures::*;
    use crate::store::MemoryStore;

    fn start(store: &mut MemoryStore, now: NaiveDateTime) -> Result<Session, EngineError> {
        SessionManager::new(store).start_at(
            context(Domain::Work, WorkType::Deep),
            before(6, 4),
            now,
        )
    }

    #[test]
    fn start_creates_active_session() {
        let mut store = MemoryStore::new();
        let session = start(&mut store, at(3, 9, 0)).unwrap();
        assert!(session.is_active());
        assert_eq!(session.start_time, at(3, 9, 0));

        let manager = SessionManager::new(&mut store);
        assert_eq!(manager.active_session().unwrap(), Some(session));
    }

    #[test]
    fn start_while_active_conflicts_and_creates_nothing() {
        let mut store = MemoryStore::new();
        let first = start(&mut store, at(3, 9, 0)).unwrap();
        let err = start(&mut store, at(3, 9, 5)).unwrap_err();
        match err {
            EngineError::Conflict { active } => assert_eq!(active, Some(first.id)),
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(store.sessions_on(day(3)).unwrap().len(), 1);
    }

    #[test]
    fn start_validates_context_before_touching_store() {
        let mut store = MemoryStore::new();
        let mut ctx = context(Domain::Work, WorkType::Deep);
        ctx.project_name = String::new();
        let err = SessionManager::new(&mut store)
            .start_at(ctx, before(5, 5), at(3, 9, 0))
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(ValidationError::Empty { .. })));
        assert!(store.active_session().unwrap().is_none());
    }

    #[test]
    fn end_attaches_outcome_and_frees_slot() {
        let mut store = MemoryStore::new();
        let session = start(&mut store, at(3, 9, 0)).unwrap();
        let mut manager = SessionManager::new(&mut store);
        let ended = manager
            .end_at(&session.id, outcome(4, 5, 3), after(7, 3, "clear"), at(3, 10, 30))
            .unwrap();
        assert_eq!(ended.duration_minutes(), Some(90));
        assert_eq!(manager.active_session().unwrap(), None);
        assert_eq!(manager.get_session(&session.id).unwrap(), ended);

        // The slot is free again.
        assert!(start(&mut store, at(3, 11, 0)).is_ok());
    }

    #[test]
    fn end_unknown_session_is_not_found() {
        let mut store = MemoryStore::new();
        let id = SessionId::new("missing").unwrap();
        let err = SessionManager::new(&mut store)
            .end_at(&id, outcome(3, 3, 3), after(5, 5, "ok"), at(3, 10, 0))
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { kind: "session", .. }));
    }

    #[test]
    fn ending_twice_fails_and_keeps_first_outcome() {
        let mut store = MemoryStore::new();
        let session = start(&mut store, at(3, 9, 0)).unwrap();
        let mut manager = SessionManager::new(&mut store);
        let first = manager
            .end_at(&session.id, outcome(5, 5, 5), after(8, 2, "great"), at(3, 10, 0))
            .unwrap();
        let err = manager
            .end_at(&session.id, outcome(1, 1, 1), after(2, 9, "awful"), at(3, 11, 0))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { .. }));
        assert_eq!(manager.get_session(&session.id).unwrap(), first);
    }

    #[test]
    fn end_rejects_blank_feel_tag_without_writing() {
        let mut store = MemoryStore::new();
        let session = start(&mut store, at(3, 9, 0)).unwrap();
        let err = SessionManager::new(&mut store)
            .end_at(&session.id, outcome(3, 3, 3), after(5, 5, " "), at(3, 10, 0))
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(store.get_session(&session.id).unwrap().unwrap().is_active());
    }

    #[test]
    fn correct_work_type_only_after_end() {
        let mut store = MemoryStore::new();
        let session = start(&mut store, at(3, 9, 0)).unwrap();
        let mut manager = SessionManager::new(&mut store);

        let err = manager
            .correct_work_type(&session.id, WorkType::Shallow)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { .. }));

        let ended = manager
            .end_at(&session.id, outcome(3, 3, 3), after(5, 5, "ok"), at(3, 10, 0))
            .unwrap();
        let corrected = manager
            .correct_work_type(&session.id, WorkType::Shallow)
            .unwrap();
        assert_eq!(corrected.context.work_type, WorkType::Shallow);
        assert_eq!(corrected.end, ended.end);
        assert_eq!(corrected.context.project_name, ended.context.project_name);
        assert_eq!(manager.get_session(&session.id).unwrap(), corrected);
    }

    #[test]
    fn correct_work_type_unknown_id() {
        let mut store = MemoryStore::new();
        let err = SessionManager::new(&mut store)
            .correct_work_type(&SessionId::new("nope").unwrap(), WorkType::Deep)
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[test]
    fn deleting_active_session_returns_to_idle() {
        let mut store = MemoryStore::new();
        let session = start(&mut store, at(3, 9, 0)).unwrap();
        let mut manager = SessionManager::new(&mut store);
        manager.delete(&session.id).unwrap();
        assert_eq!(manager.active_session().unwrap(), None);
        // Unknown ids are a no-op.
        manager.delete(&session.id).unwrap();
        assert!(start(&mut store, at(3, 9, 30)).is_ok());
    }

    #[test]
    fn log_completed_checks_times_and_never_blocks_start() {
        let mut store = MemoryStore::new();
        let completed = CompletedSession {
            context: context(Domain::Learning, WorkType::Deep),
            before: before(5, 5),
            start_time: at(2, 7, 30),
            end_time: at(2, 9, 0),
            outcome: outcome(4, 4, 4),
            after: after(6, 4, "clear"),
        };
        let mut manager = SessionManager::new(&mut store);
        let logged = manager
            .log_completed_at(completed.clone(), at(3, 8, 0))
            .unwrap();
        assert_eq!(logged.duration_minutes(), Some(90));
        assert_eq!(manager.active_session().unwrap(), None);

        let backwards = CompletedSession {
            end_time: at(2, 7, 0),
            ..completed
        };
        assert!(matches!(
            manager.log_completed_at(backwards, at(3, 8, 0)),
            Err(EngineError::Validation(ValidationError::EndBeforeStart { .. }))
        ));
    }

    #[test]
    fn logged_sessions_must_be_five_minutes_to_sixteen_hours() {
        let mut store = MemoryStore::new();
        let logged = |start, end| CompletedSession {
            context: context(Domain::Work, WorkType::Shallow),
            before: before(5, 5),
            start_time: start,
            end_time: end,
            outcome: outcome(3, 3, 3),
            after: after(5, 5, "ok"),
        };
        let mut manager = SessionManager::new(&mut store);

        let too_short = manager
            .log_completed_at(logged(at(2, 9, 0), at(2, 9, 4)), at(3, 8, 0))
            .unwrap_err();
        assert!(matches!(
            too_short,
            EngineError::Validation(ValidationError::ImplausibleDuration { minutes: 4, .. })
        ));
        let too_long = manager
            .log_completed_at(logged(at(1, 6, 0), at(1, 22, 1)), at(3, 8, 0))
            .unwrap_err();
        assert!(matches!(
            too_long,
            EngineError::Validation(ValidationError::ImplausibleDuration { minutes: 961, .. })
        ));
        assert!(
            manager
                .log_completed_at(logged(at(2, 9, 0), at(2, 9, 5)), at(3, 8, 0))
                .is_ok()
        );
        assert_eq!(store.sessions_between(day(1), day(2)).unwrap().len(), 1);
    }

    #[test]
    fn live_sessions_end_regardless_of_length() {
        let mut store = MemoryStore::new();
        let session = start(&mut store, at(3, 9, 0)).unwrap();
        let ended = SessionManager::new(&mut store)
            .end_at(&session.id, outcome(2, 2, 2), after(5, 5, "meh"), at(3, 9, 1))
            .unwrap();
        assert_eq!(ended.duration_minutes(), Some(1));
    }

    #[test]
    fn activating_task_starts_session_and_consumes_task() {
        let mut store = MemoryStore::new();
        let mut manager = SessionManager::new(&mut store);
        let task = manager
            .create_task_at(context(Domain::College, WorkType::Deep), at(3, 8, 0))
            .unwrap();
        assert_eq!(manager.list_tasks().unwrap().len(), 1);

        let session = manager
            .activate_task_at(&task.id, before(7, 3), at(3, 9, 0))
            .unwrap();
        assert!(session.is_active());
        assert_eq!(session.context, task.context);
        assert!(manager.list_tasks().unwrap().is_empty());
    }

    #[test]
    fn activating_task_while_active_conflicts_and_keeps_task() {
        let mut store = MemoryStore::new();
        start(&mut store, at(3, 8, 0)).unwrap();
        let mut manager = SessionManager::new(&mut store);
        let task = manager
            .create_task_at(context(Domain::Admin, WorkType::Shallow), at(3, 8, 5))
            .unwrap();
        let err = manager
            .activate_task_at(&task.id, before(5, 5), at(3, 8, 10))
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict { .. }));
        assert_eq!(manager.list_tasks().unwrap(), vec![task]);
    }

    #[test]
    fn update_and_delete_task() {
        let mut store = MemoryStore::new();
        let mut manager = SessionManager::new(&mut store);
        let task = manager
            .create_task_at(context(Domain::Admin, WorkType::Shallow), at(3, 8, 0))
            .unwrap();
        let mut ctx = task.context.clone();
        ctx.activity_description = "  file taxes ".to_string();
        let updated = manager.update_task(&task.id, ctx).unwrap();
        assert_eq!(updated.context.activity_description, "file taxes");

        manager.delete_task(&task.id).unwrap();
        assert!(manager.list_tasks().unwrap().is_empty());
        assert!(matches!(
            manager.update_task(&task.id, updated.context),
            Err(EngineError::NotFound { kind: "task", .. })
        ));
    }

    #[test]
    fn store_level_conflict_maps_to_conflict() {
        let err: EngineError = StoreError::OpenSessionExists.into();
        assert!(matches!(err, EngineError::Conflict { active: None }));
        assert_eq!(err.to_string(), "a session is already active");
    }
}
