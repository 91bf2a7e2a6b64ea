//! Journal records: sessions, sleep, queued tasks, and daily intake.
//!
//! These are plain owned values. The record store hands out copies and the
//! engine never keeps one across calls.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::category::{CompletionStatus, Domain, Meal, WorkType};
use crate::types::{Level, Rating, SessionId, TaskId, ValidationError};

/// Upper bound for planned and manually logged session lengths.
pub const MAX_SESSION_MINUTES: i64 = 16 * 60;

/// Lower bound for manually logged session lengths.
pub const MIN_LOGGED_SESSION_MINUTES: i64 = 5;

const MIN_SLEEP_MINUTES: i64 = 60;
const MAX_SLEEP_MINUTES: i64 = 14 * 60;

/// What a session is about. Fixed at start; only the work type may be
/// corrected afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub domain: Domain,
    pub work_type: WorkType,
    pub project_name: String,
    pub activity_description: String,
    pub planned_duration_min: Option<u32>,
}

impl SessionContext {
    /// Trims free-text fields and checks the required ones.
    pub fn normalized(mut self) -> Result<Self, ValidationError> {
        self.project_name = self.project_name.trim().to_string();
        self.activity_description = self.activity_description.trim().to_string();

        if self.project_name.is_empty() {
            return Err(ValidationError::Empty {
                field: "project name",
            });
        }
        if self.activity_description.is_empty() {
            return Err(ValidationError::Empty {
                field: "activity description",
            });
        }
        if let Some(minutes) = self.planned_duration_min {
            let minutes = i64::from(minutes);
            if minutes == 0 || minutes > MAX_SESSION_MINUTES {
                return Err(ValidationError::PlannedDuration {
                    minutes,
                    max: MAX_SESSION_MINUTES,
                });
            }
        }
        Ok(self)
    }
}

/// Operator state captured when a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeforeState {
    pub energy: Level,
    pub stress: Level,
    /// How hard it was to get started.
    pub resistance: Rating,
}

/// Operator state captured when a session ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AfterState {
    pub energy: Level,
    pub stress: Level,
    /// Short free-text label, e.g. "clear" or "drained".
    pub feel_tag: String,
}

impl AfterState {
    /// Trims the feel tag and rejects an empty one.
    pub fn normalized(mut self) -> Result<Self, ValidationError> {
        self.feel_tag = self.feel_tag.trim().to_string();
        if self.feel_tag.is_empty() {
            return Err(ValidationError::Empty { field: "feel tag" });
        }
        Ok(self)
    }
}

/// Self-evaluation attached when a session ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub completion_status: CompletionStatus,
    pub progress_rating: Rating,
    pub quality_rating: Rating,
    pub focus_quality: Rating,
    pub moves_main_goal: bool,
    pub evidence_note: Option<String>,
}

impl Outcome {
    /// Trims the evidence note; a blank note becomes absent.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.evidence_note = self
            .evidence_note
            .map(|note| note.trim().to_string())
            .filter(|note| !note.is_empty());
        self
    }
}

/// Everything a session gains when it ends.
///
/// Kept as one value so an end time can never exist without its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEnd {
    pub end_time: NaiveDateTime,
    pub outcome: Outcome,
    pub after: AfterState,
}

/// One intentional block of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub created_at: NaiveDateTime,
    pub start_time: NaiveDateTime,
    pub context: SessionContext,
    pub before: BeforeState,
    /// `None` while the session is active.
    pub end: Option<SessionEnd>,
}

impl Session {
    /// Whether this session still occupies the active slot.
    pub const fn is_active(&self) -> bool {
        self.end.is_none()
    }

    /// Calendar date the session is attributed to (its start date).
    pub fn date(&self) -> NaiveDate {
        self.start_time.date()
    }

    /// Hour of day (0–23) the session started in.
    pub fn start_hour(&self) -> u32 {
        self.start_time.hour()
    }

    pub fn end_time(&self) -> Option<NaiveDateTime> {
        self.end.as_ref().map(|end| end.end_time)
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.end.as_ref().map(|end| &end.outcome)
    }

    pub fn after(&self) -> Option<&AfterState> {
        self.end.as_ref().map(|end| &end.after)
    }

    /// Whole minutes between start and end, or `None` while active.
    pub fn duration_minutes(&self) -> Option<i64> {
        self.end_time()
            .map(|end| (end - self.start_time).num_minutes().max(0))
    }

    /// Minutes elapsed so far: the final duration once ended, otherwise time
    /// since start relative to `now`. Never persisted.
    pub fn elapsed_minutes(&self, now: NaiveDateTime) -> i64 {
        self.duration_minutes()
            .unwrap_or_else(|| (now - self.start_time).num_minutes().max(0))
    }

    /// Energy after minus energy before, once ended.
    pub fn energy_delta(&self) -> Option<i32> {
        self.after()
            .map(|after| i32::from(after.energy.get()) - i32::from(self.before.energy.get()))
    }

    /// Stress after minus stress before, once ended.
    pub fn stress_delta(&self) -> Option<i32> {
        self.after()
            .map(|after| i32::from(after.stress.get()) - i32::from(self.before.stress.get()))
    }
}

/// One night of sleep, attributed to the date of waking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sleep {
    pub date: NaiveDate,
    pub sleep_start: NaiveDateTime,
    pub sleep_end: NaiveDateTime,
    pub sleep_quality: Rating,
    pub awakenings_count: u32,
    pub energy_morning: Level,
    pub mood_morning: Level,
    pub screen_last_hour: Option<bool>,
    pub caffeine_late: Option<bool>,
    pub bedtime_consistent: Option<bool>,
}

impl Sleep {
    /// Whole minutes asleep, clamped to be non-negative.
    pub fn duration_minutes(&self) -> i64 {
        (self.sleep_end - self.sleep_start).num_minutes().max(0)
    }

    /// Checks time ordering and duration plausibility.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.sleep_end <= self.sleep_start {
            return Err(ValidationError::EndBeforeStart { what: "sleep" });
        }
        let minutes = self.duration_minutes();
        if !(MIN_SLEEP_MINUTES..=MAX_SLEEP_MINUTES).contains(&minutes) {
            return Err(ValidationError::ImplausibleDuration {
                what: "sleep",
                minutes,
                min: MIN_SLEEP_MINUTES,
                max: MAX_SLEEP_MINUTES,
            });
        }
        Ok(())
    }
}

/// A queued unit of intended work that has not started yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub created_at: NaiveDateTime,
    pub context: SessionContext,
}

/// Per-date water and meal counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intake {
    pub date: NaiveDate,
    pub water_count: u32,
    pub breakfast_time: Option<NaiveDateTime>,
    pub lunch_time: Option<NaiveDateTime>,
    pub dinner_time: Option<NaiveDateTime>,
}

impl Intake {
    /// Zeroed counters for a date with nothing logged.
    pub const fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            water_count: 0,
            breakfast_time: None,
            lunch_time: None,
            dinner_time: None,
        }
    }

    pub fn meal_time(&self, meal: Meal) -> Option<NaiveDateTime> {
        match meal {
            Meal::Breakfast => self.breakfast_time,
            Meal::Lunch => self.lunch_time,
            Meal::Dinner => self.dinner_time,
        }
    }

    pub fn set_meal_time(&mut self, meal: Meal, at: NaiveDateTime) {
        match meal {
            Meal::Breakfast => self.breakfast_time = Some(at),
            Meal::Lunch => self.lunch_time = Some(at),
            Meal::Dinner => self.dinner_time = Some(at),
        }
    }

    /// Number of meal slots with a timestamp.
    pub fn meals_logged(&self) -> u32 {
        let logged = Meal::ALL
            .iter()
            .filter(|meal| self.meal_time(**meal).is_some())
            .count();
        u32::try_from(logged).unwrap_or(u32::MAX)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn context_normalization_trims_and_requires_text() {
        let mut ctx = context(Domain::Work, WorkType::Deep);
        ctx.project_name = "  icarus  ".to_string();
        let ctx = ctx.normalized().unwrap();
        assert_eq!(ctx.project_name, "icarus");

        let mut blank = context(Domain::Work, WorkType::Deep);
        blank.activity_description = "   ".to_string();
        assert_eq!(
            blank.normalized(),
            Err(ValidationError::Empty {
                field: "activity description"
            })
        );
    }

    #[test]
    fn context_rejects_unrealistic_plans() {
        let mut ctx = context(Domain::Work, WorkType::Deep);
        ctx.planned_duration_min = Some(0);
        assert!(ctx.clone().normalized().is_err());
        ctx.planned_duration_min = Some(17 * 60);
        assert!(ctx.clone().normalized().is_err());
        ctx.planned_duration_min = None;
        assert!(ctx.normalized().is_ok());
    }

    #[test]
    fn after_state_requires_feel_tag() {
        assert!(after(5, 5, "  ").normalized().is_err());
        assert_eq!(after(5, 5, " clear ").normalized().unwrap().feel_tag, "clear");
    }

    #[test]
    fn blank_evidence_note_becomes_absent() {
        let mut o = outcome(3, 3, 3);
        o.evidence_note = Some("   ".to_string());
        assert_eq!(o.normalized().evidence_note, None);
    }

    #[test]
    fn active_session_has_no_duration_but_reports_elapsed() {
        let session = active(at(3, 9, 0), WorkType::Deep);
        assert!(session.is_active());
        assert_eq!(session.duration_minutes(), None);
        assert_eq!(session.elapsed_minutes(at(3, 9, 45)), 45);
        assert_eq!(session.energy_delta(), None);
    }

    #[test]
    fn ended_session_derives_duration_and_deltas() {
        let session = rated(at(3, 9, 0), 50, Domain::Work, WorkType::Deep, (4, 4, 4));
        assert_eq!(session.duration_minutes(), Some(50));
        assert_eq!(session.elapsed_minutes(at(3, 23, 0)), 50);
        assert_eq!(session.energy_delta(), Some(1));
        assert_eq!(session.stress_delta(), Some(-1));
        assert_eq!(session.start_hour(), 9);
        assert_eq!(session.date(), day(3));
    }

    #[test]
    fn sleep_duration_and_validation() {
        let night = sleep(day(4), 450, 4);
        assert_eq!(night.duration_minutes(), 450);
        assert!(night.validate().is_ok());

        let too_short = sleep(day(4), 30, 4);
        assert!(matches!(
            too_short.validate(),
            Err(ValidationError::ImplausibleDuration { minutes: 30, .. })
        ));

        let mut reversed = sleep(day(4), 450, 4);
        std::mem::swap(&mut reversed.sleep_start, &mut reversed.sleep_end);
        assert_eq!(reversed.duration_minutes(), 0);
        assert_eq!(
            reversed.validate(),
            Err(ValidationError::EndBeforeStart { what: "sleep" })
        );
    }

    #[test]
    fn intake_counts_meals() {
        let mut intake = Intake::empty(day(5));
        assert_eq!(intake.meals_logged(), 0);
        intake.set_meal_time(Meal::Lunch, at(5, 12, 30));
        intake.set_meal_time(Meal::Dinner, at(5, 19, 0));
        assert_eq!(intake.meals_logged(), 2);
        assert_eq!(intake.meal_time(Meal::Lunch), Some(at(5, 12, 30)));
    }
}
