//! Sleep and intake logging.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::category::Meal;
use crate::dates::{DateRange, local_now};
use crate::lifecycle::EngineError;
use crate::record::{Intake, Sleep};
use crate::store::RecordStore;

/// Writes sleep and intake records through a borrowed store.
pub struct Journal<'s, S: ?Sized> {
    store: &'s mut S,
}

impl<'s, S: RecordStore + ?Sized> Journal<'s, S> {
    pub const fn new(store: &'s mut S) -> Self {
        Self { store }
    }

    /// Validates and saves a night of sleep, replacing any record for the
    /// same waking date.
    pub fn log_sleep(&mut self, sleep: Sleep) -> Result<Sleep, EngineError> {
        sleep.validate()?;
        self.store.upsert_sleep(&sleep)?;
        info!(
            date = %sleep.date,
            minutes = sleep.duration_minutes(),
            quality = %sleep.sleep_quality,
            "sleep logged"
        );
        Ok(sleep)
    }

    /// Read access through the same store.
    pub fn view(&self) -> JournalView<'_, S> {
        JournalView::new(&*self.store)
    }

    pub fn sleep_on(&self, date: NaiveDate) -> Result<Option<Sleep>, EngineError> {
        self.view().sleep_on(date)
    }

    pub fn list_sleep(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Sleep>, EngineError> {
        self.view().list_sleep(start, end)
    }

    /// Adds one glass of water to `date`.
    pub fn add_water(&mut self, date: NaiveDate) -> Result<Intake, EngineError> {
        let intake = self.store.add_water(date)?;
        debug!(%date, glasses = intake.water_count, "water logged");
        Ok(intake)
    }

    /// Marks `meal` as eaten now.
    pub fn log_meal(&mut self, meal: Meal) -> Result<Intake, EngineError> {
        let now = local_now();
        self.log_meal_at(now.date(), meal, now)
    }

    /// Marks `meal` as eaten on `date` at `at`. Logging it again moves the
    /// timestamp.
    pub fn log_meal_at(
        &mut self,
        date: NaiveDate,
        meal: Meal,
        at: NaiveDateTime,
    ) -> Result<Intake, EngineError> {
        let intake = self.store.log_meal(date, meal, at)?;
        debug!(%date, %meal, "meal logged");
        Ok(intake)
    }

    pub fn intake_on(&self, date: NaiveDate) -> Result<Intake, EngineError> {
        self.view().intake_on(date)
    }
}

/// Read-only queries over sleep and intake records.
pub struct JournalView<'s, S: ?Sized> {
    store: &'s S,
}

impl<'s, S: RecordStore + ?Sized> JournalView<'s, S> {
    pub const fn new(store: &'s S) -> Self {
        Self { store }
    }

    pub fn sleep_on(&self, date: NaiveDate) -> Result<Option<Sleep>, EngineError> {
        Ok(self.store.sleep_on(date)?)
    }

    /// Sleep records between two dates (inclusive, either order).
    pub fn list_sleep(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Sleep>, EngineError> {
        let range = DateRange::new(start, end);
        Ok(self.store.sleep_between(range.start, range.end)?)
    }

    /// Counters for `date`, zeroed when nothing was logged.
    pub fn intake_on(&self, date: NaiveDate) -> Result<Intake, EngineError> {
        Ok(self
            .store
            .intake_on(date)?
            .unwrap_or_else(|| Intake::empty(date)))
    }

    /// Dates with logged intake between two dates (inclusive, either order).
    pub fn list_intake(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Intake>, EngineError> {
        let range = DateRange::new(start, end);
        Ok(self.store.intake_between(range.start, range.end)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::*;
    use crate::store::MemoryStore;
    use crate::types::ValidationError;

    #[test]
    fn sleep_upserts_by_date() {
        let mut store = MemoryStore::new();
        let mut journal = Journal::new(&mut store);

        journal.log_sleep(sleep(day(3), 400, 3)).unwrap();
        journal.log_sleep(sleep(day(3), 480, 5)).unwrap();
        journal.log_sleep(sleep(day(5), 420, 4)).unwrap();

        let night = journal.sleep_on(day(3)).unwrap().unwrap();
        assert_eq!(night.duration_minutes(), 480);
        assert_eq!(journal.list_sleep(day(6), day(1)).unwrap().len(), 2);
    }

    #[test]
    fn implausible_sleep_is_rejected_without_writing() {
        let mut store = MemoryStore::new();
        let mut journal = Journal::new(&mut store);

        let err = journal.log_sleep(sleep(day(3), 900, 3)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::ImplausibleDuration { .. })
        ));
        assert_eq!(journal.sleep_on(day(3)).unwrap(), None);
    }

    #[test]
    fn intake_starts_empty_and_accumulates() {
        let mut store = MemoryStore::new();
        let mut journal = Journal::new(&mut store);

        assert_eq!(journal.intake_on(day(3)).unwrap(), Intake::empty(day(3)));

        journal.add_water(day(3)).unwrap();
        let intake = journal.add_water(day(3)).unwrap();
        assert_eq!(intake.water_count, 2);

        journal
            .log_meal_at(day(3), Meal::Breakfast, at(3, 8, 0))
            .unwrap();
        let intake = journal
            .log_meal_at(day(3), Meal::Breakfast, at(3, 8, 30))
            .unwrap();
        assert_eq!(intake.breakfast_time, Some(at(3, 8, 30)));
        assert_eq!(intake.meals_logged(), 1);

        assert_eq!(journal.intake_on(day(4)).unwrap().water_count, 0);
    }

    #[test]
    fn view_lists_only_logged_intake_days() {
        let mut store = MemoryStore::new();
        let mut journal = Journal::new(&mut store);
        journal.add_water(day(3)).unwrap();
        journal.log_meal_at(day(5), Meal::Dinner, at(5, 19, 0)).unwrap();

        let view = JournalView::new(&store);
        let days: Vec<NaiveDate> = view
            .list_intake(day(6), day(1))
            .unwrap()
            .iter()
            .map(|intake| intake.date)
            .collect();
        assert_eq!(days, vec![day(3), day(5)]);
        assert_eq!(view.intake_on(day(4)).unwrap(), Intake::empty(day(4)));
    }
}
