//! Read-only analytics over a record store.
//!
//! [`Analytics`] loads the records for a date or range and hands them to the
//! pure reducers in [`crate::summary`], [`crate::heatmap`], [`crate::ledger`],
//! [`crate::patterns`] and [`crate::scoring`]. Nothing is cached; calling the
//! same query twice with no intervening write returns the same value. The only
//! error path is a failing store.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::category::Domain;
use crate::dates::{DateRange, local_today};
use crate::heatmap::{CalendarGrid, CalendarMetric, calendar_grid, calendar_values, calendar_window};
use crate::ledger::energy_ledger;
use crate::lifecycle::EngineError;
use crate::patterns::{Pattern, PatternPolicy, pattern_counts};
use crate::record::{Intake, Session, Sleep};
use crate::scoring::{ScoreCard, daily_index, extended_score, intake_bonus, system_load};
use crate::store::RecordStore;
use crate::summary::{DaySummary, PeriodSummary, SleepDeepPoint, summarize_day, summarize_period};

/// Aggregation queries over a borrowed store.
pub struct Analytics<'s, S: ?Sized> {
    store: &'s S,
    policy: PatternPolicy,
}

impl<'s, S: RecordStore + ?Sized> Analytics<'s, S> {
    /// Uses the default pattern policy.
    pub fn new(store: &'s S) -> Self {
        Self::with_policy(store, PatternPolicy::default())
    }

    pub const fn with_policy(store: &'s S, policy: PatternPolicy) -> Self {
        Self { store, policy }
    }

    pub const fn policy(&self) -> &PatternPolicy {
        &self.policy
    }

    fn load(&self, range: DateRange) -> Result<(Vec<Session>, Vec<Sleep>), EngineError> {
        let sessions = self.store.sessions_between(range.start, range.end)?;
        let sleep = self.store.sleep_between(range.start, range.end)?;
        debug!(
            start = %range.start,
            end = %range.end,
            sessions = sessions.len(),
            nights = sleep.len(),
            "loaded records"
        );
        Ok((sessions, sleep))
    }

    pub fn day_summary(&self, date: NaiveDate) -> Result<DaySummary, EngineError> {
        let sessions = self.store.sessions_on(date)?;
        let sleep = self.store.sleep_on(date)?;
        Ok(summarize_day(date, &sessions, sleep.as_ref()))
    }

    /// Summary of the Monday-to-Sunday week containing `date`.
    pub fn week_summary(&self, date: NaiveDate) -> Result<PeriodSummary, EngineError> {
        self.period_summary(DateRange::week_of(date))
    }

    /// Summary of `start..=end`; reversed bounds are swapped.
    pub fn range_summary(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PeriodSummary, EngineError> {
        self.period_summary(DateRange::new(start, end))
    }

    fn period_summary(&self, range: DateRange) -> Result<PeriodSummary, EngineError> {
        let (sessions, sleep) = self.load(range)?;
        Ok(summarize_period(range, &sessions, &sleep))
    }

    /// Mean focus per start hour, all 24 hours present.
    pub fn chronotype(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<u32, f64>, EngineError> {
        let range = DateRange::new(start, end);
        let sessions = self.store.sessions_between(range.start, range.end)?;
        Ok(crate::heatmap::chronotype(&sessions))
    }

    pub fn energy_ledger(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<Domain, f64>, EngineError> {
        let range = DateRange::new(start, end);
        let sessions = self.store.sessions_between(range.start, range.end)?;
        Ok(energy_ledger(&sessions))
    }

    /// Calendar heatmap of the last year ending today.
    pub fn calendar_heatmap(&self, metric: CalendarMetric) -> Result<CalendarGrid, EngineError> {
        self.calendar_heatmap_at(metric, local_today())
    }

    pub fn calendar_heatmap_at(
        &self,
        metric: CalendarMetric,
        today: NaiveDate,
    ) -> Result<CalendarGrid, EngineError> {
        let window = calendar_window(today);
        let (sessions, sleep) = self.load(window)?;
        let values = calendar_values(metric, window, &sessions, &sleep);
        Ok(calendar_grid(metric, today, &values))
    }

    pub fn sleep_vs_deep_work(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SleepDeepPoint>, EngineError> {
        let range = DateRange::new(start, end);
        let (sessions, sleep) = self.load(range)?;
        Ok(crate::summary::sleep_vs_deep_work(range, &sessions, &sleep))
    }

    pub fn pattern_counts(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<Pattern, u32>, EngineError> {
        let range = DateRange::new(start, end);
        let sessions = self.store.sessions_between(range.start, range.end)?;
        Ok(pattern_counts(&sessions, &self.policy))
    }

    /// Index, intake bonus, extended score and load for one day.
    pub fn day_score(&self, date: NaiveDate) -> Result<ScoreCard, EngineError> {
        let sessions = self.store.sessions_on(date)?;
        let sleep = self.store.sleep_on(date)?;
        let intake = self
            .store
            .intake_on(date)?
            .unwrap_or_else(|| Intake::empty(date));

        let index = daily_index(&summarize_day(date, &sessions, sleep.as_ref()));
        let bonus = intake_bonus(&intake);
        Ok(ScoreCard {
            date,
            index,
            intake_bonus: bonus,
            extended: extended_score(index.total, bonus),
            load_percent: system_load(&sessions),
        })
    }

    /// Floor of the mean daily index over every date in the range; dates
    /// without data count as 0.
    pub fn aggregate_score(&self, start: NaiveDate, end: NaiveDate) -> Result<u32, EngineError> {
        let range = DateRange::new(start, end);
        let (sessions, sleep) = self.load(range)?;
        // one pass over the sessions, grouped by date
        let values = calendar_values(CalendarMetric::Performance, range, &sessions, &sleep);

        let total: i64 = values.values().sum();
        let days = i64::from(range.len_days());
        if days == 0 {
            return Ok(0);
        }
        Ok(u32::try_from(total / days).unwrap_or(0))
    }
}
