//! Day, week and range summaries.
//!
//! Everything here is a pure reducer over records the caller already loaded.
//! Sessions still in progress count towards `total_sessions` but carry no
//! minutes and no ratings, so the result does not depend on the clock.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::category::{Domain, WorkType};
use crate::dates::DateRange;
use crate::record::{Session, Sleep};
use crate::types::{Level, Rating};

/// Minute totals and rating means over a set of sessions.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SessionTotals {
    pub total_sessions: u32,
    /// Sessions with an outcome attached.
    pub rated_sessions: u32,
    pub total_minutes: i64,
    pub deep_minutes: i64,
    pub shallow_minutes: i64,
    pub maintenance_minutes: i64,
    pub minutes_by_domain: BTreeMap<Domain, i64>,
    pub avg_progress: Option<f64>,
    pub avg_focus: Option<f64>,
    pub avg_quality: Option<f64>,
}

impl SessionTotals {
    pub fn from_sessions<'a>(sessions: impl IntoIterator<Item = &'a Session>) -> Self {
        let mut totals = Self::default();
        let mut progress = Mean::default();
        let mut focus = Mean::default();
        let mut quality = Mean::default();

        for session in sessions {
            totals.total_sessions += 1;

            let minutes = session.duration_minutes().unwrap_or(0);
            totals.total_minutes += minutes;
            match session.context.work_type {
                WorkType::Deep => totals.deep_minutes += minutes,
                WorkType::Shallow => totals.shallow_minutes += minutes,
                WorkType::Maintenance => totals.maintenance_minutes += minutes,
                WorkType::Recovery | WorkType::Unknown => {}
            }
            *totals
                .minutes_by_domain
                .entry(session.context.domain)
                .or_insert(0) += minutes;

            if let Some(outcome) = session.outcome() {
                totals.rated_sessions += 1;
                progress.push(outcome.progress_rating.as_f64());
                focus.push(outcome.focus_quality.as_f64());
                quality.push(outcome.quality_rating.as_f64());
            }
        }

        totals.avg_progress = progress.value();
        totals.avg_focus = focus.value();
        totals.avg_quality = quality.value();
        totals
    }
}

/// One day's sessions plus the sleep attributed to that date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub totals: SessionTotals,
    /// `None` when no sleep was logged, distinct from a logged zero.
    pub sleep_minutes: Option<i64>,
    pub sleep_quality: Option<Rating>,
    pub energy_morning: Option<Level>,
}

/// Summary of a week or an arbitrary date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub range: DateRange,
    pub totals: SessionTotals,
    /// Dates in the range with at least one session.
    pub active_days: u32,
    /// Dates in the range with a sleep record; the denominator of the sleep means.
    pub nights_logged: u32,
    pub avg_sleep_minutes: Option<f64>,
    pub avg_sleep_quality: Option<f64>,
    pub avg_energy_morning: Option<f64>,
}

/// Summarizes the sessions that started on `date`.
///
/// Sessions from other dates are ignored, as is a sleep record for another
/// date.
pub fn summarize_day(date: NaiveDate, sessions: &[Session], sleep: Option<&Sleep>) -> DaySummary {
    let totals = SessionTotals::from_sessions(sessions.iter().filter(|s| s.date() == date));
    let sleep = sleep.filter(|night| night.date == date);

    DaySummary {
        date,
        totals,
        sleep_minutes: sleep.map(Sleep::duration_minutes),
        sleep_quality: sleep.map(|night| night.sleep_quality),
        energy_morning: sleep.map(|night| night.energy_morning),
    }
}

/// Summarizes every session and sleep record that falls inside `range`.
#[allow(clippy::cast_precision_loss)]
pub fn summarize_period(range: DateRange, sessions: &[Session], sleep: &[Sleep]) -> PeriodSummary {
    let in_range: Vec<&Session> = sessions
        .iter()
        .filter(|s| range.contains(s.date()))
        .collect();
    let totals = SessionTotals::from_sessions(in_range.iter().copied());

    let mut dates: Vec<NaiveDate> = in_range.iter().map(|s| s.date()).collect();
    dates.sort_unstable();
    dates.dedup();

    // One record per date, but tolerate duplicates from a misbehaving store.
    let nights: BTreeMap<NaiveDate, &Sleep> = sleep
        .iter()
        .filter(|night| range.contains(night.date))
        .map(|night| (night.date, night))
        .collect();

    let mut minutes = Mean::default();
    let mut quality = Mean::default();
    let mut energy = Mean::default();
    for night in nights.values() {
        minutes.push(night.duration_minutes() as f64);
        quality.push(night.sleep_quality.as_f64());
        energy.push(night.energy_morning.as_f64());
    }

    PeriodSummary {
        range,
        totals,
        active_days: count_u32(dates.len()),
        nights_logged: count_u32(nights.len()),
        avg_sleep_minutes: minutes.value(),
        avg_sleep_quality: quality.value(),
        avg_energy_morning: energy.value(),
    }
}

/// One point of the sleep-vs-deep-work series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SleepDeepPoint {
    pub date: NaiveDate,
    /// `None` when no sleep was logged for the date.
    pub sleep_minutes: Option<i64>,
    pub deep_minutes: i64,
}

/// Pairs each date in `range` with its sleep and deep-work minutes,
/// ascending by date.
pub fn sleep_vs_deep_work(
    range: DateRange,
    sessions: &[Session],
    sleep: &[Sleep],
) -> Vec<SleepDeepPoint> {
    let deep = deep_minutes_by_date(sessions);
    let nights: BTreeMap<NaiveDate, i64> = sleep
        .iter()
        .map(|night| (night.date, night.duration_minutes()))
        .collect();

    range
        .days()
        .map(|date| SleepDeepPoint {
            date,
            sleep_minutes: nights.get(&date).copied(),
            deep_minutes: deep.get(&date).copied().unwrap_or(0),
        })
        .collect()
}

/// Ended deep-work minutes per start date.
pub fn deep_minutes_by_date(sessions: &[Session]) -> BTreeMap<NaiveDate, i64> {
    let mut by_date = BTreeMap::new();
    for session in sessions {
        if session.context.work_type != WorkType::Deep {
            continue;
        }
        if let Some(minutes) = session.duration_minutes() {
            *by_date.entry(session.date()).or_insert(0) += minutes;
        }
    }
    by_date
}

/// Running arithmetic mean that reports `None` when empty.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Mean {
    sum: f64,
    count: u32,
}

impl Mean {
    pub(crate) fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub(crate) fn value(self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / f64::from(self.count))
    }
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
