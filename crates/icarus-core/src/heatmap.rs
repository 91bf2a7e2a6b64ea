//! Chronotype and calendar heatmaps.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dates::{DateRange, sunday_on_or_before};
use crate::record::{Session, Sleep};
use crate::scoring::daily_index;
use crate::summary::{Mean, summarize_day};
use crate::types::ValidationError;

/// Columns in the calendar grid.
pub const CALENDAR_WEEKS: usize = 53;

/// How far back the calendar reaches, in days before today.
pub const CALENDAR_LOOKBACK_DAYS: i64 = 364;

/// Mean focus quality of rated sessions per start hour.
///
/// All 24 hours are present; hours without a rated session report 0.
pub fn chronotype<'a>(sessions: impl IntoIterator<Item = &'a Session>) -> BTreeMap<u32, f64> {
    let mut hours = [Mean::default(); 24];
    for session in sessions {
        if let Some(outcome) = session.outcome() {
            if let Some(bucket) = hours.get_mut(session.start_hour() as usize) {
                bucket.push(outcome.focus_quality.as_f64());
            }
        }
    }
    (0u32..)
        .zip(hours)
        .map(|(hour, mean)| (hour, mean.value().unwrap_or(0.0)))
        .collect()
}

/// The per-date value shown in a calendar cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarMetric {
    /// Daily performance index (0–100).
    Performance,
    /// Minutes of sleep attributed to the date.
    Sleep,
}

impl CalendarMetric {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Performance => "performance",
            Self::Sleep => "sleep",
        }
    }
}

impl fmt::Display for CalendarMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalendarMetric {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "performance" => Ok(Self::Performance),
            "sleep" => Ok(Self::Sleep),
            _ => Err(ValidationError::UnknownLabel {
                kind: "calendar metric",
                value: s.to_string(),
            }),
        }
    }
}

/// One cell of the calendar grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CalendarCell {
    /// Leading cell before the lookback window; shows no date.
    Padding,
    /// A date after today.
    Future { date: NaiveDate },
    /// A past date with nothing recorded.
    Empty { date: NaiveDate },
    Value { date: NaiveDate, value: i64 },
}

impl CalendarCell {
    pub const fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Padding => None,
            Self::Future { date } | Self::Empty { date } | Self::Value { date, .. } => Some(*date),
        }
    }
}

/// A 53-column by 7-row grid of the last year, columns starting on Sunday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarGrid {
    pub metric: CalendarMetric,
    pub today: NaiveDate,
    /// Date of the first column's first row; may precede the window.
    pub anchor: NaiveDate,
    pub weeks: Vec<[CalendarCell; 7]>,
}

impl CalendarGrid {
    /// Cell at `week` (column) and `weekday` (row, 0 = Sunday).
    pub fn cell(&self, week: usize, weekday: usize) -> Option<&CalendarCell> {
        self.weeks.get(week).and_then(|column| column.get(weekday))
    }

    /// The cell showing `date`, if the grid contains it.
    pub fn find(&self, date: NaiveDate) -> Option<&CalendarCell> {
        self.weeks
            .iter()
            .flatten()
            .find(|cell| cell.date() == Some(date))
    }
}

/// Dates a calendar ending on `today` can show values for.
pub fn calendar_window(today: NaiveDate) -> DateRange {
    DateRange::new(today - Duration::days(CALENDAR_LOOKBACK_DAYS), today)
}

/// Computes the metric for every date of `window` that has data.
///
/// Performance covers dates with sessions or sleep; sleep covers dates with a
/// sleep record.
pub fn calendar_values(
    metric: CalendarMetric,
    window: DateRange,
    sessions: &[Session],
    sleep: &[Sleep],
) -> BTreeMap<NaiveDate, i64> {
    let mut sessions_by_date: BTreeMap<NaiveDate, Vec<Session>> = BTreeMap::new();
    for session in sessions.iter().filter(|s| window.contains(s.date())) {
        sessions_by_date
            .entry(session.date())
            .or_default()
            .push(session.clone());
    }
    let nights: BTreeMap<NaiveDate, &Sleep> = sleep
        .iter()
        .filter(|night| window.contains(night.date))
        .map(|night| (night.date, night))
        .collect();

    let dates: Vec<NaiveDate> = window.days().collect();
    dates
        .par_iter()
        .filter_map(|date| {
            let night = nights.get(date).copied();
            let value = match metric {
                CalendarMetric::Sleep => night.map(Sleep::duration_minutes),
                CalendarMetric::Performance => {
                    let day = sessions_by_date.get(date).map_or(&[][..], Vec::as_slice);
                    if day.is_empty() && night.is_none() {
                        None
                    } else {
                        let summary = summarize_day(*date, day, night);
                        Some(i64::from(daily_index(&summary).total))
                    }
                }
            };
            value.map(|value| (*date, value))
        })
        .collect()
}

/// Lays `values` out on the calendar grid ending on `today`.
///
/// Dates before the lookback window become padding, dates after `today`
/// are flagged as future.
pub fn calendar_grid(
    metric: CalendarMetric,
    today: NaiveDate,
    values: &BTreeMap<NaiveDate, i64>,
) -> CalendarGrid {
    let window = calendar_window(today);
    let anchor = sunday_on_or_before(window.start);

    let weeks = (0..CALENDAR_WEEKS)
        .map(|week| {
            std::array::from_fn(|weekday| {
                let offset = i64::try_from(week * 7 + weekday).unwrap_or(i64::MAX);
                let date = anchor + Duration::days(offset);
                if date < window.start {
                    CalendarCell::Padding
                } else if date > today {
                    CalendarCell::Future { date }
                } else {
                    values.get(&date).map_or(CalendarCell::Empty { date }, |value| {
                        CalendarCell::Value {
                            date,
                            value: *value,
                        }
                    })
                }
            })
        })
        .collect();

    CalendarGrid {
        metric,
        today,
        anchor,
        weeks,
    }
}
