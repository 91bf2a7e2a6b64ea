//! Scoring engine: pure functions from ratings and day summaries to
//! comparable numbers.
//!
//! # Per-session score
//!
//! `min(100, (progress*2 + focus*1.5 + quality) / 22.5 * 100)`. The divisor is
//! the largest attainable weighted sum, so the score lies in \[20, 100\] for
//! valid ratings.
//!
//! # Daily performance index (0–100)
//!
//! - Output, max 60: one point per 5 deep-work minutes.
//! - Input, max 20: +10 for ≥7h sleep (else +5 for ≥6h), +10 for sleep
//!   quality ≥4.
//! - Efficiency, max 20: `floor(mean focus * 4)` over rated sessions.
//!
//! # Intake bonus (0–20)
//!
//! `min(5, water/2) + 5 per logged meal`, capped at 20. It is reported next to
//! the index, never folded into it; the extended score is the capped sum.
//!
//! # System load
//!
//! Deep minutes count 1.0, shallow 0.3, recovery -0.5; 240 weighted minutes
//! is 100% load.

use serde::Serialize;

use crate::category::WorkType;
use crate::record::{Intake, Outcome, Session};
use crate::summary::DaySummary;

const MAX_WEIGHTED_RATING: f64 = 22.5;

const OUTPUT_MAX: u32 = 60;
const DEEP_MINUTES_PER_POINT: i64 = 5;
const FULL_SLEEP_MINUTES: i64 = 420;
const SHORT_SLEEP_MINUTES: i64 = 360;
const GOOD_SLEEP_QUALITY: u8 = 4;

const WATER_BONUS_MAX: u32 = 5;
const MEAL_BONUS: u32 = 5;
const INTAKE_BONUS_MAX: u32 = 20;

const FULL_LOAD_MINUTES: f64 = 240.0;

/// Comparability score (0–100) for one rated session.
pub fn session_score(outcome: &Outcome) -> f64 {
    let weighted = outcome.progress_rating.as_f64() * 2.0
        + outcome.focus_quality.as_f64() * 1.5
        + outcome.quality_rating.as_f64();
    (weighted * 100.0 / MAX_WEIGHTED_RATING).min(100.0)
}

/// The three components of the daily index and their clamped total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DailyIndex {
    pub output: u32,
    pub input: u32,
    pub efficiency: u32,
    pub total: u32,
}

/// Computes the fallback daily performance index from a day summary.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn daily_index(summary: &DaySummary) -> DailyIndex {
    let deep_points = summary.totals.deep_minutes.max(0) / DEEP_MINUTES_PER_POINT;
    let output = u32::try_from(deep_points).unwrap_or(u32::MAX).min(OUTPUT_MAX);

    let mut input = 0;
    if let Some(minutes) = summary.sleep_minutes {
        if minutes >= FULL_SLEEP_MINUTES {
            input += 10;
        } else if minutes >= SHORT_SLEEP_MINUTES {
            input += 5;
        }
    }
    if summary
        .sleep_quality
        .is_some_and(|quality| quality.get() >= GOOD_SLEEP_QUALITY)
    {
        input += 10;
    }

    // Mean focus is within [1, 5], so the product fits comfortably.
    let efficiency = summary
        .totals
        .avg_focus
        .map_or(0, |focus| (focus * 4.0).floor().clamp(0.0, 20.0) as u32);

    DailyIndex {
        output,
        input,
        efficiency,
        total: (output + input + efficiency).min(100),
    }
}

/// Bonus points (0–20) for water and meals logged on a day.
pub fn intake_bonus(intake: &Intake) -> u32 {
    let water = (intake.water_count / 2).min(WATER_BONUS_MAX);
    (water + MEAL_BONUS * intake.meals_logged()).min(INTAKE_BONUS_MAX)
}

/// Base score plus intake bonus, capped at 100.
pub fn extended_score(base: u32, bonus: u32) -> u32 {
    base.saturating_add(bonus).min(100)
}

/// Cognitive load (0–100%) accumulated by a day's ended sessions,
/// rounded to two decimals.
#[allow(clippy::cast_precision_loss)]
pub fn system_load<'a>(sessions: impl IntoIterator<Item = &'a Session>) -> f64 {
    let weighted: f64 = sessions
        .into_iter()
        .filter_map(|session| {
            let minutes = session.duration_minutes()? as f64;
            let weight = match session.context.work_type {
                WorkType::Deep => 1.0,
                WorkType::Shallow => 0.3,
                WorkType::Recovery => -0.5,
                WorkType::Maintenance | WorkType::Unknown => 0.0,
            };
            Some(minutes * weight)
        })
        .sum();
    let percent = (weighted / FULL_LOAD_MINUTES * 100.0).clamp(0.0, 100.0);
    (percent * 100.0).round() / 100.0
}

/// Everything known about one day's score, with the intake bonus kept
/// separate from the canonical index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    pub date: chrono::NaiveDate,
    pub index: DailyIndex,
    pub intake_bonus: u32,
    pub extended: u32,
    pub load_percent: f64,
}
