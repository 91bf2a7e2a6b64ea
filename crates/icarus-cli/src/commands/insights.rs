//! Heatmaps, ledgers and pattern counts.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use icarus_core::{
    Analytics, CalendarCell, CalendarGrid, CalendarMetric, Domain, Pattern, PatternPolicy,
    RecordStore, SleepDeepPoint,
};

use super::util::{format_minutes, parse_date, write_json};
use crate::RangeArgs;

/// Intensity glyphs for calendar cells, lowest quartile first.
const LEVELS: [char; 4] = ['░', '▒', '▓', '█'];
const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const BAR_WIDTH: f64 = 20.0;

fn parse_range(args: &RangeArgs, today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    Ok((parse_date(&args.from, today)?, parse_date(&args.to, today)?))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let width = ((value / max) * BAR_WIDTH).round().max(1.0) as usize;
    "#".repeat(width)
}

// ========== Formatting ==========

/// Formats hours that have rated sessions, with a bar scaled to the best hour.
pub fn format_chronotype(hours: &BTreeMap<u32, f64>) -> String {
    let max = hours.values().copied().fold(0.0, f64::max);
    if max <= 0.0 {
        return "No rated sessions.\n".to_string();
    }
    let mut out = String::new();
    for (hour, focus) in hours.iter().filter(|(_, focus)| **focus > 0.0) {
        let _ = writeln!(out, "{hour:02}:00  {focus:.1}  {}", bar(*focus, max));
    }
    out
}

pub fn format_ledger(ledger: &BTreeMap<Domain, f64>) -> String {
    if ledger.is_empty() {
        return "No rated sessions.\n".to_string();
    }
    let width = ledger
        .keys()
        .map(|domain| domain.label().len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for (domain, delta) in ledger {
        let _ = writeln!(out, "{:<width$}  {delta:+.1}", domain.label());
    }
    out
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn cell_glyph(cell: &CalendarCell, max: i64) -> char {
    match cell {
        CalendarCell::Padding | CalendarCell::Future { .. } => ' ',
        CalendarCell::Empty { .. } => '·',
        CalendarCell::Value { value, .. } => {
            if max <= 0 || *value <= 0 {
                return LEVELS[0];
            }
            let level = ((*value as f64 / max as f64) * LEVELS.len() as f64).ceil() as usize;
            LEVELS[level.clamp(1, LEVELS.len()) - 1]
        }
    }
}

/// Renders the calendar as seven weekday rows of 53 week columns.
pub fn format_calendar(grid: &CalendarGrid) -> String {
    let max = grid
        .weeks
        .iter()
        .flatten()
        .filter_map(|cell| match cell {
            CalendarCell::Value { value, .. } => Some(*value),
            _ => None,
        })
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let unit = match grid.metric {
        CalendarMetric::Performance => "daily index",
        CalendarMetric::Sleep => "sleep minutes",
    };
    let _ = writeln!(
        out,
        "{} ({unit}) through {}, max {max}",
        grid.metric, grid.today
    );
    for (weekday, label) in WEEKDAYS.iter().enumerate() {
        let row: String = grid
            .weeks
            .iter()
            .map(|column| cell_glyph(&column[weekday], max))
            .collect();
        let _ = writeln!(out, "{label} {}", row.trim_end());
    }
    out
}

pub fn format_sleep_deep(points: &[SleepDeepPoint]) -> String {
    let mut out = String::new();
    for point in points {
        let sleep = point
            .sleep_minutes
            .map_or_else(|| "-".to_string(), format_minutes);
        let _ = writeln!(
            out,
            "{}  sleep {sleep:>7}  deep {:>7}",
            point.date,
            format_minutes(point.deep_minutes)
        );
    }
    out
}

pub fn format_patterns(counts: &BTreeMap<Pattern, u32>) -> String {
    let mut out = String::new();
    for pattern in Pattern::ALL {
        let count = counts.get(pattern).copied().unwrap_or(0);
        let _ = writeln!(out, "{:<12}{count}", pattern.label());
    }
    out
}

// ========== Commands ==========

pub fn chronotype<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &S,
    args: &RangeArgs,
    today: NaiveDate,
) -> Result<()> {
    let (start, end) = parse_range(args, today)?;
    let hours = Analytics::new(store).chronotype(start, end)?;
    if args.json {
        return write_json(writer, &hours);
    }
    write!(writer, "{}", format_chronotype(&hours))?;
    Ok(())
}

pub fn ledger<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &S,
    args: &RangeArgs,
    today: NaiveDate,
) -> Result<()> {
    let (start, end) = parse_range(args, today)?;
    let ledger = Analytics::new(store).energy_ledger(start, end)?;
    if args.json {
        return write_json(writer, &ledger);
    }
    write!(writer, "{}", format_ledger(&ledger))?;
    Ok(())
}

pub fn calendar<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &S,
    metric: CalendarMetric,
    json: bool,
    today: NaiveDate,
) -> Result<()> {
    let grid = Analytics::new(store).calendar_heatmap_at(metric, today)?;
    if json {
        return write_json(writer, &grid);
    }
    write!(writer, "{}", format_calendar(&grid))?;
    Ok(())
}

pub fn sleep_deep<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &S,
    args: &RangeArgs,
    today: NaiveDate,
) -> Result<()> {
    let (start, end) = parse_range(args, today)?;
    let points = Analytics::new(store).sleep_vs_deep_work(start, end)?;
    if args.json {
        return write_json(writer, &points);
    }
    write!(writer, "{}", format_sleep_deep(&points))?;
    Ok(())
}

pub fn patterns<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &S,
    args: &RangeArgs,
    policy: &PatternPolicy,
    today: NaiveDate,
) -> Result<()> {
    let (start, end) = parse_range(args, today)?;
    let counts = Analytics::with_policy(store, policy.clone()).pattern_counts(start, end)?;
    if args.json {
        return write_json(writer, &counts);
    }
    write!(writer, "{}", format_patterns(&counts))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDateTime;
    use icarus_core::{
        AfterState, BeforeState, CompletedSession, CompletionStatus, Journal, Level, Outcome,
        Rating, SessionContext, SessionManager, Sleep, WorkType,
    };
    use icarus_db::Database;
    use insta::assert_snapshot;

    fn day_of(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn at(d: u32, h: u32) -> NaiveDateTime {
        day_of(d).and_hms_opt(h, 0, 0).unwrap()
    }

    fn range_args(json: bool) -> RangeArgs {
        RangeArgs {
            from: "2025-03-01".to_string(),
            to: "2025-03-07".to_string(),
            json,
        }
    }

    /// (start, minutes, domain, type, progress, focus, energy before -> after, feel)
    fn completed(
        start: NaiveDateTime,
        minutes: i64,
        domain: Domain,
        work_type: WorkType,
        (progress, focus): (u8, u8),
        (energy_before, energy_after): (u8, u8),
        feel: &str,
    ) -> CompletedSession {
        CompletedSession {
            context: SessionContext {
                domain,
                work_type,
                project_name: "p".to_string(),
                activity_description: "a".to_string(),
                planned_duration_min: None,
            },
            before: BeforeState {
                energy: Level::new(energy_before).unwrap(),
                stress: Level::new(4).unwrap(),
                resistance: Rating::new(2).unwrap(),
            },
            start_time: start,
            end_time: start + chrono::Duration::minutes(minutes),
            outcome: Outcome {
                completion_status: CompletionStatus::Completed,
                progress_rating: Rating::new(progress).unwrap(),
                quality_rating: Rating::new(3).unwrap(),
                focus_quality: Rating::new(focus).unwrap(),
                moves_main_goal: true,
                evidence_note: None,
            },
            after: AfterState {
                energy: Level::new(energy_after).unwrap(),
                stress: Level::new(4).unwrap(),
                feel_tag: feel.to_string(),
            },
        }
    }

    fn seeded() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        let mut manager = SessionManager::new(&mut db);
        for session in [
            // Clean Win, +1 energy
            completed(at(3, 9), 90, Domain::Work, WorkType::Deep, (5, 4), (6, 7), "clear"),
            // Overclocked, -3 energy
            completed(at(3, 14), 60, Domain::Work, WorkType::Deep, (4, 5), (7, 4), "wired"),
            // Maintenance, -1 energy
            completed(at(4, 9), 30, Domain::Admin, WorkType::Maintenance, (3, 3), (5, 4), "ok"),
            // Grind, 0 energy
            completed(at(4, 14), 60, Domain::Learning, WorkType::Shallow, (2, 4), (5, 5), "ok"),
        ] {
            manager.log_completed_at(session, at(7, 20)).unwrap();
        }
        Journal::new(&mut db)
            .log_sleep(Sleep {
                date: day_of(4),
                sleep_start: at(3, 23),
                sleep_end: at(4, 7),
                sleep_quality: Rating::new(4).unwrap(),
                awakenings_count: 0,
                energy_morning: Level::new(6).unwrap(),
                mood_morning: Level::new(6).unwrap(),
                screen_last_hour: None,
                caffeine_late: None,
                bedtime_consistent: None,
            })
            .unwrap();
        db
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut output = Vec::new();
        f(&mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn chronotype_lists_rated_hours() {
        let db = seeded();
        let output = render(|w| chronotype(w, &db, &range_args(false), day_of(7)));
        // 09:00 averages focus 4 and 3
        assert_snapshot!(output, @r"
        09:00  3.5  ################
        14:00  4.5  ####################
        ");
    }

    #[test]
    fn chronotype_json_has_every_hour() {
        let db = seeded();
        let output = render(|w| chronotype(w, &db, &range_args(true), day_of(7)));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value.as_object().unwrap().len(), 24);
        assert_eq!(value["14"], 4.5);
        assert_eq!(value["0"], 0.0);
    }

    #[test]
    fn ledger_shows_signed_means() {
        let db = seeded();
        let output = render(|w| ledger(w, &db, &range_args(false), day_of(7)));
        assert_snapshot!(output, @r"
        Work      -1.0
        Learning  +0.0
        Admin     -1.0
        ");
    }

    #[test]
    fn patterns_list_every_pattern() {
        let db = seeded();
        let output = render(|w| {
            patterns(w, &db, &range_args(false), &PatternPolicy::default(), day_of(7))
        });
        assert_snapshot!(output, @r"
        Clean Win   1
        Overclocked 1
        Maintenance 1
        Grind       1
        Drift       0
        ");
    }

    #[test]
    fn stricter_policy_changes_classification() {
        let db = seeded();
        let policy = PatternPolicy {
            high_focus: 5,
            ..PatternPolicy::default()
        };
        let output = render(|w| patterns(w, &db, &range_args(true), &policy, day_of(7)));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["Grind"], 0);
        assert_eq!(value["Drift"], 1);
    }

    #[test]
    fn sleep_deep_series_is_dense() {
        let db = seeded();
        let args = RangeArgs {
            from: "2025-03-03".to_string(),
            to: "2025-03-05".to_string(),
            json: false,
        };
        let output = render(|w| sleep_deep(w, &db, &args, day_of(7)));
        assert_snapshot!(output, @r"
        2025-03-03  sleep       -  deep  2h 30m
        2025-03-04  sleep   8h 0m  deep      0m
        2025-03-05  sleep       -  deep      0m
        ");
    }

    #[test]
    fn calendar_rows_end_at_today() {
        let db = seeded();
        // Friday 2025-03-07
        let output = render(|w| calendar(w, &db, CalendarMetric::Sleep, false, day_of(7)));
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(
            lines[0],
            "sleep (sleep minutes) through 2025-03-07, max 480"
        );
        // Tuesday the 4th is the only night logged
        assert!(lines[3].ends_with('█'));
        assert!(lines[6].ends_with('·'));
        // Saturday is still in the future
        assert!(lines[7].ends_with('·'));
        assert_eq!(lines[7].chars().count(), "Sat ".len() + 52);
    }

    #[test]
    fn calendar_json_exposes_cell_states() {
        let db = seeded();
        let output = render(|w| calendar(w, &db, CalendarMetric::Performance, true, day_of(7)));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["metric"], "performance");
        assert_eq!(value["weeks"].as_array().unwrap().len(), 53);
        assert_eq!(value["weeks"][52][6]["state"], "future");
        assert_eq!(value["weeks"][52][5]["state"], "empty");
    }
}
