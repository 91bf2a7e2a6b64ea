//! Summary and score reports.
//!
//! This module implements `icarus day`, `week`, `range` and `score`, each with
//! human-readable and JSON output.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use icarus_core::{Analytics, DaySummary, PeriodSummary, RecordStore, ScoreCard, SessionTotals};
use serde::Serialize;

use super::util::{format_mean, format_minutes, parse_date, write_json};

// ========== Formatting ==========

fn format_totals(out: &mut String, totals: &SessionTotals) {
    let _ = writeln!(
        out,
        "  Deep {} | Shallow {} | Maintenance {}",
        format_minutes(totals.deep_minutes),
        format_minutes(totals.shallow_minutes),
        format_minutes(totals.maintenance_minutes)
    );
    if !totals.minutes_by_domain.is_empty() {
        let domains: Vec<String> = totals
            .minutes_by_domain
            .iter()
            .map(|(domain, minutes)| format!("{domain} {}", format_minutes(*minutes)))
            .collect();
        let _ = writeln!(out, "  Domains: {}", domains.join(", "));
    }
    if totals.rated_sessions > 0 {
        let _ = writeln!(
            out,
            "  Avg progress {} | focus {} | quality {}",
            format_mean(totals.avg_progress),
            format_mean(totals.avg_focus),
            format_mean(totals.avg_quality)
        );
    }
}

/// Formats a day summary for display.
pub fn format_day(summary: &DaySummary) -> String {
    let mut out = String::new();
    let totals = &summary.totals;
    let _ = writeln!(out, "{}", summary.date.format("%A %Y-%m-%d"));
    let _ = writeln!(
        out,
        "  Sessions: {} ({} rated), {}",
        totals.total_sessions,
        totals.rated_sessions,
        format_minutes(totals.total_minutes)
    );
    format_totals(&mut out, totals);
    match (summary.sleep_minutes, summary.sleep_quality) {
        (Some(minutes), Some(quality)) => {
            let energy = summary
                .energy_morning
                .map_or_else(|| "-".to_string(), |level| level.to_string());
            let _ = writeln!(
                out,
                "  Sleep: {}, quality {quality}/5, morning energy {energy}",
                format_minutes(minutes)
            );
        }
        _ => {
            let _ = writeln!(out, "  Sleep: not logged");
        }
    }
    out
}

/// Formats a week or range summary for display.
#[allow(clippy::cast_possible_truncation)]
pub fn format_period(summary: &PeriodSummary) -> String {
    let mut out = String::new();
    let totals = &summary.totals;
    let _ = writeln!(out, "{} to {}", summary.range.start, summary.range.end);
    let _ = writeln!(
        out,
        "  Sessions: {} ({} rated) over {} active days, {}",
        totals.total_sessions,
        totals.rated_sessions,
        summary.active_days,
        format_minutes(totals.total_minutes)
    );
    format_totals(&mut out, totals);
    if let Some(avg_minutes) = summary.avg_sleep_minutes {
        let _ = writeln!(
            out,
            "  Sleep: avg {} over {} nights, quality {}, morning energy {}",
            format_minutes(avg_minutes.round() as i64),
            summary.nights_logged,
            format_mean(summary.avg_sleep_quality),
            format_mean(summary.avg_energy_morning)
        );
    } else {
        let _ = writeln!(out, "  Sleep: not logged");
    }
    out
}

/// Formats a day's score card for display.
pub fn format_score(card: &ScoreCard) -> String {
    let mut out = String::new();
    let index = &card.index;
    let _ = writeln!(out, "{}", card.date);
    let _ = writeln!(
        out,
        "  Index: {}/100 (output {}, input {}, efficiency {})",
        index.total, index.output, index.input, index.efficiency
    );
    let _ = writeln!(
        out,
        "  Intake bonus: +{} -> {}",
        card.intake_bonus, card.extended
    );
    let _ = writeln!(out, "  System load: {:.0}%", card.load_percent);
    out
}

// ========== Commands ==========

pub fn day<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &S,
    date: &str,
    json: bool,
    today: NaiveDate,
) -> Result<()> {
    let date = parse_date(date, today)?;
    let summary = Analytics::new(store).day_summary(date)?;
    if json {
        return write_json(writer, &summary);
    }
    write!(writer, "{}", format_day(&summary))?;
    Ok(())
}

pub fn week<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &S,
    date: &str,
    json: bool,
    today: NaiveDate,
) -> Result<()> {
    let date = parse_date(date, today)?;
    let summary = Analytics::new(store).week_summary(date)?;
    if json {
        return write_json(writer, &summary);
    }
    write!(writer, "{}", format_period(&summary))?;
    Ok(())
}

pub fn range<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &S,
    start: &str,
    end: &str,
    json: bool,
    today: NaiveDate,
) -> Result<()> {
    let start = parse_date(start, today)?;
    let end = parse_date(end, today)?;
    let summary = Analytics::new(store).range_summary(start, end)?;
    if json {
        return write_json(writer, &summary);
    }
    write!(writer, "{}", format_period(&summary))?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct AggregateScore {
    start: NaiveDate,
    end: NaiveDate,
    score: u32,
}

/// Shows one day's score card, or the aggregate score when `to` is given.
pub fn score<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &S,
    date: &str,
    to: Option<&str>,
    json: bool,
    today: NaiveDate,
) -> Result<()> {
    let date = parse_date(date, today)?;
    let analytics = Analytics::new(store);

    let Some(to) = to else {
        let card = analytics.day_score(date)?;
        if json {
            return write_json(writer, &card);
        }
        write!(writer, "{}", format_score(&card))?;
        return Ok(());
    };

    let to = parse_date(to, today)?;
    let (start, end) = if to < date { (to, date) } else { (date, to) };
    let aggregate = AggregateScore {
        start,
        end,
        score: analytics.aggregate_score(start, end)?,
    };
    if json {
        return write_json(writer, &aggregate);
    }
    writeln!(
        writer,
        "{} to {}: {}/100 average",
        aggregate.start, aggregate.end, aggregate.score
    )?;
    Ok(())
}
