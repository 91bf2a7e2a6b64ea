//! Sleep, water and meal logging and lookup.

use std::io::Write;

use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use icarus_core::{Intake, Journal, JournalView, Level, Meal, Rating, RecordStore, Sleep};

use super::util::{format_minutes, parse_clock, parse_date, parse_datetime, write_json};
use crate::{RangeArgs, SleepArgs};

/// Builds a sleep record from bed and wake clock times on the waking date.
///
/// A bedtime at or after the wake time is taken to be on the previous evening.
pub fn sleep_from_args(args: &SleepArgs, today: NaiveDate) -> Result<Sleep> {
    let date = parse_date(&args.date, today)?;
    let wake = parse_clock(&args.wake)?;
    let bed = parse_clock(&args.bed)?;
    let sleep_end = date.and_time(wake);
    let mut sleep_start = date.and_time(bed);
    if sleep_start >= sleep_end {
        sleep_start -= Duration::days(1);
    }

    Ok(Sleep {
        date,
        sleep_start,
        sleep_end,
        sleep_quality: Rating::new(args.quality)?,
        awakenings_count: args.awakenings,
        energy_morning: Level::new(args.energy)?,
        mood_morning: Level::new(args.mood)?,
        screen_last_hour: args.screen,
        caffeine_late: args.caffeine,
        bedtime_consistent: args.consistent,
    })
}

/// Logs (or replaces) a night of sleep.
pub fn sleep<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &mut S,
    args: &SleepArgs,
    today: NaiveDate,
) -> Result<()> {
    let night = Journal::new(store).log_sleep(sleep_from_args(args, today)?)?;
    writeln!(
        writer,
        "Logged sleep for {}: {} (quality {}/5)",
        night.date,
        format_minutes(night.duration_minutes()),
        night.sleep_quality
    )?;
    Ok(())
}

fn format_sleep(night: &Sleep) -> String {
    format!(
        "{}: {}, bed {}, up {}, quality {}/5, energy {}/10, mood {}/10\n",
        night.date,
        format_minutes(night.duration_minutes()),
        night.sleep_start.format("%H:%M"),
        night.sleep_end.format("%H:%M"),
        night.sleep_quality,
        night.energy_morning,
        night.mood_morning
    )
}

/// Shows the sleep attributed to a waking date.
pub fn sleep_show<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &S,
    date: &str,
    json: bool,
    today: NaiveDate,
) -> Result<()> {
    let date = parse_date(date, today)?;
    let night = JournalView::new(store).sleep_on(date)?;
    if json {
        return write_json(writer, &night);
    }

    match night {
        Some(night) => write!(writer, "{}", format_sleep(&night))?,
        None => writeln!(writer, "No sleep logged for {date}.")?,
    }
    Ok(())
}

/// Lists logged nights in a date range.
pub fn sleep_list<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &S,
    args: &RangeArgs,
    today: NaiveDate,
) -> Result<()> {
    let from = parse_date(&args.from, today)?;
    let to = parse_date(&args.to, today)?;
    let nights = JournalView::new(store).list_sleep(from, to)?;
    if args.json {
        return write_json(writer, &nights);
    }

    if nights.is_empty() {
        writeln!(writer, "No sleep logged.")?;
        return Ok(());
    }
    for night in &nights {
        write!(writer, "{}", format_sleep(night))?;
    }
    Ok(())
}

fn format_intake(intake: &Intake) -> String {
    let meals: Vec<String> = Meal::ALL
        .iter()
        .filter_map(|meal| {
            intake
                .meal_time(*meal)
                .map(|at| format!("{meal} {}", at.format("%H:%M")))
        })
        .collect();
    let meals = if meals.is_empty() {
        "no meals".to_string()
    } else {
        meals.join(", ")
    };
    format!(
        "{}: {} glasses of water, {meals}\n",
        intake.date, intake.water_count
    )
}

/// Adds a glass of water.
pub fn water<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &mut S,
    date: &str,
    today: NaiveDate,
) -> Result<()> {
    let date = parse_date(date, today)?;
    let intake = Journal::new(store).add_water(date)?;
    write!(writer, "{}", format_intake(&intake))?;
    Ok(())
}

/// Marks a meal as eaten, at `at` or now.
pub fn meal<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &mut S,
    meal: Meal,
    date: &str,
    at: Option<&str>,
    now: NaiveDateTime,
) -> Result<()> {
    let date = parse_date(date, now.date())?;
    let eaten_at = match at {
        Some(at) => parse_datetime(at, date.and_time(now.time()))?,
        None => now,
    };
    let intake = Journal::new(store).log_meal_at(date, meal, eaten_at)?;
    write!(writer, "{}", format_intake(&intake))?;
    Ok(())
}

/// Shows water and meals for a date, or for every logged date up to `to`.
pub fn intake<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &S,
    date: &str,
    to: Option<&str>,
    json: bool,
    today: NaiveDate,
) -> Result<()> {
    let date = parse_date(date, today)?;
    let view = JournalView::new(store);
    let Some(to) = to else {
        let intake = view.intake_on(date)?;
        if json {
            return write_json(writer, &intake);
        }
        write!(writer, "{}", format_intake(&intake))?;
        return Ok(());
    };

    let days = view.list_intake(date, parse_date(to, today)?)?;
    if json {
        return write_json(writer, &days);
    }
    if days.is_empty() {
        writeln!(writer, "No intake logged.")?;
        return Ok(());
    }
    for day in &days {
        write!(writer, "{}", format_intake(day))?;
    }
    Ok(())
}
