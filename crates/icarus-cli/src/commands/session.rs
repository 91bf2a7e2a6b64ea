//! Session commands: start, end, status, correct, delete and log.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use icarus_core::patterns::classify;
use icarus_core::{
    AfterState, BeforeState, CompletedSession, KeywordSuggester, Level, Outcome, PatternPolicy,
    Rating, RecordStore, Session, SessionContext, SessionId, SessionManager, Suggestion, WorkType,
    WorkTypeSuggester, session_score,
};
use serde::Serialize;
use tracing::debug;

use super::util::{format_minutes, parse_date, parse_datetime, write_json};
use crate::{
    AfterArgs, BeforeArgs, ContextArgs, EndArgs, LogArgs, OutcomeArgs, SessionsArgs, StartArgs,
};

/// Days of past sessions the work-type suggester learns from.
const SUGGESTION_HISTORY_DAYS: i64 = 30;

/// A session context, plus the suggestion that filled in its work type.
pub struct ResolvedContext {
    pub context: SessionContext,
    pub suggestion: Option<Suggestion>,
}

/// Builds a context from arguments, suggesting a work type when none was given.
pub fn resolve_context<S: RecordStore + ?Sized>(
    store: &S,
    args: &ContextArgs,
    today: NaiveDate,
) -> Result<ResolvedContext> {
    let suggestion = match args.work_type {
        Some(_) => None,
        None => Some(suggest_work_type(store, &args.activity, today)?),
    };
    let work_type = args
        .work_type
        .or_else(|| suggestion.as_ref().map(|s| s.work_type))
        .unwrap_or(WorkType::Unknown);

    Ok(ResolvedContext {
        context: SessionContext {
            domain: args.domain,
            work_type,
            project_name: args.project.clone(),
            activity_description: args.activity.clone(),
            planned_duration_min: args.planned,
        },
        suggestion,
    })
}

/// Suggests a work type for `text`, blended with recent labelled sessions.
pub fn suggest_work_type<S: RecordStore + ?Sized>(
    store: &S,
    text: &str,
    today: NaiveDate,
) -> Result<Suggestion> {
    let history = store.sessions_between(
        today - Duration::days(SUGGESTION_HISTORY_DAYS),
        today,
    )?;
    let labelled = history
        .iter()
        .filter(|s| !s.is_active() && s.context.work_type != WorkType::Unknown);
    let suggestion = KeywordSuggester::new().with_history(labelled).suggest(text);
    debug!(
        work_type = %suggestion.work_type,
        score = suggestion.score,
        "work type suggested"
    );
    Ok(suggestion)
}

/// Builds a before-state, carrying energy and stress over from the last
/// session that ended on `today` when they are not given.
pub fn resolve_before<S: RecordStore + ?Sized>(
    store: &S,
    args: &BeforeArgs,
    today: NaiveDate,
) -> Result<BeforeState> {
    let carried = if args.energy.is_some() && args.stress.is_some() {
        None
    } else {
        last_after_state(store, today)?
    };

    let energy = args
        .energy
        .or_else(|| carried.as_ref().map(|after| after.energy.get()))
        .context("--energy is required when no session has ended today")?;
    let stress = args
        .stress
        .or_else(|| carried.as_ref().map(|after| after.stress.get()))
        .context("--stress is required when no session has ended today")?;

    Ok(BeforeState {
        energy: Level::new(energy)?,
        stress: Level::new(stress)?,
        resistance: Rating::new(args.resistance)?,
    })
}

fn last_after_state<S: RecordStore + ?Sized>(
    store: &S,
    today: NaiveDate,
) -> Result<Option<AfterState>> {
    // sessions are found by start date, so look back a day for ones that
    // crossed midnight
    let sessions = store.sessions_between(today - Duration::days(1), today)?;
    Ok(sessions
        .iter()
        .filter_map(|s| s.end_time().map(|end| (end, s)))
        .filter(|(end, _)| end.date() == today)
        .max_by_key(|(end, _)| *end)
        .and_then(|(_, s)| s.after().cloned()))
}

fn outcome_from(args: &OutcomeArgs) -> Result<Outcome> {
    Ok(Outcome {
        completion_status: args.status,
        progress_rating: Rating::new(args.progress)?,
        quality_rating: Rating::new(args.quality)?,
        focus_quality: Rating::new(args.focus)?,
        moves_main_goal: args.moves_goal,
        evidence_note: args.evidence.clone(),
    })
}

fn after_from(args: &AfterArgs) -> Result<AfterState> {
    Ok(AfterState {
        energy: Level::new(args.energy_after)?,
        stress: Level::new(args.stress_after)?,
        feel_tag: args.feel.clone(),
    })
}

/// Formats the context lines shared by session and task output.
pub fn format_context(context: &SessionContext) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {} / {}: {}",
        context.domain, context.work_type, context.project_name
    );
    let _ = writeln!(out, "  {}", context.activity_description);
    if let Some(planned) = context.planned_duration_min {
        let _ = writeln!(out, "  Planned: {}", format_minutes(i64::from(planned)));
    }
    out
}

/// Formats the line explaining a suggested work type.
pub fn format_suggestion(suggestion: &Suggestion) -> String {
    let confidence = match suggestion.confidence {
        icarus_core::Confidence::High => "high",
        icarus_core::Confidence::Medium => "medium",
        icarus_core::Confidence::Low => "low",
    };
    format!(
        "  Suggested {} ({confidence} confidence): {}\n",
        suggestion.work_type,
        suggestion.reasons.join("; ")
    )
}

fn format_finished(verb: &str, session: &Session, policy: &PatternPolicy) -> String {
    let mut out = String::new();
    let minutes = session.duration_minutes().unwrap_or(0);
    let _ = writeln!(out, "{verb} session {}: {}", session.id, format_minutes(minutes));
    out.push_str(&format_context(&session.context));
    if let Some(outcome) = session.outcome() {
        let _ = writeln!(
            out,
            "  {} | score {:.0}",
            outcome.completion_status,
            session_score(outcome)
        );
    }
    if let Some(pattern) = classify(session, policy) {
        let _ = writeln!(out, "  Pattern: {pattern}");
    }
    if let Some(delta) = session.energy_delta() {
        let _ = writeln!(out, "  Energy: {delta:+}");
    }
    out
}

fn format_session_line(session: &Session) -> String {
    let length = session
        .duration_minutes()
        .map_or_else(|| "active".to_string(), format_minutes);
    format!(
        "{}  {}  {length:>7}  {} / {}: {}\n",
        session.id,
        session.start_time.format("%Y-%m-%d %H:%M"),
        session.context.domain,
        session.context.work_type,
        session.context.project_name
    )
}

/// Lists sessions started in a date range, or the most recent ones.
pub fn sessions<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &S,
    args: &SessionsArgs,
    today: NaiveDate,
) -> Result<()> {
    let sessions = if let Some(limit) = args.limit {
        store.recent_sessions(limit)?
    } else {
        let from = args.from.as_deref().map_or(Ok(today), |s| parse_date(s, today))?;
        let to = args.to.as_deref().map_or(Ok(today), |s| parse_date(s, today))?;
        store.sessions_between(from.min(to), from.max(to))?
    };
    if args.json {
        return write_json(writer, &sessions);
    }

    if sessions.is_empty() {
        writeln!(writer, "No sessions.")?;
        return Ok(());
    }
    for session in &sessions {
        write!(writer, "{}", format_session_line(session))?;
    }
    Ok(())
}

/// Starts a session at `now`.
pub fn start<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &mut S,
    args: &StartArgs,
    now: NaiveDateTime,
) -> Result<()> {
    let resolved = resolve_context(&*store, &args.context, now.date())?;
    let before = resolve_before(&*store, &args.before, now.date())?;
    let session = SessionManager::new(store).start_at(resolved.context, before, now)?;

    if args.json {
        return write_json(writer, &session);
    }
    writeln!(writer, "Started session {}", session.id)?;
    write!(writer, "{}", format_context(&session.context))?;
    if let Some(suggestion) = &resolved.suggestion {
        write!(writer, "{}", format_suggestion(suggestion))?;
    }
    Ok(())
}

/// Ends the given session, or the active one, at `now`.
pub fn end<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &mut S,
    args: &EndArgs,
    policy: &PatternPolicy,
    now: NaiveDateTime,
) -> Result<()> {
    let outcome = outcome_from(&args.outcome)?;
    let after = after_from(&args.after)?;
    let mut manager = SessionManager::new(store);
    let id = match &args.id {
        Some(id) => id.clone(),
        None => {
            manager
                .active_session()?
                .context("no active session to end")?
                .id
        }
    };

    let session = manager.end_at(&id, outcome, after, now)?;
    if args.json {
        return write_json(writer, &session);
    }
    write!(writer, "{}", format_finished("Ended", &session, policy))?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct StatusReport {
    active: Option<Session>,
    elapsed_minutes: Option<i64>,
}

/// Shows the active session, if any.
pub fn status<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &S,
    json: bool,
    now: NaiveDateTime,
) -> Result<()> {
    let active = store.active_session()?;
    if json {
        let elapsed_minutes = active.as_ref().map(|s| s.elapsed_minutes(now));
        return write_json(
            writer,
            &StatusReport {
                active,
                elapsed_minutes,
            },
        );
    }

    let Some(session) = active else {
        writeln!(writer, "No active session.")?;
        return Ok(());
    };
    writeln!(writer, "Active session {}", session.id)?;
    write!(writer, "{}", format_context(&session.context))?;
    writeln!(
        writer,
        "  Started {} ({} ago)",
        session.start_time.format("%Y-%m-%d %H:%M"),
        format_minutes(session.elapsed_minutes(now))
    )?;
    if let Some(planned) = session.context.planned_duration_min {
        let left = i64::from(planned) - session.elapsed_minutes(now);
        if left >= 0 {
            writeln!(writer, "  {} left of plan", format_minutes(left))?;
        } else {
            writeln!(writer, "  {} over plan", format_minutes(-left))?;
        }
    }
    Ok(())
}

/// Overwrites the work type of an ended session.
pub fn correct<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &mut S,
    id: &SessionId,
    work_type: WorkType,
) -> Result<()> {
    let session = SessionManager::new(store).correct_work_type(id, work_type)?;
    writeln!(
        writer,
        "Session {} is now {}",
        session.id, session.context.work_type
    )?;
    Ok(())
}

/// Hard-deletes a session.
pub fn delete<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &mut S,
    id: &SessionId,
) -> Result<()> {
    let existed = store.get_session(id)?.is_some();
    SessionManager::new(store).delete(id)?;
    if existed {
        writeln!(writer, "Deleted session {id}")?;
    } else {
        writeln!(writer, "No session {id}; nothing deleted")?;
    }
    Ok(())
}

/// Records a session that already happened.
pub fn log<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &mut S,
    args: &LogArgs,
    policy: &PatternPolicy,
    now: NaiveDateTime,
) -> Result<()> {
    let start_time = parse_datetime(&args.from, now)?;
    let end_time = parse_datetime(&args.until, now)?;
    let resolved = resolve_context(&*store, &args.context, start_time.date())?;
    let before = resolve_before(&*store, &args.before, start_time.date())?;

    let completed = CompletedSession {
        context: resolved.context,
        before,
        start_time,
        end_time,
        outcome: outcome_from(&args.outcome)?,
        after: after_from(&args.after)?,
    };
    let session = SessionManager::new(store).log_completed_at(completed, now)?;

    if args.json {
        return write_json(writer, &session);
    }
    write!(writer, "{}", format_finished("Logged", &session, policy))?;
    if let Some(suggestion) = &resolved.suggestion {
        write!(writer, "{}", format_suggestion(suggestion))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use icarus_core::{CompletionStatus, Domain, EngineError};
    use icarus_db::Database;
    use insta::assert_snapshot;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn context_args(work_type: Option<WorkType>) -> ContextArgs {
        ContextArgs {
            activity: "implement the calendar grid".to_string(),
            project: "icarus".to_string(),
            domain: Domain::PersonalProject,
            work_type,
            planned: Some(90),
        }
    }

    fn before_args(energy: Option<u8>, stress: Option<u8>) -> BeforeArgs {
        BeforeArgs {
            energy,
            stress,
            resistance: 2,
        }
    }

    fn start_args(work_type: Option<WorkType>) -> StartArgs {
        StartArgs {
            context: context_args(work_type),
            before: before_args(Some(6), Some(3)),
            json: false,
        }
    }

    fn end_args() -> EndArgs {
        EndArgs {
            id: None,
            outcome: OutcomeArgs {
                status: CompletionStatus::Completed,
                progress: 5,
                quality: 4,
                focus: 4,
                moves_goal: true,
                evidence: Some("grid renders".to_string()),
            },
            after: AfterArgs {
                energy_after: 5,
                stress_after: 2,
                feel: "clear".to_string(),
            },
            json: false,
        }
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut output = Vec::new();
        f(&mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    fn redact(output: &str, id: &impl ToString) -> String {
        output.replace(&id.to_string(), "[ID]")
    }

    #[test]
    fn start_status_end_flow() {
        let mut db = Database::open_in_memory().unwrap();

        let output = render(|w| start(w, &mut db, &start_args(Some(WorkType::Deep)), at(9, 0)));
        let id = db.active_session().unwrap().unwrap().id;
        assert_snapshot!(redact(&output, &id), @r"
        Started session [ID]
          Personal Project / Deep: icarus
          implement the calendar grid
          Planned: 1h 30m
        ");

        let output = render(|w| status(w, &db, false, at(10, 45)));
        assert_snapshot!(redact(&output, &id), @r"
        Active session [ID]
          Personal Project / Deep: icarus
          implement the calendar grid
          Planned: 1h 30m
          Started 2025-03-05 09:00 (1h 45m ago)
          15m over plan
        ");

        let output = render(|w| end(w, &mut db, &end_args(), &PatternPolicy::default(), at(10, 30)));
        // (5*2 + 4*1.5 + 4) / 22.5 = 88.9
        assert_snapshot!(redact(&output, &id), @r"
        Ended session [ID]: 1h 30m
          Personal Project / Deep: icarus
          implement the calendar grid
          Planned: 1h 30m
          Completed | score 89
          Pattern: Clean Win
          Energy: -1
        ");

        let output = render(|w| status(w, &db, false, at(11, 0)));
        assert_eq!(output, "No active session.\n");
    }

    #[test]
    fn second_start_reports_the_open_session() {
        let mut db = Database::open_in_memory().unwrap();
        render(|w| start(w, &mut db, &start_args(Some(WorkType::Deep)), at(9, 0)));

        let mut output = Vec::new();
        let err = start(&mut output, &mut db, &start_args(Some(WorkType::Deep)), at(9, 5))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::Conflict { active: Some(_) })
        ));
    }

    #[test]
    fn missing_type_is_suggested() {
        let mut db = Database::open_in_memory().unwrap();
        let output = render(|w| start(w, &mut db, &start_args(None), at(9, 0)));

        let session = db.active_session().unwrap().unwrap();
        assert_eq!(session.context.work_type, WorkType::Deep);
        assert!(output.contains("Suggested Deep"));
        assert!(output.contains("Keywords matched: implement"));
    }

    #[test]
    fn before_state_carries_over_from_last_session_today() {
        let mut db = Database::open_in_memory().unwrap();
        render(|w| start(w, &mut db, &start_args(Some(WorkType::Deep)), at(9, 0)));
        render(|w| end(w, &mut db, &end_args(), &PatternPolicy::default(), at(10, 0)));

        let mut args = start_args(Some(WorkType::Shallow));
        args.before = before_args(None, None);
        render(|w| start(w, &mut db, &args, at(10, 15)));

        let session = db.active_session().unwrap().unwrap();
        assert_eq!(session.before.energy.get(), 5);
        assert_eq!(session.before.stress.get(), 2);
    }

    #[test]
    fn before_state_carries_over_from_session_that_crossed_midnight() {
        let mut db = Database::open_in_memory().unwrap();
        let late = at(0, 0) - Duration::minutes(30);
        render(|w| start(w, &mut db, &start_args(Some(WorkType::Deep)), late));
        render(|w| end(w, &mut db, &end_args(), &PatternPolicy::default(), at(0, 40)));

        let mut args = start_args(Some(WorkType::Shallow));
        args.before = before_args(None, None);
        render(|w| start(w, &mut db, &args, at(0, 45)));

        let session = db.active_session().unwrap().unwrap();
        assert_eq!(session.before.energy.get(), 5);
        assert_eq!(session.before.stress.get(), 2);
    }

    #[test]
    fn yesterdays_sessions_do_not_carry_over() {
        let mut db = Database::open_in_memory().unwrap();
        let evening = at(0, 0) - Duration::hours(4);
        render(|w| start(w, &mut db, &start_args(Some(WorkType::Deep)), evening));
        let ended = at(0, 0) - Duration::hours(3);
        render(|w| end(w, &mut db, &end_args(), &PatternPolicy::default(), ended));

        let mut args = start_args(Some(WorkType::Shallow));
        args.before = before_args(None, None);
        let mut output = Vec::new();
        let err = start(&mut output, &mut db, &args, at(9, 0)).unwrap_err();
        assert!(err.to_string().contains("--energy is required"));
    }

    #[test]
    fn first_session_of_the_day_needs_energy() {
        let mut db = Database::open_in_memory().unwrap();
        let mut args = start_args(Some(WorkType::Deep));
        args.before = before_args(None, Some(3));
        let mut output = Vec::new();
        let err = start(&mut output, &mut db, &args, at(9, 0)).unwrap_err();
        assert!(err.to_string().contains("--energy is required"));
        assert_eq!(db.active_session().unwrap(), None);
    }

    #[test]
    fn end_without_active_session_fails() {
        let mut db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        let err = end(&mut output, &mut db, &end_args(), &PatternPolicy::default(), at(9, 0))
            .unwrap_err();
        assert_eq!(err.to_string(), "no active session to end");
    }

    #[test]
    fn log_correct_delete() {
        let mut db = Database::open_in_memory().unwrap();
        let args = LogArgs {
            context: context_args(Some(WorkType::Unknown)),
            from: "08:00".to_string(),
            until: "08:40".to_string(),
            before: before_args(Some(4), Some(6)),
            outcome: end_args().outcome,
            after: AfterArgs {
                energy_after: 2,
                stress_after: 8,
                feel: "drained".to_string(),
            },
            json: false,
        };
        let output = render(|w| log(w, &mut db, &args, &PatternPolicy::default(), at(12, 0)));
        let session = db.sessions_on(at(0, 0).date()).unwrap().remove(0);
        assert_snapshot!(redact(&output, &session.id), @r"
        Logged session [ID]: 40m
          Personal Project / Unknown: icarus
          implement the calendar grid
          Planned: 1h 30m
          Completed | score 89
          Pattern: Overclocked
          Energy: -2
        ");
        assert_eq!(db.active_session().unwrap(), None);

        let output = render(|w| correct(w, &mut db, &session.id, WorkType::Deep));
        assert_eq!(redact(&output, &session.id), "Session [ID] is now Deep\n");

        let output = render(|w| delete(w, &mut db, &session.id));
        assert_eq!(redact(&output, &session.id), "Deleted session [ID]\n");
        let output = render(|w| delete(w, &mut db, &session.id));
        assert_eq!(
            redact(&output, &session.id),
            "No session [ID]; nothing deleted\n"
        );
    }

    fn sessions_args(from: Option<&str>, to: Option<&str>, limit: Option<usize>) -> SessionsArgs {
        SessionsArgs {
            from: from.map(str::to_string),
            to: to.map(str::to_string),
            limit,
            json: false,
        }
    }

    #[test]
    fn sessions_list_by_range_and_recency() {
        let mut db = Database::open_in_memory().unwrap();
        let yesterday = at(9, 0) - Duration::days(1);
        render(|w| start(w, &mut db, &start_args(Some(WorkType::Deep)), yesterday));
        let first = db.active_session().unwrap().unwrap().id;
        let ended = yesterday + Duration::minutes(50);
        render(|w| end(w, &mut db, &end_args(), &PatternPolicy::default(), ended));
        render(|w| start(w, &mut db, &start_args(Some(WorkType::Shallow)), at(9, 0)));
        let second = db.active_session().unwrap().unwrap().id;
        let redact_both = |output: String| redact(&redact(&output, &first), &second);

        let today = at(0, 0).date();

        let output = render(|w| sessions(w, &db, &sessions_args(None, None, None), today));
        assert_snapshot!(
            redact_both(output),
            @"[ID]  2025-03-05 09:00   active  Personal Project / Shallow: icarus"
        );

        let output = render(|w| sessions(w, &db, &sessions_args(Some("yesterday"), None, None), today));
        assert_snapshot!(redact_both(output), @r"
        [ID]  2025-03-04 09:00      50m  Personal Project / Deep: icarus
        [ID]  2025-03-05 09:00   active  Personal Project / Shallow: icarus
        ");

        let output = render(|w| sessions(w, &db, &sessions_args(None, None, Some(1)), today));
        assert!(output.starts_with(&second.to_string()));
        assert_eq!(output.lines().count(), 1);

        let january = sessions_args(Some("2025-01-31"), Some("2025-01-01"), None);
        let output = render(|w| sessions(w, &db, &january, today));
        assert_eq!(output, "No sessions.\n");

        let mut json = sessions_args(Some("yesterday"), None, None);
        json.json = true;
        let output = render(|w| sessions(w, &db, &json, today));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value[0]["id"], first.to_string());
        assert_eq!(value[1]["context"]["work_type"], "Shallow");
    }

    #[test]
    fn status_json_reports_elapsed_minutes() {
        let mut db = Database::open_in_memory().unwrap();
        render(|w| start(w, &mut db, &start_args(Some(WorkType::Deep)), at(9, 0)));
        let output = render(|w| status(w, &db, true, at(9, 20)));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["elapsed_minutes"], 20);
        assert_eq!(value["active"]["context"]["domain"], "Personal Project");
        assert_eq!(value["active"]["end"], serde_json::Value::Null);
    }
}
