//! Task queue commands.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDateTime;
use icarus_core::{RecordStore, SessionManager, TaskId};

use super::session::{format_context, format_suggestion, resolve_before, resolve_context};
use super::util::write_json;
use crate::{BeforeArgs, ContextArgs};

/// Queues a task created at `now`.
pub fn add<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &mut S,
    args: &ContextArgs,
    now: NaiveDateTime,
) -> Result<()> {
    let resolved = resolve_context(&*store, args, now.date())?;
    let task = SessionManager::new(store).create_task_at(resolved.context, now)?;
    writeln!(writer, "Queued task {}", task.id)?;
    write!(writer, "{}", format_context(&task.context))?;
    if let Some(suggestion) = &resolved.suggestion {
        write!(writer, "{}", format_suggestion(suggestion))?;
    }
    Ok(())
}

/// Lists queued tasks, oldest first.
pub fn list<W: Write, S: RecordStore + ?Sized>(writer: &mut W, store: &S, json: bool) -> Result<()> {
    let tasks = store.list_tasks()?;
    if json {
        return write_json(writer, &tasks);
    }
    if tasks.is_empty() {
        writeln!(writer, "No queued tasks.")?;
        return Ok(());
    }
    for task in &tasks {
        writeln!(
            writer,
            "{} (queued {})",
            task.id,
            task.created_at.format("%Y-%m-%d %H:%M")
        )?;
        write!(writer, "{}", format_context(&task.context))?;
    }
    Ok(())
}

/// Turns a queued task into the active session.
pub fn start<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &mut S,
    id: &TaskId,
    before: &BeforeArgs,
    now: NaiveDateTime,
) -> Result<()> {
    let before = resolve_before(&*store, before, now.date())?;
    let session = SessionManager::new(store).activate_task_at(id, before, now)?;
    writeln!(writer, "Started session {} from task {id}", session.id)?;
    write!(writer, "{}", format_context(&session.context))?;
    Ok(())
}

/// Removes a queued task.
pub fn delete<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &mut S,
    id: &TaskId,
) -> Result<()> {
    let existed = store.get_task(id)?.is_some();
    SessionManager::new(store).delete_task(id)?;
    if existed {
        writeln!(writer, "Deleted task {id}")?;
    } else {
        writeln!(writer, "No task {id}; nothing deleted")?;
    }
    Ok(())
}
