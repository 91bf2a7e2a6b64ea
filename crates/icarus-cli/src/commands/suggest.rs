//! Work-type suggestions for free text.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use icarus_core::{Confidence, RecordStore};

use super::session::suggest_work_type;
use super::util::write_json;

/// Suggests a work type for `text`, learning from the last month of sessions.
pub fn suggest<W: Write, S: RecordStore + ?Sized>(
    writer: &mut W,
    store: &S,
    text: &str,
    json: bool,
    today: NaiveDate,
) -> Result<()> {
    let suggestion = suggest_work_type(store, text, today)?;
    if json {
        return write_json(writer, &suggestion);
    }

    let confidence = match suggestion.confidence {
        Confidence::High => "high",
        Confidence::Medium => "medium",
        Confidence::Low => "low",
    };
    writeln!(writer, "{} ({confidence} confidence)", suggestion.work_type)?;
    for reason in &suggestion.reasons {
        writeln!(writer, "  {reason}")?;
    }
    Ok(())
}
