use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use tracker_core::{Record, RecordId};

use crate::error::CliError;

const MAX_AMBIGUOUS_MATCHES: usize = 3;

#[derive(Debug, Serialize)]
pub struct RecordListItem {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub priority: String,
    pub completed: bool,
    pub notes: String,
    pub due_date: Option<String>,
    pub created_at: String,
    pub has_photo: bool,
}

pub fn record_to_list_item(record: &Record) -> RecordListItem {
    RecordListItem {
        id: record.id.to_string(),
        name: record.name.clone(),
        brand: record.brand.clone(),
        category: record.category.clone(),
        priority: record.priority.as_str().to_string(),
        completed: record.completed,
        notes: record.notes.clone(),
        due_date: record.due_date.map(format_day),
        created_at: record.created_at.to_rfc3339(),
        has_photo: record.has_photo(),
    }
}

pub fn format_record_line(record: &Record) -> String {
    let mark = if record.completed { "[x]" } else { "[ ]" };
    let priority = record.priority.label();
    let base = format!(
        "{}  {mark}  {priority:<7}  {} - {} ({})",
        record.id, record.name, record.brand, record.category
    );
    match record.due_date {
        Some(due) => format!("{base}  due {}", format_day(due)),
        None => base,
    }
}

pub fn format_record_lines(records: &[Record]) -> Vec<String> {
    records.iter().map(format_record_line).collect()
}

/// Local calendar day of a timestamp, `YYYY-MM-DD`.
pub fn format_day(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d")
        .to_string()
}

/// A due date given as a calendar day, pinned to local noon.
pub fn due_date_from_day(day: NaiveDate) -> Result<DateTime<Utc>, CliError> {
    let noon = day
        .and_hms_opt(12, 0, 0)
        .ok_or_else(|| CliError::InvalidDueDate(day.to_string()))?;
    Local
        .from_local_datetime(&noon)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| CliError::InvalidDueDate(day.to_string()))
}

pub fn normalize_record_identifier(value: &str) -> Result<String, CliError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CliError::EmptyRecordId);
    }
    Ok(value.to_string())
}

/// Find the record whose id is `query` or starts with it.
pub fn resolve_record(records: &[Record], query: &str) -> Result<RecordId, CliError> {
    let query = normalize_record_identifier(query)?;
    if let Some(record) = records.iter().find(|r| r.id.as_str() == query) {
        return Ok(record.id.clone());
    }

    let matching: Vec<&Record> = records
        .iter()
        .filter(|r| r.id.as_str().starts_with(&query))
        .collect();

    match matching.as_slice() {
        [] => Err(CliError::RecordNotFound(query)),
        [record] => Ok(record.id.clone()),
        _ => {
            let options = matching
                .iter()
                .take(MAX_AMBIGUOUS_MATCHES)
                .map(|r| format!("{} ({})", r.id, r.name))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousRecordId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}
