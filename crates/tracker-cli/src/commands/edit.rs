use chrono::{DateTime, NaiveDate, Utc};
use tracker_core::{Priority, Record};

use crate::commands::common::{due_date_from_day, format_record_line, resolve_record};
use crate::error::CliError;
use crate::identity_store::DataPaths;
use crate::session::open_session;

#[derive(Debug, Default)]
pub struct EditArgs {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub notes: Option<String>,
    pub due: Option<NaiveDate>,
    pub clear_due: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DueChange {
    Keep,
    Set(DateTime<Utc>),
    Clear,
}

/// Field changes validated up front, applied inside the engine.
#[derive(Debug)]
pub struct RecordChanges {
    name: Option<String>,
    brand: Option<String>,
    category: Option<String>,
    priority: Option<Priority>,
    notes: Option<String>,
    due: DueChange,
}

impl RecordChanges {
    pub fn from_args(args: EditArgs) -> Result<Self, CliError> {
        let due = match (args.due, args.clear_due) {
            (Some(day), _) => DueChange::Set(due_date_from_day(day)?),
            (None, true) => DueChange::Clear,
            (None, false) => DueChange::Keep,
        };
        let changes = Self {
            name: required_text("name", args.name)?,
            brand: required_text("brand", args.brand)?,
            category: args.category,
            priority: args.priority,
            notes: args.notes,
            due,
        };
        if changes.is_empty() {
            return Err(CliError::NothingToEdit);
        }
        Ok(changes)
    }

    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.brand.is_none()
            && self.category.is_none()
            && self.priority.is_none()
            && self.notes.is_none()
            && self.due == DueChange::Keep
    }

    pub fn apply(self, record: &mut Record) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(brand) = self.brand {
            record.brand = brand;
        }
        if let Some(category) = self.category {
            record.category = category;
        }
        if let Some(priority) = self.priority {
            record.priority = priority;
        }
        if let Some(notes) = self.notes {
            record.notes = notes;
        }
        match self.due {
            DueChange::Keep => {}
            DueChange::Set(due) => record.due_date = Some(due),
            DueChange::Clear => record.due_date = None,
        }
    }
}

fn required_text(field: &str, value: Option<String>) -> Result<Option<String>, CliError> {
    match value {
        None => Ok(None),
        Some(value) => {
            let value = value.trim();
            if value.is_empty() {
                Err(CliError::Core(tracker_core::Error::InvalidInput(format!(
                    "Record {field} cannot be empty"
                ))))
            } else {
                Ok(Some(value.to_string()))
            }
        }
    }
}

pub async fn run_edit(id: &str, args: EditArgs, paths: &DataPaths) -> Result<(), CliError> {
    let changes = RecordChanges::from_args(args)?;

    let session = open_session(paths).await?;
    let record_id = resolve_record(&session.handle.records(), id)?;
    let record = session
        .handle
        .update(record_id, move |record| changes.apply(record))
        .await?;
    session.close().await?;

    println!("{}", format_record_line(&record));
    Ok(())
}
