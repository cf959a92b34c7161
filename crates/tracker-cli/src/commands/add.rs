use chrono::NaiveDate;
use tracker_core::{Priority, RecordDraft};

use crate::commands::common::due_date_from_day;
use crate::error::CliError;
use crate::identity_store::DataPaths;
use crate::session::open_session;

pub struct AddArgs {
    pub name: String,
    pub brand: String,
    pub category: String,
    pub priority: Priority,
    pub notes: Option<String>,
    pub due: Option<NaiveDate>,
}

pub fn build_draft(args: AddArgs) -> Result<RecordDraft, CliError> {
    let mut draft =
        RecordDraft::new(args.name, args.brand, args.category)?.with_priority(args.priority);
    if let Some(notes) = args.notes {
        draft = draft.with_notes(notes);
    }
    if let Some(day) = args.due {
        draft = draft.with_due_date(due_date_from_day(day)?);
    }
    Ok(draft)
}

pub async fn run_add(args: AddArgs, paths: &DataPaths) -> Result<(), CliError> {
    let draft = build_draft(args)?;

    let session = open_session(paths).await?;
    let id = session.handle.add(draft).await?;
    let status = session.close().await?;
    if status.is_error() {
        eprintln!("Saved locally; {status}");
    }

    println!("{id}");
    Ok(())
}
