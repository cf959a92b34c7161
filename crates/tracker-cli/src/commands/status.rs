use chrono::{DateTime, Utc};
use tracker_core::{CollectionPath, Record};

use crate::error::CliError;
use crate::identity_store::{load_identity, DataPaths};
use crate::session::open_session_as;

/// Pending records whose due date is still ahead of `now`.
pub fn count_upcoming(records: &[Record], now: DateTime<Utc>) -> usize {
    records
        .iter()
        .filter(|record| !record.completed)
        .filter(|record| record.due_date.is_some_and(|due| due > now))
        .count()
}

pub async fn run_status(paths: &DataPaths) -> Result<(), CliError> {
    let Some(identity) = load_identity(&paths.identity_file())? else {
        println!("Signed out");
        return Ok(());
    };

    let session = open_session_as(paths, identity).await?;
    let records = session.handle.records();
    let identity = session.identity().clone();
    let status = session.close().await?;

    let pending = records.iter().filter(|record| !record.completed).count();
    let kind = if identity.is_anonymous { "guest" } else { "account" };
    println!("Identity:   {} ({kind})", identity.uid);
    println!("Collection: {}", CollectionPath::for_identity(&identity));
    println!("Sync:       {status}");
    println!(
        "Tests:      {pending} pending, {} completed",
        records.len() - pending
    );
    println!(
        "Upcoming:   {} with a due date ahead",
        count_upcoming(&records, Utc::now())
    );
    Ok(())
}
