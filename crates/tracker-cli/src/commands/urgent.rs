use tracker_core::store::most_urgent;

use crate::commands::common::format_record_line;
use crate::error::CliError;
use crate::identity_store::DataPaths;
use crate::session::open_session;

pub async fn run_urgent(paths: &DataPaths) -> Result<(), CliError> {
    let session = open_session(paths).await?;
    let records = session.handle.records();
    session.close().await?;

    match most_urgent(&records) {
        Some(record) => println!("{}", format_record_line(record)),
        None => println!("Nothing left to test"),
    }
    Ok(())
}
