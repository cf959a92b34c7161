use crate::commands::common::{format_record_line, resolve_record};
use crate::error::CliError;
use crate::identity_store::DataPaths;
use crate::session::open_session;

pub async fn run_toggle(id: &str, paths: &DataPaths) -> Result<(), CliError> {
    let session = open_session(paths).await?;
    let record_id = resolve_record(&session.handle.records(), id)?;
    let record = session.handle.toggle_completed(record_id).await?;
    session.close().await?;

    println!("{}", format_record_line(&record));
    Ok(())
}
