use crate::commands::common::resolve_record;
use crate::error::CliError;
use crate::identity_store::DataPaths;
use crate::session::open_session;

pub async fn run_delete(id: &str, paths: &DataPaths) -> Result<(), CliError> {
    let session = open_session(paths).await?;
    let record_id = resolve_record(&session.handle.records(), id)?;
    session.handle.delete(record_id.clone()).await?;
    session.close().await?;

    println!("{record_id}");
    Ok(())
}
