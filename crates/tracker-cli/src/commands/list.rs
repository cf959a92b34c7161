use tracker_core::Record;

use crate::commands::common::{format_record_lines, record_to_list_item, RecordListItem};
use crate::error::CliError;
use crate::identity_store::DataPaths;
use crate::session::open_session;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ListFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl ListFilter {
    pub const fn from_flags(completed: bool, pending: bool) -> Self {
        if completed {
            Self::Completed
        } else if pending {
            Self::Pending
        } else {
            Self::All
        }
    }

    pub const fn matches(self, record: &Record) -> bool {
        match self {
            Self::All => true,
            Self::Pending => !record.completed,
            Self::Completed => record.completed,
        }
    }
}

pub async fn run_list(filter: ListFilter, as_json: bool, paths: &DataPaths) -> Result<(), CliError> {
    let session = open_session(paths).await?;
    let records = session
        .handle
        .records()
        .iter()
        .filter(|record| filter.matches(record))
        .cloned()
        .collect::<Vec<_>>();
    session.close().await?;

    if as_json {
        let json_items = records
            .iter()
            .map(record_to_list_item)
            .collect::<Vec<RecordListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        for line in format_record_lines(&records) {
            println!("{line}");
        }
    }

    Ok(())
}
