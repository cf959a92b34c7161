//! Data models for the tracker

mod document;
mod priority;
mod record;
mod seed;

pub use document::{decode_document, encode_record, RemoteDocument};
pub use priority::Priority;
pub use record::{Photo, Record, RecordDraft, RecordId};
pub use seed::starter_drafts;
