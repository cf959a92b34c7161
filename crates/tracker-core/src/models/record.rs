//! Record model

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{Error, Result};

use super::Priority;

/// Identifier of a record.
///
/// New records get a UUID v7 string. Identifiers coming from the remote
/// collection are kept verbatim, whatever their shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create a new unique record ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Wrap an existing identifier. Empty identifiers are rejected.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(Error::InvalidInput("Record id cannot be empty".to_string()));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Photo attached to a record. Replaced as a whole, never patched.
#[derive(Clone, PartialEq, Eq)]
pub struct Photo(Vec<u8>);

impl Photo {
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Standard base64 form used on the wire and in the bootstrap cache.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    pub fn from_base64(encoded: &str) -> Result<Self> {
        STANDARD
            .decode(encoded.trim())
            .map(Self)
            .map_err(|error| Error::Decode(format!("invalid photo data: {error}")))
    }
}

impl fmt::Debug for Photo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Photo({} bytes)", self.0.len())
    }
}

impl Serialize for Photo {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Photo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

/// A tracked product test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier, stable for the record's lifetime
    pub id: RecordId,
    /// Product name
    pub name: String,
    /// Product brand
    pub brand: String,
    /// Category tag, opaque to the core
    pub category: String,
    /// Whether the test has been done
    pub completed: bool,
    pub priority: Priority,
    /// Free-form notes
    pub notes: String,
    /// When the test is due. `None` means no reminder.
    pub due_date: Option<DateTime<Utc>>,
    /// Creation timestamp, never mutated
    pub created_at: DateTime<Utc>,
    pub photo: Option<Photo>,
}

impl Record {
    #[must_use]
    pub const fn has_photo(&self) -> bool {
        self.photo.is_some()
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        !self.completed
    }
}

/// Input for creating a record. The id and creation time are assigned by
/// the sync engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDraft {
    pub name: String,
    pub brand: String,
    pub category: String,
    pub priority: Priority,
    pub notes: String,
    pub due_date: Option<DateTime<Utc>>,
    pub photo: Option<Photo>,
}

impl RecordDraft {
    /// Create a draft with the required fields. Name and brand are trimmed
    /// and must not be empty.
    pub fn new(
        name: impl Into<String>,
        brand: impl Into<String>,
        category: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into().trim().to_string();
        let brand = brand.into().trim().to_string();
        if name.is_empty() {
            return Err(Error::InvalidInput("Record name cannot be empty".to_string()));
        }
        if brand.is_empty() {
            return Err(Error::InvalidInput(
                "Record brand cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            name,
            brand,
            category: category.into(),
            priority: Priority::default(),
            notes: String::new(),
            due_date: None,
            photo: None,
        })
    }

    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    #[must_use]
    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    #[must_use]
    pub fn with_photo(mut self, photo: Photo) -> Self {
        self.photo = Some(photo);
        self
    }

    /// Turn the draft into a record with the given identity and creation time.
    #[must_use]
    pub fn into_record(self, id: RecordId, created_at: DateTime<Utc>) -> Record {
        Record {
            id,
            name: self.name,
            brand: self.brand,
            category: self.category,
            completed: false,
            priority: self.priority,
            notes: self.notes,
            due_date: self.due_date,
            created_at,
            photo: self.photo,
        }
    }
}
