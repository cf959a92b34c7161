//! Remote document codec
//!
//! Remote documents are flat JSON objects keyed by record id:
//!
//! ```text
//! name: string, brand: string, category: string, isCompleted: bool,
//! priority: string, notes: string, dueDate: timestamp?, createdDate: timestamp,
//! photoData: bytes?
//! ```
//!
//! Timestamps are written as RFC 3339 strings. Numeric timestamps written by
//! older clients are read as seconds since 2001-01-01T00:00:00Z. Bytes are
//! standard base64.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

use super::{Photo, Priority, Record, RecordId};

const FIELD_NAME: &str = "name";
const FIELD_BRAND: &str = "brand";
const FIELD_CATEGORY: &str = "category";
const FIELD_COMPLETED: &str = "isCompleted";
const FIELD_PRIORITY: &str = "priority";
const FIELD_NOTES: &str = "notes";
const FIELD_DUE_DATE: &str = "dueDate";
const FIELD_CREATED_DATE: &str = "createdDate";
const FIELD_PHOTO: &str = "photoData";

/// Unix timestamp of 2001-01-01T00:00:00Z.
const REFERENCE_DATE_UNIX_SECS: i64 = 978_307_200;

/// A document of the remote collection: its key and its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl RemoteDocument {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Encode a record as a full remote document.
pub fn encode_record(record: &Record) -> RemoteDocument {
    let mut fields = Map::new();
    fields.insert(FIELD_NAME.into(), Value::String(record.name.clone()));
    fields.insert(FIELD_BRAND.into(), Value::String(record.brand.clone()));
    fields.insert(FIELD_CATEGORY.into(), Value::String(record.category.clone()));
    fields.insert(FIELD_COMPLETED.into(), Value::Bool(record.completed));
    fields.insert(
        FIELD_PRIORITY.into(),
        Value::String(record.priority.as_str().to_string()),
    );
    fields.insert(FIELD_NOTES.into(), Value::String(record.notes.clone()));
    if let Some(due_date) = record.due_date {
        fields.insert(FIELD_DUE_DATE.into(), encode_timestamp(due_date));
    }
    fields.insert(
        FIELD_CREATED_DATE.into(),
        encode_timestamp(record.created_at),
    );
    if let Some(photo) = &record.photo {
        fields.insert(FIELD_PHOTO.into(), Value::String(photo.to_base64()));
    }

    RemoteDocument::new(record.id.as_str(), fields)
}

/// Decode a remote document into a record.
///
/// `name`, `brand`, `category` and `createdDate` are required. Missing
/// `isCompleted`, `priority` and `notes` take their defaults, and an
/// unrecognized priority is coerced rather than rejected.
pub fn decode_document(document: &RemoteDocument) -> Result<Record> {
    let fields = &document.fields;
    let id = RecordId::parse(document.id.clone())
        .map_err(|_| Error::Decode("document id is empty".to_string()))?;

    let priority = match fields.get(FIELD_PRIORITY) {
        Some(Value::String(raw)) => Priority::from_wire(raw),
        _ => Priority::default(),
    };

    let completed = match fields.get(FIELD_COMPLETED) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(value)) => *value,
        Some(other) => return Err(type_error(FIELD_COMPLETED, "bool", other)),
    };

    let notes = match fields.get(FIELD_NOTES) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(value)) => value.clone(),
        Some(other) => return Err(type_error(FIELD_NOTES, "string", other)),
    };

    let due_date = match fields.get(FIELD_DUE_DATE) {
        None | Some(Value::Null) => None,
        Some(value) => Some(decode_timestamp(FIELD_DUE_DATE, value)?),
    };

    let created_at = match fields.get(FIELD_CREATED_DATE) {
        None | Some(Value::Null) => return Err(missing(FIELD_CREATED_DATE)),
        Some(value) => decode_timestamp(FIELD_CREATED_DATE, value)?,
    };

    let photo = match fields.get(FIELD_PHOTO) {
        None | Some(Value::Null) => None,
        Some(Value::String(encoded)) => Some(Photo::from_base64(encoded)?),
        Some(other) => return Err(type_error(FIELD_PHOTO, "base64 string", other)),
    };

    Ok(Record {
        id,
        name: required_string(fields, FIELD_NAME)?,
        brand: required_string(fields, FIELD_BRAND)?,
        category: required_string(fields, FIELD_CATEGORY)?,
        completed,
        priority,
        notes,
        due_date,
        created_at,
        photo,
    })
}

fn encode_timestamp(value: DateTime<Utc>) -> Value {
    Value::String(value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

fn decode_timestamp(field: &str, value: &Value) -> Result<DateTime<Utc>> {
    match value {
        Value::String(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|error| Error::Decode(format!("field `{field}`: {error}"))),
        Value::Number(number) => {
            let seconds = number
                .as_f64()
                .ok_or_else(|| type_error(field, "timestamp", value))?;
            reference_date_timestamp(seconds)
                .ok_or_else(|| Error::Decode(format!("field `{field}` is out of range")))
        }
        other => Err(type_error(field, "timestamp", other)),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn reference_date_timestamp(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let millis = (seconds * 1000.0).round();
    if millis.abs() > 1.0e15 {
        return None;
    }
    let millis = millis as i64;
    Utc.timestamp_millis_opt(REFERENCE_DATE_UNIX_SECS * 1000 + millis)
        .single()
}

fn required_string(fields: &Map<String, Value>, field: &str) -> Result<String> {
    match fields.get(field) {
        Some(Value::String(value)) => Ok(value.clone()),
        None | Some(Value::Null) => Err(missing(field)),
        Some(other) => Err(type_error(field, "string", other)),
    }
}

fn missing(field: &str) -> Error {
    Error::Decode(format!("missing required field `{field}`"))
}

fn type_error(field: &str, expected: &str, found: &Value) -> Error {
    let kind = match found {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    Error::Decode(format!("field `{field}` expected {expected}, found {kind}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_record() -> Record {
        Record {
            id: RecordId::new(),
            name: "iPhone 15 Pro".to_string(),
            brand: "Apple".to_string(),
            category: "📱 Smartphone".to_string(),
            completed: false,
            priority: Priority::Urgent,
            notes: "Camera and performance".to_string(),
            due_date: None,
            created_at: Utc::now(),
            photo: None,
        }
    }

    fn document(fields: Value) -> RemoteDocument {
        let Value::Object(fields) = fields else {
            panic!("expected a JSON object");
        };
        RemoteDocument::new("doc-1", fields)
    }

    #[test]
    fn test_roundtrip_without_optional_fields() {
        let record = sample_record();
        let decoded = decode_document(&encode_record(&record)).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_roundtrip_with_due_date_and_photo() {
        let mut record = sample_record();
        record.completed = true;
        record.priority = Priority::Low;
        record.due_date = Some(Utc::now() + Duration::days(3));
        record.photo = Some(Photo::new(vec![0xFF, 0xD8, 0xFF, 0xE0]));

        let encoded = encode_record(&record);
        assert_eq!(encoded.id, record.id.as_str());
        assert!(encoded.fields.contains_key(FIELD_DUE_DATE));
        assert!(encoded.fields.contains_key(FIELD_PHOTO));

        let decoded = decode_document(&encoded).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_roundtrip_with_due_date_only() {
        let mut record = sample_record();
        record.due_date = Some(Utc::now() + Duration::days(7));

        let encoded = encode_record(&record);
        assert!(encoded.fields.contains_key(FIELD_DUE_DATE));
        assert!(!encoded.fields.contains_key(FIELD_PHOTO));

        let decoded = decode_document(&encoded).unwrap();
        assert_eq!(decoded, record);
        assert!(decoded.photo.is_none());
    }

    #[test]
    fn test_roundtrip_with_photo_only() {
        let mut record = sample_record();
        record.photo = Some(Photo::new(vec![0x89, 0x50, 0x4E, 0x47]));

        let encoded = encode_record(&record);
        assert!(!encoded.fields.contains_key(FIELD_DUE_DATE));
        assert!(encoded.fields.contains_key(FIELD_PHOTO));

        let decoded = decode_document(&encoded).unwrap();
        assert_eq!(decoded, record);
        assert!(decoded.due_date.is_none());
    }

    #[test]
    fn test_absent_optionals_are_not_written() {
        let encoded = encode_record(&sample_record());
        assert!(!encoded.fields.contains_key(FIELD_DUE_DATE));
        assert!(!encoded.fields.contains_key(FIELD_PHOTO));
    }

    #[test]
    fn test_missing_required_field_fails() {
        let doc = document(json!({
            "brand": "Apple",
            "category": "Phone",
            "createdDate": "2025-01-01T10:00:00Z",
        }));
        assert!(matches!(decode_document(&doc), Err(Error::Decode(_))));

        let doc = document(json!({
            "name": "iPhone",
            "brand": "Apple",
            "category": "Phone",
        }));
        assert!(matches!(decode_document(&doc), Err(Error::Decode(_))));
    }

    #[test]
    fn test_optional_fields_default_when_absent() {
        let doc = document(json!({
            "name": "Worx Landroid",
            "brand": "Worx",
            "category": "Robot Mower",
            "createdDate": "2025-01-01T10:00:00Z",
            "someFutureField": 42,
        }));
        let record = decode_document(&doc).unwrap();
        assert_eq!(record.id.as_str(), "doc-1");
        assert!(!record.completed);
        assert_eq!(record.priority, Priority::Medium);
        assert!(record.notes.is_empty());
        assert!(record.due_date.is_none());
        assert!(record.photo.is_none());
    }

    #[test]
    fn test_unknown_priority_is_coerced() {
        let doc = document(json!({
            "name": "Anker PowerCore",
            "brand": "Anker",
            "category": "Battery",
            "priority": "ASAP!!",
            "createdDate": "2025-01-01T10:00:00Z",
        }));
        assert_eq!(decode_document(&doc).unwrap().priority, Priority::Medium);

        let doc = document(json!({
            "name": "Anker PowerCore",
            "brand": "Anker",
            "category": "Battery",
            "priority": 3,
            "createdDate": "2025-01-01T10:00:00Z",
        }));
        assert_eq!(decode_document(&doc).unwrap().priority, Priority::Medium);
    }

    #[test]
    fn test_legacy_reference_date_timestamps() {
        let doc = document(json!({
            "name": "MacBook Air M2",
            "brand": "Apple",
            "category": "Computer",
            "createdDate": 0.0,
            "dueDate": 86_400.5,
        }));
        let record = decode_document(&doc).unwrap();
        assert_eq!(
            record.created_at,
            Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            record.due_date.unwrap(),
            Utc.with_ymd_and_hms(2001, 1, 2, 0, 0, 0).unwrap() + Duration::milliseconds(500)
        );
    }

    #[test]
    fn test_wrong_types_fail() {
        let doc = document(json!({
            "name": "Roomba",
            "brand": "iRobot",
            "category": "Vacuum",
            "isCompleted": "yes",
            "createdDate": "2025-01-01T10:00:00Z",
        }));
        assert!(decode_document(&doc).is_err());

        let doc = document(json!({
            "name": "Roomba",
            "brand": "iRobot",
            "category": "Vacuum",
            "createdDate": "yesterday",
        }));
        assert!(decode_document(&doc).is_err());
    }
}
