//! On-disk representation of a document

use std::collections::HashSet;
use thiserror::Error;

use crate::document::RecordDatabase;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Duplicate record key: {0}")]
    DuplicateKey(String),
}

/// Converts between file bytes and the structured form
pub trait DocumentFormat: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<RecordDatabase, FormatError>;

    fn write(&self, database: &RecordDatabase) -> Result<Vec<u8>, FormatError>;
}

/// JSON documents of the shape
/// `{"preamble": "...", "records": [{"key": .., "type": .., "fields": {..}}]}`
///
/// Layout and trailing whitespace inside values are not semantic: two files
/// that differ only in those parse to equal databases.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDocumentFormat;

impl DocumentFormat for JsonDocumentFormat {
    fn parse(&self, bytes: &[u8]) -> Result<RecordDatabase, FormatError> {
        let mut database: RecordDatabase = serde_json::from_slice(bytes)?;

        let mut seen = HashSet::new();
        for record in &mut database.records {
            if !seen.insert(record.key.clone()) {
                return Err(FormatError::DuplicateKey(record.key.clone()));
            }
            for value in record.fields.values_mut() {
                let len = value.trim_end().len();
                value.truncate(len);
            }
        }
        if let Some(preamble) = database.preamble.as_mut() {
            let len = preamble.trim_end().len();
            preamble.truncate(len);
        }

        Ok(database)
    }

    fn write(&self, database: &RecordDatabase) -> Result<Vec<u8>, FormatError> {
        let mut bytes = serde_json::to_vec_pretty(database)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Record;

    #[test]
    fn test_parse_records() {
        let json = br#"{
            "records": [
                {"key": "knuth1984", "type": "book", "fields": {"title": "The TeXbook"}}
            ]
        }"#;

        let db = JsonDocumentFormat.parse(json).unwrap();

        assert_eq!(db.len(), 1);
        assert_eq!(db.records[0].kind, "book");
        assert_eq!(db.records[0].field("title"), Some("The TeXbook"));
        assert!(db.preamble.is_none());
    }

    #[test]
    fn test_layout_is_not_semantic() {
        let compact = br#"{"records":[{"key":"a","type":"misc","fields":{"note":"x"}}]}"#;
        let spread = b"{\n  \"records\": [\n    {\"fields\": {\"note\": \"x   \"}, \"key\": \"a\", \"type\": \"misc\"}\n  ]\n}\n\n";

        assert_eq!(
            JsonDocumentFormat.parse(compact).unwrap(),
            JsonDocumentFormat.parse(spread).unwrap()
        );
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let db = JsonDocumentFormat
            .parse(br#"{"records":[{"key":"a","type":"misc"}]}"#)
            .unwrap();
        assert!(db.records[0].fields.is_empty());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let json = br#"{"records":[{"key":"a","type":"misc"},{"key":"a","type":"book"}]}"#;
        match JsonDocumentFormat.parse(json) {
            Err(FormatError::DuplicateKey(key)) => assert_eq!(key, "a"),
            other => panic!("Expected duplicate key error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            JsonDocumentFormat.parse(b"{\"records\": ["),
            Err(FormatError::Json(_))
        ));
    }

    #[test]
    fn test_write_is_parseable() {
        let mut db = RecordDatabase::with_records(vec![Record::new("a", "misc").with_field("note", "x")]);
        db.preamble = Some("@preamble".to_string());

        let bytes = JsonDocumentFormat.write(&db).unwrap();

        assert_eq!(JsonDocumentFormat.parse(&bytes).unwrap(), db);
    }
}
