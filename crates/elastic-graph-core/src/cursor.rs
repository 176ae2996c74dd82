//! Cursor codec (spec.md §4.A): round-trippable, sort-aware opaque
//! pagination tokens.
//!
//! The cursor is *descriptive*, not opaque to the server: it is a JSON
//! object mapping sort-field name to boundary value, base64-encoded. A
//! client may change sort direction, re-order sort components, or drop
//! trailing sort components between page requests and the server can still
//! resume, because pagination resumes by looking values up by field name,
//! not by position.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use indexmap::IndexMap;
use serde_json::Value;

use crate::errors::CursorError;

/// The sentinel string decoded to/from [`DecodedCursor::Singleton`] (spec.md
/// §3, §8 S3): used for collections of size one with no meaningful sort key.
pub const SINGLETON_CURSOR: &str = "SINGLETON_CURSOR";

/// A decoded cursor: either an ordered mapping of sort-field values, or the
/// distinguished singleton.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedCursor {
    Singleton,
    SortValues(IndexMap<String, Value>),
}

impl DecodedCursor {
    /// `{}` for the singleton, the mapping's own entries otherwise.
    pub fn sort_values(&self) -> IndexMap<String, Value> {
        match self {
            DecodedCursor::Singleton => IndexMap::new(),
            DecodedCursor::SortValues(values) => values.clone(),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            DecodedCursor::Singleton => SINGLETON_CURSOR.to_string(),
            DecodedCursor::SortValues(values) => encode_sort_values(values),
        }
    }
}

fn encode_sort_values(values: &IndexMap<String, Value>) -> String {
    // `serde_json` serializes `IndexMap` in insertion order (with the
    // `preserve_order` feature), which is the deterministic form the cursor
    // round-trip invariant (spec.md §8, property 1) depends on.
    let json = serde_json::to_string(values).expect("sort values are always serializable JSON");
    URL_SAFE_NO_PAD.encode(json)
}

/// Decodes a cursor string, returning [`DecodedCursor::Singleton`] for the
/// sentinel and an [`CursorError`] on malformed base64/JSON.
pub fn decode(cursor: &str) -> Result<DecodedCursor, CursorError> {
    if cursor == SINGLETON_CURSOR {
        return Ok(DecodedCursor::Singleton);
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|e| CursorError::InvalidBase64(e.to_string()))?;
    let values: IndexMap<String, Value> =
        serde_json::from_slice(&bytes).map_err(|e| CursorError::InvalidJson(e.to_string()))?;
    Ok(DecodedCursor::SortValues(values))
}

/// A total function: `None` on any decode failure, for call sites that want
/// to treat an invalid cursor as "no cursor" rather than surfacing an error.
pub fn try_decode(cursor: &str) -> Option<DecodedCursor> {
    decode(cursor).ok()
}

/// Builds cursors for a statically-known, ordered list of sort fields.
/// Rejects duplicate sort fields at construction time (spec.md §3 invariant:
/// "sort fields in a cursor must be unique").
#[derive(Debug, Clone)]
pub struct Factory {
    sort_fields: Vec<String>,
}

impl Factory {
    pub fn new(sort_fields: Vec<String>) -> Result<Self, CursorError> {
        let mut seen = std::collections::HashSet::new();
        for field in &sort_fields {
            if !seen.insert(field.clone()) {
                return Err(CursorError::InvalidSortFields {
                    duplicate: field.clone(),
                });
            }
        }
        Ok(Factory { sort_fields })
    }

    /// Zips `values` against the factory's sort fields in order. Fails when
    /// the counts don't match (spec.md §3 invariant).
    pub fn build(&self, values: Vec<Value>) -> Result<DecodedCursor, CursorError> {
        if values.len() != self.sort_fields.len() {
            return Err(CursorError::CursorEncoding {
                expected: self.sort_fields.len(),
                actual: values.len(),
            });
        }
        let mapping = self
            .sort_fields
            .iter()
            .cloned()
            .zip(values)
            .collect::<IndexMap<_, _>>();
        Ok(DecodedCursor::SortValues(mapping))
    }

    /// The distinguished cursor for a collection of size one with no
    /// meaningful sort key (spec.md §3, §8 property 3). Callers that know a
    /// page has exactly one element and no further pages reach for this
    /// instead of [`Factory::build`].
    pub fn singleton() -> DecodedCursor {
        DecodedCursor::Singleton
    }
}

/// Treats each value's string form as its own sort-field key; useful when
/// the sort-field schema isn't statically known ahead of building the
/// cursor (spec.md §4.A).
#[derive(Debug, Clone, Default)]
pub struct NullFactory;

impl NullFactory {
    pub fn build(&self, values: Vec<(String, Value)>) -> DecodedCursor {
        DecodedCursor::SortValues(values.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_through_encode_decode() {
        let factory = Factory::new(vec!["created_at".to_string(), "amount".to_string()]).unwrap();
        let cursor = factory
            .build(vec![json!("2019-06-12T12:33:30Z"), json!(250)])
            .unwrap();
        let encoded = cursor.encode();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn encoded_cursor_is_url_safe() {
        let factory = Factory::new(vec!["name".to_string()]).unwrap();
        let cursor = factory.build(vec![json!("hello/world+plus")]).unwrap();
        let encoded = cursor.encode();
        assert!(encoded.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
    }

    #[test]
    fn singleton_round_trips_to_sentinel() {
        let singleton = Factory::singleton();
        assert_eq!(singleton.encode(), SINGLETON_CURSOR);
        assert_eq!(decode(SINGLETON_CURSOR).unwrap(), DecodedCursor::Singleton);
        assert!(singleton.sort_values().is_empty());
    }

    #[test]
    fn factory_rejects_duplicate_sort_fields() {
        let result = Factory::new(vec!["name".to_string(), "name".to_string()]);
        assert!(matches!(result, Err(CursorError::InvalidSortFields { .. })));
    }

    #[test]
    fn factory_rejects_value_count_mismatch() {
        let factory = Factory::new(vec!["name".to_string(), "age".to_string()]).unwrap();
        let result = factory.build(vec![json!("only one")]);
        assert!(matches!(result, Err(CursorError::CursorEncoding { expected: 2, actual: 1 })));
    }

    #[test]
    fn try_decode_is_total() {
        assert!(try_decode("not valid base64 !!!").is_none());
        assert!(try_decode(&SINGLETON_CURSOR.to_lowercase()).is_none());
    }

    #[test]
    fn resuming_with_reordered_sort_list_still_decodes_by_name() {
        let factory = Factory::new(vec!["created_at".to_string(), "amount".to_string()]).unwrap();
        let cursor = factory
            .build(vec![json!("2019-06-12T12:33:30Z"), json!(250)])
            .unwrap();
        let encoded = cursor.encode();

        // A client re-requests with sort fields in a different order; the
        // server still resolves cursor values by field name.
        let decoded = decode(&encoded).unwrap();
        let values = decoded.sort_values();
        assert_eq!(values.get("amount"), Some(&json!(250)));
        assert_eq!(values.get("created_at"), Some(&json!("2019-06-12T12:33:30Z")));
    }
}
