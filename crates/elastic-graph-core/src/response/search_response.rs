//! `SearchResponse` (spec.md §4.H): wraps
//! `{hits: {hits: [...], total: {value, relation}}, aggregations?}`.

use serde_json::Value;

use crate::errors::CountUnavailableError;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse {
    documents: Vec<Value>,
    total_document_count: Option<u64>,
    aggregations: Option<Value>,
}

impl SearchResponse {
    pub fn new(documents: Vec<Value>, total_document_count: Option<u64>, aggregations: Option<Value>) -> Self {
        SearchResponse {
            documents,
            total_document_count,
            aggregations,
        }
    }

    /// The canonical empty response (spec.md §4.H): used by empty queries
    /// and as the "blank" value in relation joins where the parent document
    /// lacks a foreign key.
    pub fn empty() -> Self {
        SearchResponse {
            documents: Vec::new(),
            total_document_count: Some(0),
            aggregations: None,
        }
    }

    /// Parses the datastore's raw `{hits: {...}}` wire shape.
    pub fn from_raw(raw: &Value) -> Self {
        let hits = raw.get("hits");
        let documents = hits
            .and_then(|h| h.get("hits"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let total_document_count = hits
            .and_then(|h| h.get("total"))
            .and_then(|t| t.get("value"))
            .and_then(Value::as_u64);
        let aggregations = raw.get("aggregations").cloned();
        SearchResponse {
            documents,
            total_document_count,
            aggregations,
        }
    }

    pub fn documents(&self) -> &[Value] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Fails with [`CountUnavailableError`] unless the caller opted into
    /// `track_total_hits` on the originating query (spec.md §4.H).
    pub fn total_document_count(&self) -> Result<u64, CountUnavailableError> {
        self.total_document_count.ok_or(CountUnavailableError)
    }

    pub fn aggregations(&self) -> Option<&Value> {
        self.aggregations.as_ref()
    }

    /// A view excluding `hits.hits` and `aggregations`, safe to log without
    /// duplicating potentially large document payloads in memory.
    pub fn metadata(&self) -> Value {
        serde_json::json!({
            "document_count": self.documents.len(),
            "total_document_count": self.total_document_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_raw_hits_shape() {
        let raw = json!({
            "hits": {"hits": [{"_id": "1"}, {"_id": "2"}], "total": {"value": 2, "relation": "eq"}}
        });
        let response = SearchResponse::from_raw(&raw);
        assert_eq!(response.len(), 2);
        assert_eq!(response.total_document_count().unwrap(), 2);
    }

    #[test]
    fn count_unavailable_when_not_tracked() {
        let raw = json!({"hits": {"hits": []}});
        let response = SearchResponse::from_raw(&raw);
        assert!(response.total_document_count().is_err());
    }

    #[test]
    fn canonical_empty_response_has_zero_count_and_no_documents() {
        let response = SearchResponse::empty();
        assert!(response.is_empty());
        assert_eq!(response.total_document_count().unwrap(), 0);
    }
}
