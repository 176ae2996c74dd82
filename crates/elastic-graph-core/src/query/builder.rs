//! Datastore query builder (spec.md §4.F).

use serde_json::Value;

const DEFAULT_TIE_BREAKER_FIELD: &str = "id";

/// A single logical datastore query, independent of which cluster/index
/// it eventually targets (spec.md §4.F).
#[derive(Debug, Clone, PartialEq)]
pub struct DatastoreQuery {
    pub search_index_expression: String,
    pub shard_routing_values: Vec<String>,
    pub filters: Vec<Value>,
    pub sort: Vec<Value>,
    pub size: usize,
    pub from: Option<usize>,
    pub search_after: Option<Vec<Value>>,
    pub aggregations: Option<Value>,
    pub source_includes: Vec<String>,
    pub track_total_hits: bool,
    pub monotonic_clock_deadline: Option<std::time::Instant>,
}

impl DatastoreQuery {
    /// Queries requesting no document fields and no total count do no
    /// useful work at the datastore (spec.md §4.F); the router skips them.
    pub fn is_empty(&self) -> bool {
        self.source_includes.is_empty() && !self.track_total_hits && self.aggregations.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct DatastoreQueryBuilder {
    search_index_expression: String,
    shard_routing_values: Vec<String>,
    filters: Vec<Value>,
    sort: Vec<Value>,
    requested_page_size: Option<usize>,
    default_page_size: usize,
    max_page_size: usize,
    from: Option<usize>,
    search_after: Option<Vec<Value>>,
    aggregations: Option<Value>,
    source_includes: Vec<String>,
    track_total_hits: bool,
    monotonic_clock_deadline: Option<std::time::Instant>,
}

impl DatastoreQueryBuilder {
    pub fn new(
        search_index_expression: impl Into<String>,
        default_page_size: usize,
        max_page_size: usize,
    ) -> Self {
        DatastoreQueryBuilder {
            search_index_expression: search_index_expression.into(),
            shard_routing_values: Vec::new(),
            filters: Vec::new(),
            sort: Vec::new(),
            requested_page_size: None,
            default_page_size,
            max_page_size,
            from: None,
            search_after: None,
            aggregations: None,
            source_includes: Vec::new(),
            track_total_hits: false,
            monotonic_clock_deadline: None,
        }
    }

    pub fn with_filters(mut self, filters: Vec<Value>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_sort(mut self, sort: Vec<Value>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_page_size(mut self, size: usize) -> Self {
        self.requested_page_size = Some(size);
        self
    }

    pub fn with_search_after(mut self, values: Vec<Value>) -> Self {
        self.search_after = Some(values);
        self
    }

    pub fn with_source_includes(mut self, fields: Vec<String>) -> Self {
        self.source_includes = fields;
        self
    }

    pub fn with_track_total_hits(mut self, track: bool) -> Self {
        self.track_total_hits = track;
        self
    }

    pub fn with_shard_routing_values(mut self, values: Vec<String>) -> Self {
        self.shard_routing_values = values;
        self
    }

    pub fn with_deadline(mut self, deadline: std::time::Instant) -> Self {
        self.monotonic_clock_deadline = Some(deadline);
        self
    }

    /// `size` is the requested page size, defaulted and capped (spec.md
    /// §4.F); the sort list always gets a deterministic `id asc`
    /// tie-breaker appended when not already present, so cursor pagination
    /// stays stable across documents with identical sort values.
    pub fn build(self) -> DatastoreQuery {
        let size = self
            .requested_page_size
            .unwrap_or(self.default_page_size)
            .min(self.max_page_size);

        let mut sort = self.sort;
        let has_tie_breaker = sort.iter().any(|clause| {
            clause
                .as_object()
                .map(|o| o.contains_key(DEFAULT_TIE_BREAKER_FIELD))
                .unwrap_or(false)
        });
        if !has_tie_breaker {
            sort.push(serde_json::json!({ DEFAULT_TIE_BREAKER_FIELD: { "order": "asc" } }));
        }

        DatastoreQuery {
            search_index_expression: self.search_index_expression,
            shard_routing_values: self.shard_routing_values,
            filters: self.filters,
            sort,
            size,
            from: self.from,
            search_after: self.search_after,
            aggregations: self.aggregations,
            source_includes: self.source_includes,
            track_total_hits: self.track_total_hits,
            monotonic_clock_deadline: self.monotonic_clock_deadline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_defaults_and_caps() {
        let query = DatastoreQueryBuilder::new("widgets", 10, 100).build();
        assert_eq!(query.size, 10);

        let query = DatastoreQueryBuilder::new("widgets", 10, 100)
            .with_page_size(500)
            .build();
        assert_eq!(query.size, 100);
    }

    #[test]
    fn sort_gains_a_deterministic_tie_breaker() {
        let query = DatastoreQueryBuilder::new("widgets", 10, 100)
            .with_sort(vec![serde_json::json!({"created_at": {"order": "desc"}})])
            .build();
        assert_eq!(
            query.sort,
            vec![
                serde_json::json!({"created_at": {"order": "desc"}}),
                serde_json::json!({"id": {"order": "asc"}})
            ]
        );
    }

    #[test]
    fn existing_id_sort_is_not_duplicated() {
        let query = DatastoreQueryBuilder::new("widgets", 10, 100)
            .with_sort(vec![serde_json::json!({"id": {"order": "desc"}})])
            .build();
        assert_eq!(query.sort.len(), 1);
    }

    #[test]
    fn query_with_no_fields_and_no_count_is_empty() {
        let query = DatastoreQueryBuilder::new("widgets", 10, 100).build();
        assert!(query.is_empty());

        let query = DatastoreQueryBuilder::new("widgets", 10, 100)
            .with_track_total_hits(true)
            .build();
        assert!(!query.is_empty());
    }
}
