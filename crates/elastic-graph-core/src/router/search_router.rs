//! Search router (spec.md §4.G): multiplexes logical queries onto one
//! multi-search call per datastore cluster.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{RequestExceededDeadlineError, SearchFailedError};
use crate::query::DatastoreQuery;
use crate::response::SearchResponse;
use crate::router::tracker::QueryDetailsTracker;

/// The datastore HTTP boundary, abstracted so the router is testable
/// without a live cluster (spec.md §1.4 ambient test tooling).
#[async_trait]
pub trait DatastoreClient: Send + Sync {
    /// `body` is the pre-serialized NDJSON multi-search request. Returns the
    /// full decoded `{responses: [...], took}` wire shape.
    async fn multi_search(
        &self,
        cluster: &str,
        body: String,
        timeout_ms: Option<u64>,
    ) -> std::io::Result<Value>;
}

#[derive(Debug, thiserror::Error)]
pub enum SearchRouterError {
    #[error(transparent)]
    DeadlineExceeded(#[from] RequestExceededDeadlineError),
    #[error(transparent)]
    SearchFailed(#[from] SearchFailedError),
    #[error("datastore request failed: {0}")]
    Transport(String),
}

/// A logical query plus its destination cluster, keyed by an id the caller
/// uses to re-associate the response (spec.md §4.G step 4).
#[derive(Debug, Clone)]
pub struct RoutedQuery<Id> {
    pub id: Id,
    pub cluster: String,
    pub query: DatastoreQuery,
}

pub struct SearchRouter<C> {
    client: C,
}

impl<C: DatastoreClient> SearchRouter<C> {
    pub fn new(client: C) -> Self {
        SearchRouter { client }
    }

    pub async fn execute<Id>(
        &self,
        queries: Vec<RoutedQuery<Id>>,
        tracker: Option<&QueryDetailsTracker>,
    ) -> Result<HashMap<Id, SearchResponse>, SearchRouterError>
    where
        Id: Clone + Eq + Hash,
    {
        if queries.is_empty() {
            return Ok(HashMap::new());
        }

        let mut results = HashMap::new();
        let mut by_cluster: HashMap<String, Vec<RoutedQuery<Id>>> = HashMap::new();
        for routed in queries {
            if routed.query.is_empty() {
                results.insert(routed.id, SearchResponse::empty());
                continue;
            }
            by_cluster.entry(routed.cluster.clone()).or_default().push(routed);
        }

        for (cluster, routed_queries) in by_cluster {
            let batch = self.execute_cluster_batch(&cluster, routed_queries, tracker).await?;
            results.extend(batch);
        }
        Ok(results)
    }

    async fn execute_cluster_batch<Id>(
        &self,
        cluster: &str,
        routed_queries: Vec<RoutedQuery<Id>>,
        tracker: Option<&QueryDetailsTracker>,
    ) -> Result<HashMap<Id, SearchResponse>, SearchRouterError>
    where
        Id: Clone + Eq + Hash,
    {
        let now = Instant::now();
        let mut min_remaining_ms: Option<u64> = None;
        for routed in &routed_queries {
            if let Some(deadline) = routed.query.monotonic_clock_deadline {
                if deadline <= now {
                    return Err(SearchRouterError::DeadlineExceeded(RequestExceededDeadlineError {
                        overdue_ms: now.duration_since(deadline).as_millis() as i64,
                    }));
                }
                let remaining = deadline.duration_since(now).as_millis() as u64;
                min_remaining_ms = Some(min_remaining_ms.map_or(remaining, |m: u64| m.min(remaining)));
            }
        }

        let body = serialize_multi_search(&routed_queries);
        let client_started = Instant::now();
        let raw_response = self
            .client
            .multi_search(cluster, body, min_remaining_ms)
            .await
            .map_err(|e| SearchRouterError::Transport(e.to_string()))?;
        let client_duration_ms = client_started.elapsed().as_millis() as u64;

        let inner_responses = raw_response
            .get("responses")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let server_duration_ms = inner_responses
            .iter()
            .filter_map(|r| r.get("took").and_then(Value::as_u64))
            .sum();

        let mut results = HashMap::new();
        for (position, routed) in routed_queries.iter().enumerate() {
            let inner = inner_responses.get(position).cloned().unwrap_or(Value::Null);
            let status = inner.get("status").and_then(Value::as_u64).unwrap_or(200);
            if status >= 400 {
                let reason = inner
                    .get("error")
                    .and_then(|e| e.get("reason"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string();
                return Err(SearchRouterError::SearchFailed(SearchFailedError {
                    index: routed.query.search_index_expression.clone(),
                    position,
                    status: status as u16,
                    reason,
                }));
            }
            if let Some(failed) = inner.get("_shards").and_then(|s| s.get("failed")).and_then(Value::as_u64) {
                if failed > 0 {
                    tracing::warn!(
                        index = %routed.query.search_index_expression,
                        position,
                        failed_shards = failed,
                        "shard-level search failures (batch not failed)"
                    );
                }
            }
            results.insert(routed.id.clone(), SearchResponse::from_raw(&inner));
        }

        if let Some(tracker) = tracker {
            tracker.record_batch(
                routed_queries.len(),
                server_duration_ms,
                client_duration_ms,
                routed_queries.iter().map(|r| r.query.search_index_expression.clone()),
                routed_queries.iter().flat_map(|r| r.query.shard_routing_values.clone()),
            );
        }

        if std::env::var("DEBUG_QUERY").map(|v| v != "" && v != "0").unwrap_or(false) {
            tracing::debug!(cluster, request = %serde_json::to_string(&raw_response).unwrap_or_default(), "datastore multi-search");
        }

        Ok(results)
    }
}

fn serialize_multi_search<Id>(routed_queries: &[RoutedQuery<Id>]) -> String {
    let mut lines = String::new();
    for routed in routed_queries {
        let mut header = serde_json::json!({ "index": routed.query.search_index_expression });
        if !routed.query.shard_routing_values.is_empty() {
            header["routing"] = Value::String(routed.query.shard_routing_values.join(","));
        }
        lines.push_str(&header.to_string());
        lines.push('\n');
        let body = serde_json::json!({
            "query": { "bool": { "filter": routed.query.filters } },
            "sort": routed.query.sort,
            "size": routed.query.size,
            "track_total_hits": routed.query.track_total_hits,
        });
        lines.push_str(&body.to_string());
        lines.push('\n');
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::DatastoreQueryBuilder;

    struct FakeClient {
        response: Value,
    }

    #[async_trait]
    impl DatastoreClient for FakeClient {
        async fn multi_search(&self, _cluster: &str, _body: String, _timeout_ms: Option<u64>) -> std::io::Result<Value> {
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn empty_input_performs_no_io_and_returns_empty_map() {
        let router = SearchRouter::new(FakeClient {
            response: serde_json::json!({}),
        });
        let results: HashMap<&str, SearchResponse> = router.execute(Vec::new(), None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn aligns_responses_back_to_query_order() {
        let router = SearchRouter::new(FakeClient {
            response: serde_json::json!({
                "responses": [
                    {"took": 5, "hits": {"hits": [{"_id": "1"}], "total": {"value": 1}}},
                    {"took": 3, "hits": {"hits": [], "total": {"value": 0}}}
                ]
            }),
        });
        let queries = vec![
            RoutedQuery {
                id: "widgets",
                cluster: "main".to_string(),
                query: DatastoreQueryBuilder::new("widgets", 10, 50).build(),
            },
            RoutedQuery {
                id: "manufacturers",
                cluster: "main".to_string(),
                query: DatastoreQueryBuilder::new("manufacturers", 10, 50).build(),
            },
        ];
        let tracker = QueryDetailsTracker::new();
        let results = router.execute(queries, Some(&tracker)).await.unwrap();
        assert_eq!(results["widgets"].len(), 1);
        assert!(results["manufacturers"].is_empty());
        assert_eq!(tracker.datastore_query_count(), 2);
        assert_eq!(tracker.server_duration_ms(), 8);
    }

    #[tokio::test]
    async fn inner_failure_surfaces_as_search_failed_without_leaking_request_body() {
        let router = SearchRouter::new(FakeClient {
            response: serde_json::json!({
                "responses": [{"status": 500, "error": {"reason": "cluster unavailable"}}]
            }),
        });
        let queries = vec![RoutedQuery {
            id: "widgets",
            cluster: "main".to_string(),
            query: DatastoreQueryBuilder::new("widgets", 10, 50).build(),
        }];
        let err = router.execute(queries, None).await.unwrap_err();
        match err {
            SearchRouterError::SearchFailed(e) => {
                assert_eq!(e.index, "widgets");
                assert_eq!(e.reason, "cluster unavailable");
            }
            other => panic!("expected SearchFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn already_expired_deadline_is_rejected_before_any_io() {
        let router = SearchRouter::new(FakeClient {
            response: serde_json::json!({"responses": []}),
        });
        let past = Instant::now() - std::time::Duration::from_secs(5);
        let query = DatastoreQueryBuilder::new("widgets", 10, 50)
            .with_deadline(past)
            .build();
        let queries = vec![RoutedQuery {
            id: "widgets",
            cluster: "main".to_string(),
            query,
        }];
        let err = router.execute(queries, None).await.unwrap_err();
        assert!(matches!(err, SearchRouterError::DeadlineExceeded(_)));
    }
}
