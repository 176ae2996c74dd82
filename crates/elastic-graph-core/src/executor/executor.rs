//! Query executor (spec.md §4.I): ties the HTTP boundary, the merged
//! resolution context, and the GraphQL engine together, then logs exactly
//! the fields downstream log processors expect.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::http::{self, HttpRequest, HttpResponse};
use crate::router::{DatastoreClient, QueryDetailsTracker, SearchRouter};
use crate::schema::SchemaModel;
use crate::schema_element_names::SchemaElementNames;

use super::context::{ClientResolution, ClientResolver, ExecutorContext, HeaderClientResolver};
use super::fingerprint::{NoopQueryFingerprintCache, QueryFingerprintCache};
use super::graphql_engine::{EngineResult, GraphQlEngine};

pub struct QueryExecutor<C: DatastoreClient, E: GraphQlEngine<C>> {
    schema: Arc<SchemaModel>,
    schema_element_names: Arc<SchemaElementNames>,
    search_router: Arc<SearchRouter<C>>,
    engine: E,
    client_resolver: Box<dyn ClientResolver>,
    fingerprint_cache: Box<dyn QueryFingerprintCache>,
    configured_max_timeout_ms: u64,
    slow_query_threshold_ms: u64,
}

impl<C: DatastoreClient, E: GraphQlEngine<C>> QueryExecutor<C, E> {
    pub fn new(
        schema: Arc<SchemaModel>,
        schema_element_names: Arc<SchemaElementNames>,
        search_router: Arc<SearchRouter<C>>,
        engine: E,
        configured_max_timeout_ms: u64,
        slow_query_threshold_ms: u64,
    ) -> Self {
        QueryExecutor {
            schema,
            schema_element_names,
            search_router,
            engine,
            client_resolver: Box::new(HeaderClientResolver::new("X-Client-Name")),
            fingerprint_cache: Box::new(NoopQueryFingerprintCache),
            configured_max_timeout_ms,
            slow_query_threshold_ms,
        }
    }

    pub fn with_fingerprint_cache(mut self, cache: impl QueryFingerprintCache + 'static) -> Self {
        self.fingerprint_cache = Box::new(cache);
        self
    }

    pub fn with_client_resolver(mut self, resolver: impl ClientResolver + 'static) -> Self {
        self.client_resolver = Box::new(resolver);
        self
    }

    /// Runs the full request lifecycle (spec.md §4.I): parse, resolve the
    /// client, merge context, delegate to the engine, then log.
    pub async fn handle(&self, request: HttpRequest) -> HttpResponse {
        let body = match http::parse(&request) {
            Ok(body) => body,
            Err(err) => return err.into_response(),
        };

        let client = match self.client_resolver.resolve(&request) {
            ClientResolution::Identity(identity) => identity,
            ClientResolution::ShortCircuit(response) => return response,
        };

        let timeout_ms = match http::resolve_timeout_ms(&request, self.configured_max_timeout_ms) {
            Ok(ms) => ms,
            Err(err) => return err.into_response(),
        };
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        let mut variables = body.variables.unwrap_or(Value::Object(Default::default()));
        http::prune_null_variables(&mut variables);
        let variables = (!variables.as_object().map_or(true, |m| m.is_empty())).then_some(variables);

        let tracker = Arc::new(QueryDetailsTracker::new());
        let context = ExecutorContext::new(
            request,
            client.clone(),
            Some(deadline),
            Arc::clone(&self.schema),
            Arc::clone(&self.schema_element_names),
            Arc::clone(&tracker),
            Arc::clone(&self.search_router),
        );

        let started = Instant::now();
        let result = self
            .engine
            .execute(&self.schema, &body.query, variables, body.operation_name, &context)
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        if !client.is_internal() {
            self.log_completion(&client, &body.query, &result, duration_ms, &tracker);
        }

        if result.deadline_exceeded {
            return HttpResponse::error(504, "Search exceeded requested timeout.");
        }

        let mut response = serde_json::Map::new();
        if let Some(data) = result.data.clone() {
            response.insert("data".to_string(), data);
        }
        if result.has_errors() {
            response.insert(
                "errors".to_string(),
                serde_json::to_value(&result.errors).unwrap_or(Value::Array(Vec::new())),
            );
        }
        HttpResponse {
            status: 200,
            body: Value::Object(response).to_string(),
        }
    }

    fn log_completion(
        &self,
        client: &super::context::ClientIdentity,
        query: &str,
        result: &EngineResult,
        duration_ms: u64,
        tracker: &QueryDetailsTracker,
    ) {
        let sanitized = result.sanitized_query.as_deref();
        if result.has_errors() {
            tracing::error!(
                client = %client.name,
                query = sanitized.unwrap_or("<unavailable>"),
                errors = ?result.errors,
                "GraphQL query completed with errors"
            );
        }

        let overhead_ms = tracker.overhead_ms(duration_ms);
        let slo_result = result.latency_slo_ms.map(|slo| if duration_ms <= slo { "good" } else { "bad" });
        let is_slow = duration_ms > self.slow_query_threshold_ms;

        tracing::info!(
            message_type = "ElasticGraphQueryExecutorQueryDuration",
            client = %client.name,
            query_fingerprint = self.fingerprint_cache.fingerprint(query),
            operation_name = result.operation_name.as_deref().unwrap_or(""),
            duration_ms,
            datastore_server_duration_ms = tracker.server_duration_ms(),
            overhead_ms,
            shard_routing_values = tracker.unique_shard_routing_values_joined(),
            shard_routing_value_count = tracker.unique_shard_routing_values().len(),
            search_index_expressions = ?tracker.unique_search_index_expressions(),
            datastore_request_count = tracker.datastore_request_count(),
            datastore_query_count = tracker.datastore_query_count(),
            is_slow,
            slo_result,
            "query completed"
        );

        if result.hidden_types_used {
            tracing::warn!(client = %client.name, "query resolution touched a hidden type");
        }

        if is_slow {
            tracing::warn!(
                client = %client.name,
                query = sanitized.unwrap_or("<unavailable>"),
                duration_ms,
                "slow query"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::testing::MockDatastoreClient;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct EchoEngine;

    #[async_trait]
    impl GraphQlEngine<MockDatastoreClient> for EchoEngine {
        async fn execute(
            &self,
            _schema: &SchemaModel,
            query: &str,
            _variables: Option<Value>,
            operation_name: Option<String>,
            _context: &ExecutorContext<MockDatastoreClient>,
        ) -> EngineResult {
            EngineResult {
                data: Some(serde_json::json!({ "echo": query })),
                operation_name,
                ..Default::default()
            }
        }
    }

    fn executor() -> QueryExecutor<MockDatastoreClient, EchoEngine> {
        QueryExecutor::new(
            Arc::new(crate::schema::model::test_support::widget_schema()),
            Arc::new(SchemaElementNames::snake_case()),
            Arc::new(SearchRouter::new(MockDatastoreClient::new())),
            EchoEngine,
            10_000,
            500,
        )
    }

    #[tokio::test]
    async fn successful_request_returns_200_with_data() {
        let executor = executor();
        let request = HttpRequest::new(
            "POST",
            [("Content-Type".to_string(), "application/json".to_string())],
            HashMap::new(),
            br#"{"query":"{ widgets { id } }"}"#.to_vec(),
        );
        let response = executor.handle(request).await;
        assert_eq!(response.status, 200);
        assert!(response.body.contains("widgets"));
    }

    #[tokio::test]
    async fn malformed_body_short_circuits_with_400() {
        let executor = executor();
        let request = HttpRequest::new(
            "POST",
            [("Content-Type".to_string(), "application/json".to_string())],
            HashMap::new(),
            b"not json".to_vec(),
        );
        let response = executor.handle(request).await;
        assert_eq!(response.status, 400);
    }
}
