//! Exercises the filter-compile -> query-build -> search-route -> response
//! pipeline end to end through `QueryExecutor::handle`, the way
//! `apollo-router/tests/integration_tests.rs` drives the router's HTTP
//! surface rather than its individual services.

use std::sync::Arc;

use async_trait::async_trait;
use elastic_graph_core::filter::FilterCompiler;
use elastic_graph_core::http::HttpRequest;
use elastic_graph_core::query::DatastoreQueryBuilder;
use elastic_graph_core::router::testing::MockDatastoreClient;
use elastic_graph_core::router::{RoutedQuery, SearchRouter};
use elastic_graph_core::schema::model::test_support::widget_schema;
use elastic_graph_core::schema::SchemaModel;
use elastic_graph_core::schema_element_names::SchemaElementNames;
use elastic_graph_core::{EngineResult, ExecutorContext, GraphQlEngine, QueryExecutor};
use serde_json::{json, Value};

/// A `GraphQlEngine` that only knows how to resolve `widgets(filter:)`,
/// enough to prove the surrounding modules cooperate without pulling in a
/// real GraphQL execution library.
struct WidgetsOnlyEngine;

#[async_trait]
impl GraphQlEngine<MockDatastoreClient> for WidgetsOnlyEngine {
    async fn execute(
        &self,
        schema: &SchemaModel,
        query: &str,
        variables: Option<Value>,
        operation_name: Option<String>,
        context: &ExecutorContext<MockDatastoreClient>,
    ) -> EngineResult {
        let filter = variables
            .as_ref()
            .and_then(|v| v.get("filter"))
            .cloned()
            .unwrap_or(Value::Null);

        let clauses = match FilterCompiler::new(schema, &context.schema_element_names).compile(
            "Widget",
            &elastic_graph_core::FieldPath::root(),
            &filter,
        ) {
            Ok(clauses) => clauses,
            Err(err) => {
                return EngineResult {
                    errors: vec![elastic_graph_error::GraphQLError {
                        message: err.to_string(),
                        locations: Vec::new(),
                        path: None,
                        extensions: Default::default(),
                    }],
                    operation_name,
                    ..Default::default()
                }
            }
        };

        let datastore_query = DatastoreQueryBuilder::new("widgets", 10, 50).with_filters(clauses).build();
        let routed = vec![RoutedQuery {
            id: "widgets",
            cluster: "main".to_string(),
            query: datastore_query,
        }];

        let mut responses = context
            .datastore_search_router
            .execute(routed, Some(&context.query_tracker))
            .await
            .expect("mock datastore never errors in this test");
        let response = responses.remove("widgets").unwrap();

        EngineResult {
            data: Some(json!({ "widgets": response.documents() })),
            operation_name,
            sanitized_query: Some(query.to_string()),
            ..Default::default()
        }
    }
}

fn executor() -> QueryExecutor<MockDatastoreClient, WidgetsOnlyEngine> {
    let client = MockDatastoreClient::new().with_response(
        "main",
        json!({
            "responses": [
                {"took": 4, "hits": {"hits": [{"_id": "w-1", "_source": {"name": "Bolt"}}], "total": {"value": 1}}}
            ]
        }),
    );
    QueryExecutor::new(
        Arc::new(widget_schema()),
        Arc::new(SchemaElementNames::snake_case()),
        Arc::new(SearchRouter::new(client)),
        WidgetsOnlyEngine,
        10_000,
        500,
    )
}

#[tokio::test]
async fn a_filtered_query_reaches_the_datastore_and_the_response_comes_back_shaped() {
    let request = HttpRequest::new(
        "POST",
        vec![("Content-Type".to_string(), "application/json".to_string())],
        Default::default(),
        json!({
            "query": "query($filter: WidgetFilterInput) { widgets(filter: $filter) { id name } }",
            "variables": { "filter": { "name": { "equal_to_any_of": ["Bolt"] } } }
        })
        .to_string()
        .into_bytes(),
    );

    let response = executor().handle(request).await;
    assert_eq!(response.status, 200);
    let body: Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["data"]["widgets"][0]["_id"], "w-1");
    assert!(body["errors"].as_array().map(Vec::is_empty).unwrap_or(true));
}

#[tokio::test]
async fn null_variables_are_pruned_before_reaching_the_engine() {
    let request = HttpRequest::new(
        "POST",
        vec![("Content-Type".to_string(), "application/json".to_string())],
        Default::default(),
        json!({
            "query": "{ widgets { id } }",
            "variables": { "filter": null }
        })
        .to_string()
        .into_bytes(),
    );

    let response = executor().handle(request).await;
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn malformed_json_body_short_circuits_with_a_400_before_touching_the_datastore() {
    let request = HttpRequest::new(
        "POST",
        vec![("Content-Type".to_string(), "application/json".to_string())],
        Default::default(),
        b"{ not json".to_vec(),
    );

    let response = executor().handle(request).await;
    assert_eq!(response.status, 400);
}
