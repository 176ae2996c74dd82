//! Builds the `axum` listener around a `QueryExecutor` (spec.md §4.I, §6:
//! `GET /?query=...`, `POST / Content-Type: application/json|application/graphql`)
//! plus the supplemented `/health` readiness endpoint.
//!
//! Kept generic over the datastore client and engine so it can be exercised
//! in tests against `elastic_graph_core::router::testing::MockDatastoreClient`
//! without a real cluster, mirroring the teacher's `TestHarness` approach to
//! standing up a router without live subgraphs.

use std::sync::Arc;

use axum::extract::{Query as AxumQuery, State};
use axum::http::{HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;
use elastic_graph_core::http::HttpRequest;
use elastic_graph_core::router::DatastoreClient;
use elastic_graph_core::{GraphQlEngine, QueryExecutor};
use tower_http::trace::TraceLayer;

struct AppState<C: DatastoreClient, E: GraphQlEngine<C>> {
    executor: Arc<QueryExecutor<C, E>>,
}

pub fn build_app<C, E>(executor: Arc<QueryExecutor<C, E>>) -> Router
where
    C: DatastoreClient + 'static,
    E: GraphQlEngine<C> + 'static,
{
    let state = Arc::new(AppState { executor });
    Router::new()
        .route("/health", get(health))
        // Every method is routed to the executor, not just GET/POST, so an
        // unsupported method (e.g. DELETE) reaches `parse()` and gets the
        // spec's 405 body instead of axum's default empty 405.
        .route("/", any(handle_graphql::<C, E>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

async fn handle_graphql<C, E>(
    State(state): State<Arc<AppState<C, E>>>,
    method: Method,
    headers: HeaderMap,
    AxumQuery(query_params): AxumQuery<std::collections::HashMap<String, String>>,
    body: axum::body::Bytes,
) -> Response
where
    C: DatastoreClient + 'static,
    E: GraphQlEngine<C> + 'static,
{
    let headers = headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
        .collect::<Vec<_>>();
    let request = HttpRequest::new(method.as_str(), headers, query_params, body.to_vec());

    let response = state.executor.handle(request).await;
    (
        axum::http::StatusCode::from_u16(response.status).unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR),
        [("Content-Type", "application/json")],
        response.body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use elastic_graph_core::executor::{EngineResult, ExecutorContext};
    use elastic_graph_core::router::testing::MockDatastoreClient;
    use elastic_graph_core::router::SearchRouter;
    use elastic_graph_core::schema::model::test_support::widget_schema;
    use elastic_graph_core::schema_element_names::SchemaElementNames;
    use serde_json::Value;
    use tower::ServiceExt;

    struct EchoEngine;

    #[async_trait]
    impl GraphQlEngine<MockDatastoreClient> for EchoEngine {
        async fn execute(
            &self,
            _schema: &elastic_graph_core::schema::SchemaModel,
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

    fn test_app() -> Router {
        let executor = QueryExecutor::new(
            Arc::new(widget_schema()),
            Arc::new(SchemaElementNames::snake_case()),
            Arc::new(SearchRouter::new(MockDatastoreClient::new())),
            EchoEngine,
            10_000,
            500,
        );
        build_app(Arc::new(executor))
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let app = test_app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn post_json_query_is_echoed_back() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("Content-Type", "application/json")
                    .body(Body::from(r#"{"query":"{ widgets { id } }"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["data"]["echo"], "{ widgets { id } }");
    }

    #[tokio::test]
    async fn unsupported_method_returns_405() {
        let app = test_app();
        let response = app
            .oneshot(Request::builder().method("DELETE").uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 405);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["errors"][0]["message"], "GraphQL only supports GET and POST requests.");
    }
}
