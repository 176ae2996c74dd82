//! The gateway's `GraphQlEngine` (spec.md §4.I step 3): a small
//! `async-graphql` schema whose `widgets` root field drives the full
//! pipeline — filter compile (E), query build (F), search routing (G),
//! response wrapping (H) — for the indexed-document type used throughout
//! this workspace's fixtures and tests.
//!
//! A production deployment would generate this schema from the runtime
//! `SchemaModel` for every indexed type; that generation step belongs to the
//! schema-definition DSL / artifact pipeline spec.md §1 keeps out of scope.
//! This engine exists to prove the wiring end to end, not to replace that
//! generator.

use std::sync::Arc;
use std::time::Instant;

use async_graphql::{Context, EmptyMutation, EmptySubscription, Json, Object, Schema, SimpleObject};
use async_trait::async_trait;
use elastic_graph_core::cursor::{self, NullFactory};
use elastic_graph_core::filter::FilterCompiler;
use elastic_graph_core::field_path::FieldPath;
use elastic_graph_core::query::DatastoreQueryBuilder;
use elastic_graph_core::router::{DatastoreClient, QueryDetailsTracker, RoutedQuery, SearchRouter};
use elastic_graph_core::schema::SchemaModel;
use elastic_graph_core::schema_element_names::SchemaElementNames;
use elastic_graph_core::{EngineResult, ExecutorContext, GraphQlEngine};
use elastic_graph_error::{GraphQLError, GraphQLErrorExtensions};
use serde_json::Value;

use crate::datastore_client::ReqwestDatastoreClient;

/// The subset of `ExecutorContext` a resolver needs, cloned out into an
/// owned, `'static` value so it can travel through `async-graphql`'s
/// per-request context data.
#[derive(Clone)]
struct RequestContext {
    schema: Arc<SchemaModel>,
    schema_element_names: Arc<SchemaElementNames>,
    search_router: Arc<SearchRouter<ReqwestDatastoreClient>>,
    tracker: Arc<QueryDetailsTracker>,
    deadline: Option<Instant>,
    default_page_size: usize,
    max_page_size: usize,
}

/// A single `Widget` document, passed through from the datastore response
/// with a handful of named fields plus the raw JSON for anything else.
struct WidgetDocument(Value);

#[Object]
impl WidgetDocument {
    async fn id(&self) -> Option<String> {
        self.0.get("_id").and_then(Value::as_str).map(str::to_string)
    }

    async fn cursor(&self) -> String {
        let id = self.0.get("_id").cloned().unwrap_or(Value::Null);
        NullFactory.build(vec![("id".to_string(), id)]).encode()
    }

    async fn name(&self) -> Option<String> {
        self.0
            .get("_source")
            .and_then(|s| s.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// The full indexed document, for fields this demo schema doesn't name
    /// individually.
    async fn raw(&self) -> Json<Value> {
        Json(self.0.get("_source").cloned().unwrap_or(Value::Null))
    }
}

#[derive(SimpleObject)]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

struct WidgetPage {
    documents: Vec<WidgetDocument>,
    page_info: PageInfo,
}

#[Object]
impl WidgetPage {
    async fn nodes(&self) -> &Vec<WidgetDocument> {
        &self.documents
    }

    async fn page_info(&self) -> &PageInfo {
        &self.page_info
    }
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Resolves `widgets(filter, first, after)` against the `widgets` index
    /// by running it through the filter compiler, query builder, and search
    /// router in sequence.
    async fn widgets(
        &self,
        ctx: &Context<'_>,
        filter: Option<Json<Value>>,
        first: Option<i32>,
        after: Option<String>,
    ) -> async_graphql::Result<WidgetPage> {
        let request_ctx = ctx.data::<RequestContext>()?;

        let clauses = match &filter {
            Some(Json(value)) => FilterCompiler::new(&request_ctx.schema, &request_ctx.schema_element_names)
                .compile("Widget", &FieldPath::root(), value)
                .map_err(|e| async_graphql::Error::new(e.to_string()))?,
            None => Vec::new(),
        };

        let search_after = after
            .as_deref()
            .and_then(cursor::try_decode)
            .map(|decoded| decoded.sort_values().values().cloned().collect::<Vec<_>>());

        let mut builder = DatastoreQueryBuilder::new(
            "widgets",
            request_ctx.default_page_size,
            request_ctx.max_page_size,
        )
        .with_filters(clauses)
        .with_track_total_hits(true);
        if let Some(first) = first {
            builder = builder.with_page_size(first.max(0) as usize);
        }
        if let Some(search_after) = search_after {
            builder = builder.with_search_after(search_after);
        }
        if let Some(deadline) = request_ctx.deadline {
            builder = builder.with_deadline(deadline);
        }
        let query = builder.build();
        let requested_size = query.size;

        let routed = vec![RoutedQuery {
            id: "widgets",
            cluster: "main".to_string(),
            query,
        }];
        let mut responses = request_ctx
            .search_router
            .execute(routed, Some(&request_ctx.tracker))
            .await
            .map_err(|e| async_graphql::Error::new(e.to_string()))?;

        let response = responses.remove("widgets").unwrap_or_else(elastic_graph_core::response::SearchResponse::empty);
        let has_next_page = response.len() >= requested_size;
        let end_cursor = response.documents().last().map(|doc| {
            let id = doc.get("_id").cloned().unwrap_or(Value::Null);
            NullFactory.build(vec![("id".to_string(), id)]).encode()
        });

        let documents = response.documents().iter().cloned().map(WidgetDocument).collect();
        Ok(WidgetPage {
            documents,
            page_info: PageInfo { has_next_page, end_cursor },
        })
    }
}

pub type GatewaySchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

pub struct GatewayEngine {
    schema: GatewaySchema,
    default_page_size: usize,
    max_page_size: usize,
}

impl GatewayEngine {
    pub fn new(default_page_size: usize, max_page_size: usize) -> Self {
        GatewayEngine {
            schema: Schema::build(QueryRoot, EmptyMutation, EmptySubscription).finish(),
            default_page_size,
            max_page_size,
        }
    }
}

impl Default for GatewayEngine {
    fn default() -> Self {
        Self::new(10, 500)
    }
}

#[async_trait]
impl GraphQlEngine<ReqwestDatastoreClient> for GatewayEngine {
    async fn execute(
        &self,
        _schema: &SchemaModel,
        query: &str,
        variables: Option<Value>,
        operation_name: Option<String>,
        context: &ExecutorContext<ReqwestDatastoreClient>,
    ) -> EngineResult {
        let request_ctx = RequestContext {
            schema: Arc::clone(&context.schema),
            schema_element_names: Arc::clone(&context.schema_element_names),
            search_router: Arc::clone(&context.datastore_search_router),
            tracker: Arc::clone(&context.query_tracker),
            deadline: context.monotonic_clock_deadline,
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
        };

        let mut request = async_graphql::Request::new(query).data(request_ctx);
        if let Some(variables) = variables {
            request = request.variables(async_graphql::Variables::from_json(variables));
        }
        let operation_name_for_log = operation_name.clone();
        if let Some(operation_name) = operation_name {
            request = request.operation_name(operation_name);
        }

        let response = self.schema.execute(request).await;
        let deadline_exceeded = context
            .monotonic_clock_deadline
            .map(|deadline| Instant::now() > deadline)
            .unwrap_or(false);

        EngineResult {
            data: serde_json::to_value(&response.data).ok(),
            errors: response.errors.iter().map(to_graphql_error).collect(),
            operation_name: operation_name_for_log,
            sanitized_query: Some(query.to_string()),
            latency_slo_ms: None,
            hidden_types_used: false,
            deadline_exceeded,
        }
    }
}

fn to_graphql_error(error: &async_graphql::ServerError) -> GraphQLError {
    GraphQLError {
        message: error.message.clone(),
        locations: Vec::new(),
        path: None,
        extensions: GraphQLErrorExtensions {
            code: "elastic_graph.engine.execution_error".to_string(),
            service: "elastic-graph-gateway".to_string(),
            trace_id: None,
            request_id: None,
            details: std::collections::BTreeMap::new(),
        },
    }
}
