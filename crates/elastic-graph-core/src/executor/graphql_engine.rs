//! The seam between the executor and whatever actually runs a GraphQL
//! document (spec.md §4.I step 3). The core ships no GraphQL execution
//! engine of its own — it only defines the contract the gateway binary's
//! chosen engine must satisfy.

use async_trait::async_trait;
use serde_json::Value;

use elastic_graph_error::GraphQLError;

use crate::router::DatastoreClient;
use crate::schema::SchemaModel;

use super::context::ExecutorContext;

/// What a completed execution produced, plus the diagnostics the executor
/// needs to finish its end-of-request logging (spec.md §4.I step 4).
#[derive(Debug, Clone, Default)]
pub struct EngineResult {
    pub data: Option<Value>,
    pub errors: Vec<GraphQLError>,
    pub operation_name: Option<String>,
    /// The query text with literal argument values redacted, if the engine
    /// is able to produce one; used in error/slow-query log lines instead
    /// of the raw query (which may contain PII in string arguments).
    pub sanitized_query: Option<String>,
    /// The `@egLatencySlo(ms:)` value attached to the executed operation,
    /// if any.
    pub latency_slo_ms: Option<u64>,
    pub hidden_types_used: bool,
    /// Set when the monotonic deadline passed while the engine was still
    /// resolving fields; the executor maps this to a 504 instead of 200.
    pub deadline_exceeded: bool,
}

impl EngineResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Implemented by the GraphQL execution engine the gateway binary wires in.
/// The core depends only on this trait, never on a concrete GraphQL
/// implementation.
#[async_trait]
pub trait GraphQlEngine<C: DatastoreClient>: Send + Sync {
    async fn execute(
        &self,
        schema: &SchemaModel,
        query: &str,
        variables: Option<Value>,
        operation_name: Option<String>,
        context: &ExecutorContext<C>,
    ) -> EngineResult;
}
