//! `ExecutorContext` (spec.md §4.I step 2): everything the GraphQL engine
//! needs beyond the query string and variables.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::http::{HttpRequest, HttpResponse};
use crate::router::{DatastoreClient, QueryDetailsTracker, SearchRouter};
use crate::schema::SchemaModel;
use crate::schema_element_names::SchemaElementNames;

/// Who's calling, resolved from a configured header (spec.md §6). The
/// `INTERNAL` identity suppresses the executor's end-of-request logging
/// (spec.md §4.I step 4: "unless the caller is INTERNAL").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub name: String,
    internal: bool,
}

impl ClientIdentity {
    pub fn named(name: impl Into<String>) -> Self {
        ClientIdentity {
            name: name.into(),
            internal: false,
        }
    }

    pub fn internal() -> Self {
        ClientIdentity {
            name: "INTERNAL".to_string(),
            internal: true,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }
}

/// Result of resolving a client from the incoming request: either an
/// identity to proceed with, or a response that halts processing entirely
/// (spec.md §6: "used to enforce auth at the edge").
pub enum ClientResolution {
    Identity(ClientIdentity),
    ShortCircuit(HttpResponse),
}

pub trait ClientResolver: Send + Sync {
    fn resolve(&self, request: &HttpRequest) -> ClientResolution;
}

/// Reads a configured header and falls back to an anonymous identity;
/// never short-circuits. A reasonable default for deployments that enforce
/// authentication upstream of the gateway.
pub struct HeaderClientResolver {
    pub header_name: String,
}

impl HeaderClientResolver {
    pub fn new(header_name: impl Into<String>) -> Self {
        HeaderClientResolver {
            header_name: header_name.into(),
        }
    }
}

impl ClientResolver for HeaderClientResolver {
    fn resolve(&self, request: &HttpRequest) -> ClientResolution {
        let name = request.header(&self.header_name).unwrap_or("UNKNOWN").to_string();
        ClientResolution::Identity(ClientIdentity::named(name))
    }
}

/// The values merged into every request's resolution context (spec.md
/// §4.I step 2). `extensions` is the `with_context` seam described
/// there: downstream modules attach arbitrary keys without this struct's
/// shape changing under them.
pub struct ExecutorContext<C: DatastoreClient> {
    pub http_request: HttpRequest,
    pub client: ClientIdentity,
    pub monotonic_clock_deadline: Option<Instant>,
    pub schema: Arc<SchemaModel>,
    pub schema_element_names: Arc<SchemaElementNames>,
    pub query_tracker: Arc<QueryDetailsTracker>,
    pub datastore_search_router: Arc<SearchRouter<C>>,
    extensions: HashMap<String, Value>,
}

impl<C: DatastoreClient> ExecutorContext<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        http_request: HttpRequest,
        client: ClientIdentity,
        monotonic_clock_deadline: Option<Instant>,
        schema: Arc<SchemaModel>,
        schema_element_names: Arc<SchemaElementNames>,
        query_tracker: Arc<QueryDetailsTracker>,
        datastore_search_router: Arc<SearchRouter<C>>,
    ) -> Self {
        ExecutorContext {
            http_request,
            client,
            monotonic_clock_deadline,
            schema,
            schema_element_names,
            query_tracker,
            datastore_search_router,
            extensions: HashMap::new(),
        }
    }

    /// The base implementation of `with_context` yields `{http_request}`;
    /// this is how a wrapping extension module adds further keys.
    pub fn with_extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_identity_is_flagged_for_the_executor_to_skip_logging() {
        assert!(ClientIdentity::internal().is_internal());
        assert!(!ClientIdentity::named("dashboard").is_internal());
    }

    #[test]
    fn header_resolver_falls_back_to_unknown() {
        let resolver = HeaderClientResolver::new("X-Client-Name");
        let request = HttpRequest::new("GET", [], Default::default(), Vec::new());
        match resolver.resolve(&request) {
            ClientResolution::Identity(identity) => assert_eq!(identity.name, "UNKNOWN"),
            ClientResolution::ShortCircuit(_) => panic!("expected an identity"),
        }
    }
}
