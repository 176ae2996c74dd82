//! Converts any error into the `{"errors":[...]}` shape the GraphQL spec
//! requires for a response (spec.md §6, "Error response format").
//!
//! Individual error enums across the workspace implement [`GraphQlError`] to
//! attach a stable `error_code` and structured extensions; anything that only
//! implements `std::error::Error` still converts, falling back to
//! `INTERNAL_ERROR`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

/// Implemented by error enums that want a stable code and structured
/// GraphQL extensions instead of the `INTERNAL_ERROR` fallback.
pub trait GraphQlError: std::error::Error {
    /// A stable, dotted identifier, e.g. `elastic_graph.cursor.invalid`.
    fn error_code(&self) -> &'static str;

    /// Attach extra fields to the GraphQL error's `extensions` map.
    /// Default is a no-op; override per-variant for diagnostic detail.
    fn populate_graphql_extensions(&self, _extensions: &mut BTreeMap<String, Value>) {}
}

/// A single entry of the `errors` array in a GraphQL response.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GraphQLError {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<SourceLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
    pub extensions: GraphQLErrorExtensions,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GraphQLErrorExtensions {
    pub code: String,
    pub service: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(flatten)]
    pub details: BTreeMap<String, Value>,
}

/// Per-request context merged into a converted [`GraphQLError`].
#[derive(Debug, Clone, Default)]
pub struct GraphQLErrorContext {
    service_name: Option<String>,
    trace_id: Option<String>,
    request_id: Option<String>,
    location: Option<SourceLocation>,
    path: Vec<PathSegment>,
}

impl GraphQLErrorContext {
    pub fn builder() -> GraphQLErrorContextBuilder {
        GraphQLErrorContextBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct GraphQLErrorContextBuilder {
    inner: GraphQLErrorContext,
}

impl GraphQLErrorContextBuilder {
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.inner.service_name = Some(name.into());
        self
    }

    pub fn trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.inner.trace_id = Some(trace_id.into());
        self
    }

    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.inner.request_id = Some(request_id.into());
        self
    }

    pub fn location(mut self, line: u32, column: u32) -> Self {
        self.inner.location = Some(SourceLocation { line, column });
        self
    }

    pub fn path_field(mut self, field: impl Into<String>) -> Self {
        self.inner.path.push(PathSegment::Field(field.into()));
        self
    }

    pub fn path_index(mut self, index: usize) -> Self {
        self.inner.path.push(PathSegment::Index(index));
        self
    }

    pub fn build(self) -> GraphQLErrorContext {
        self.inner
    }
}

const DEFAULT_SERVICE_NAME: &str = "elastic-graph";
const INTERNAL_ERROR_CODE: &str = "INTERNAL_ERROR";

fn base_extensions(code: String, context: &GraphQLErrorContext) -> GraphQLErrorExtensions {
    GraphQLErrorExtensions {
        code,
        service: context
            .service_name
            .clone()
            .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
        trace_id: context.trace_id.clone(),
        request_id: context.request_id.clone(),
        details: BTreeMap::new(),
    }
}

fn finish(message: String, mut extensions: GraphQLErrorExtensions, context: &GraphQLErrorContext) -> GraphQLError {
    extensions
        .details
        .entry("errorType".to_string())
        .or_insert_with(|| Value::String(shout_case(&extensions.code)));
    GraphQLError {
        message,
        locations: context.location.into_iter().collect(),
        path: (!context.path.is_empty()).then(|| context.path.clone()),
        extensions,
    }
}

/// Turns `some.dotted.code` into `SOME_DOTTED_CODE`, the convention used for
/// the `errorType` extension key when a caller hasn't set one explicitly.
fn shout_case(code: &str) -> String {
    code.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

/// Converts any standard-library error into a [`GraphQLError`].
pub trait ToGraphQLError {
    fn to_graphql_error(&self) -> GraphQLError {
        self.to_graphql_error_with_context(GraphQLErrorContext::default())
    }

    fn to_graphql_error_with_context(&self, context: GraphQLErrorContext) -> GraphQLError;
}

// `dyn Error` downcasting is the only way to recover the structured
// `GraphQlError` impl once the concrete type has been erased behind
// `Box<dyn Error>` / `Arc<dyn Error>`, which is how errors travel
// across the tower-style service boundaries in this workspace. The shared
// logic lives here because a generic `E: ?Sized` blanket impl cannot itself
// coerce `&E` to `&dyn Error` (the compiler needs a concrete `Sized` type to
// build the vtable), so both the blanket impl below and the `dyn Error` impl
// delegate to this free function instead.
fn to_graphql_error_with_context_impl(
    self_dyn: &(dyn std::error::Error + 'static),
    context: GraphQLErrorContext,
) -> GraphQLError {
    if let Some(structured) = self_dyn.downcast_ref_graphql() {
        let mut extensions = base_extensions(structured.error_code().to_string(), &context);
        structured.populate_graphql_extensions(&mut extensions.details);
        return finish(self_dyn.to_string(), extensions, &context);
    }
    let extensions = base_extensions(INTERNAL_ERROR_CODE.to_string(), &context);
    finish(self_dyn.to_string(), extensions, &context)
}

impl<E> ToGraphQLError for E
where
    E: std::error::Error + 'static,
{
    fn to_graphql_error_with_context(&self, context: GraphQLErrorContext) -> GraphQLError {
        to_graphql_error_with_context_impl(self, context)
    }
}

impl ToGraphQLError for dyn std::error::Error {
    fn to_graphql_error_with_context(&self, context: GraphQLErrorContext) -> GraphQLError {
        to_graphql_error_with_context_impl(self, context)
    }
}

/// Narrow downcast helper: lets [`ToGraphQLError`] recover a [`GraphQlError`]
/// impl from a type-erased `&dyn std::error::Error` without every call site
/// needing to know the concrete error enum.
trait DowncastGraphQlError {
    fn downcast_ref_graphql(&self) -> Option<&dyn GraphQlErrorObject>;
}

/// Object-safe subset of [`GraphQlError`] used for the downcast above.
#[doc(hidden)]
pub trait GraphQlErrorObject {
    fn error_code(&self) -> &'static str;
    fn populate_graphql_extensions(&self, extensions: &mut BTreeMap<String, Value>);
}

impl<T: GraphQlError> GraphQlErrorObject for T {
    fn error_code(&self) -> &'static str {
        GraphQlError::error_code(self)
    }

    fn populate_graphql_extensions(&self, extensions: &mut BTreeMap<String, Value>) {
        GraphQlError::populate_graphql_extensions(self, extensions)
    }
}

impl DowncastGraphQlError for dyn std::error::Error {
    fn downcast_ref_graphql(&self) -> Option<&dyn GraphQlErrorObject> {
        // std::error::Error::downcast_ref requires knowing T at the call
        // site; since we don't, registration happens through the
        // `register_graphql_error!` macro below, which records a downcast
        // function per concrete error type the crate defines.
        for probe in inventory_iter() {
            if let Some(found) = probe(self) {
                return Some(found);
            }
        }
        None
    }
}

type DowncastProbe =
    for<'a> fn(&'a (dyn std::error::Error + 'static)) -> Option<&'a dyn GraphQlErrorObject>;

static PROBES: std::sync::OnceLock<std::sync::Mutex<Vec<DowncastProbe>>> = std::sync::OnceLock::new();

fn inventory_iter() -> Vec<DowncastProbe> {
    PROBES
        .get_or_init(|| std::sync::Mutex::new(Vec::new()))
        .lock()
        .expect("graphql error probe registry poisoned")
        .clone()
}

/// Registers a concrete error enum so [`ToGraphQLError`] can recover its
/// [`GraphQlError`] impl after it has been type-erased into
/// `Box<dyn Error>` / `Arc<dyn Error>`. Call once per error type, typically
/// right next to the `#[derive(thiserror::Error)]` enum definition.
#[macro_export]
macro_rules! register_graphql_error {
    ($ty:ty) => {
        const _: () = {
            #[$crate::__private::ctor]
            fn register() {
                $crate::register_probe(|err: &(dyn std::error::Error + 'static)| {
                    err.downcast_ref::<$ty>()
                        .map(|e| e as &dyn $crate::__private::GraphQlErrorObject)
                });
            }
        };
    };
}

#[doc(hidden)]
pub mod __private {
    pub use super::GraphQlErrorObject;
    pub use ctor::ctor;
}

#[doc(hidden)]
pub fn register_probe(probe: DowncastProbe) {
    PROBES
        .get_or_init(|| std::sync::Mutex::new(Vec::new()))
        .lock()
        .expect("graphql error probe registry poisoned")
        .push(probe);
}

pub fn box_to_graphql_error(error: &Box<dyn std::error::Error + Send + Sync>) -> GraphQLError {
    (error.as_ref() as &dyn std::error::Error).to_graphql_error()
}

pub fn arc_to_graphql_error(error: &Arc<dyn std::error::Error + Send + Sync>) -> GraphQLError {
    (error.as_ref() as &dyn std::error::Error).to_graphql_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    enum DemoError {
        #[error("bad cursor: {reason}")]
        BadCursor { reason: String },
    }

    impl GraphQlError for DemoError {
        fn error_code(&self) -> &'static str {
            "elastic_graph.demo.bad_cursor"
        }

        fn populate_graphql_extensions(&self, extensions: &mut BTreeMap<String, Value>) {
            if let DemoError::BadCursor { reason } = self {
                extensions.insert("reason".to_string(), Value::String(reason.clone()));
            }
        }
    }

    register_graphql_error!(DemoError);

    #[test]
    fn structured_error_carries_code_and_extensions() {
        let err = DemoError::BadCursor {
            reason: "bad base64".to_string(),
        };
        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(err);
        let graphql_error = box_to_graphql_error(&boxed);
        assert_eq!(graphql_error.extensions.code, "elastic_graph.demo.bad_cursor");
        assert_eq!(
            graphql_error.extensions.details.get("reason").and_then(|v| v.as_str()),
            Some("bad base64")
        );
    }

    #[test]
    fn unstructured_error_falls_back_to_internal() {
        let std_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let graphql_error = std_error.to_graphql_error();
        assert_eq!(graphql_error.extensions.code, "INTERNAL_ERROR");
        assert_eq!(graphql_error.message, "missing");
    }

    #[test]
    fn context_carries_trace_and_location() {
        let std_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let context = GraphQLErrorContext::builder()
            .service_name("elastic-graph-gateway")
            .trace_id("trace-1")
            .location(3, 9)
            .path_field("widgets")
            .build();
        let graphql_error = std_error.to_graphql_error_with_context(context);
        assert_eq!(graphql_error.extensions.service, "elastic-graph-gateway");
        assert_eq!(graphql_error.extensions.trace_id.as_deref(), Some("trace-1"));
        assert_eq!(graphql_error.locations.len(), 1);
    }
}
