//! Error taxonomy from spec.md §7, implemented as `thiserror` enums.
//!
//! Each variant implements [`elastic_graph_error::GraphQlError`] so the
//! executor can turn it into a `{"errors":[...]}` response without bespoke
//! per-call-site formatting.

use std::collections::BTreeMap;

use elastic_graph_error::{register_graphql_error, GraphQlError};
use serde_json::Value;

/// Raised by the cursor decoder on malformed base64/JSON (spec.md §4.A, §7).
#[derive(Debug, thiserror::Error)]
pub enum CursorError {
    #[error("cursor is not valid base64: {0}")]
    InvalidBase64(String),
    #[error("cursor did not decode to a JSON object: {0}")]
    InvalidJson(String),
    /// Raised by the cursor factory on duplicate or malformed sort fields.
    #[error("sort field list contains duplicates: {duplicate}")]
    InvalidSortFields { duplicate: String },
    /// Raised by the cursor factory on value/field count mismatch.
    #[error("cursor factory expected {expected} values but got {actual}")]
    CursorEncoding { expected: usize, actual: usize },
}

impl GraphQlError for CursorError {
    fn error_code(&self) -> &'static str {
        match self {
            CursorError::InvalidBase64(_) | CursorError::InvalidJson(_) => {
                "elastic_graph.cursor.invalid"
            }
            CursorError::InvalidSortFields { .. } => "elastic_graph.cursor.invalid_sort_fields",
            CursorError::CursorEncoding { .. } => "elastic_graph.cursor.encoding_mismatch",
        }
    }

    fn populate_graphql_extensions(&self, extensions: &mut BTreeMap<String, Value>) {
        if let CursorError::CursorEncoding { expected, actual } = self {
            extensions.insert("expectedValueCount".to_string(), Value::from(*expected));
            extensions.insert("actualValueCount".to_string(), Value::from(*actual));
        }
    }
}

register_graphql_error!(CursorError);

/// Raised by the schema model on an unknown type/field/enum (spec.md §4.B).
#[derive(Debug, thiserror::Error)]
#[error("{kind} `{name}` not found{}", suggestion_suffix(.suggestions))]
pub struct NotFoundError {
    pub kind: &'static str,
    pub name: String,
    pub suggestions: Vec<String>,
}

fn suggestion_suffix(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {}?)", suggestions.join(", "))
    }
}

impl GraphQlError for NotFoundError {
    fn error_code(&self) -> &'static str {
        "elastic_graph.schema.not_found"
    }

    fn populate_graphql_extensions(&self, extensions: &mut BTreeMap<String, Value>) {
        extensions.insert("kind".to_string(), Value::String(self.kind.to_string()));
        extensions.insert("name".to_string(), Value::String(self.name.clone()));
        extensions.insert(
            "suggestions".to_string(),
            Value::Array(self.suggestions.iter().cloned().map(Value::String).collect()),
        );
    }
}

register_graphql_error!(NotFoundError);

/// Raised by the search router when a deadline has already passed (spec.md §4.G, §5).
#[derive(Debug, thiserror::Error)]
#[error("search exceeded requested timeout ({overdue_ms} ms past deadline)")]
pub struct RequestExceededDeadlineError {
    pub overdue_ms: i64,
}

impl GraphQlError for RequestExceededDeadlineError {
    fn error_code(&self) -> &'static str {
        "elastic_graph.search.deadline_exceeded"
    }

    fn populate_graphql_extensions(&self, extensions: &mut BTreeMap<String, Value>) {
        extensions.insert("overdueMs".to_string(), Value::from(self.overdue_ms));
    }
}

register_graphql_error!(RequestExceededDeadlineError);

/// Raised on a `status >= 400` inner response from a multi-search call
/// (spec.md §4.G, §7). Never includes the request body: queries may contain
/// PII, so only the destination index and the datastore's own reason string
/// are surfaced.
#[derive(Debug, thiserror::Error)]
#[error("search failed against index `{index}` (position {position}): {reason}")]
pub struct SearchFailedError {
    pub index: String,
    pub position: usize,
    pub status: u16,
    pub reason: String,
}

impl GraphQlError for SearchFailedError {
    fn error_code(&self) -> &'static str {
        "elastic_graph.search.failed"
    }

    fn populate_graphql_extensions(&self, extensions: &mut BTreeMap<String, Value>) {
        extensions.insert("index".to_string(), Value::String(self.index.clone()));
        extensions.insert("position".to_string(), Value::from(self.position));
        extensions.insert("status".to_string(), Value::from(self.status));
    }
}

register_graphql_error!(SearchFailedError);

/// Raised by the response accessor when `total_document_count` is read
/// without having opted into `track_total_hits` (spec.md §4.H). Indicates a
/// programmer error, not a user-facing condition.
#[derive(Debug, thiserror::Error)]
#[error("total document count was not tracked for this response")]
pub struct CountUnavailableError;

impl GraphQlError for CountUnavailableError {
    fn error_code(&self) -> &'static str {
        "elastic_graph.response.count_unavailable"
    }
}

register_graphql_error!(CountUnavailableError);

/// Raised by the datastore query builder / filter compiler / field-path
/// tracker on internal consistency violations that indicate a server bug
/// rather than a client mistake (e.g. mismatched sort/value counts upstream
/// of the cursor factory, an unknown filter operator name).
#[derive(Debug, thiserror::Error)]
pub enum FilterCompilationError {
    #[error("unknown filter operator or field name: `{name}`")]
    UnknownOperator { name: String },
    #[error("`{field}` cannot be filtered with `any_satisfy`: not a list field")]
    NotAListField { field: String },
}

impl GraphQlError for FilterCompilationError {
    fn error_code(&self) -> &'static str {
        match self {
            FilterCompilationError::UnknownOperator { .. } => {
                "elastic_graph.filter.unknown_operator"
            }
            FilterCompilationError::NotAListField { .. } => "elastic_graph.filter.not_a_list",
        }
    }

    fn populate_graphql_extensions(&self, extensions: &mut BTreeMap<String, Value>) {
        let field_name = match self {
            FilterCompilationError::UnknownOperator { name } => name,
            FilterCompilationError::NotAListField { field } => field,
        };
        extensions.insert("field".to_string(), Value::String(field_name.clone()));
    }
}

register_graphql_error!(FilterCompilationError);
