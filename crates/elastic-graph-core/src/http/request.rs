//! HTTP request parsing (spec.md §4.I): the three accepted request forms,
//! header normalization, and the request-handling contract's error table.

use std::collections::HashMap;

use serde_json::Value;

/// Case/separator-insensitive header normalization (spec.md §8 property 5):
/// `Content-Type`, `content-type`, `CONTENT_TYPE`, … all normalize to
/// `CONTENT-TYPE`.
pub fn normalize_header_name(name: &str) -> String {
    name.to_ascii_uppercase().replace('_', "-")
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    headers: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn new(
        method: impl Into<String>,
        headers: impl IntoIterator<Item = (String, String)>,
        query_params: HashMap<String, String>,
        body: Vec<u8>,
    ) -> Self {
        let headers = headers
            .into_iter()
            .map(|(k, v)| (normalize_header_name(&k), v))
            .collect();
        HttpRequest {
            method: method.into(),
            headers,
            query_params,
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&normalize_header_name(name)).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        let body = serde_json::json!({ "errors": [{ "message": message.into() }] }).to_string();
        HttpResponse { status, body }
    }
}

/// The request-handling contract's error table (spec.md §4.I).
#[derive(Debug, Clone, thiserror::Error)]
pub enum HttpError {
    #[error("GraphQL only supports GET and POST requests.")]
    MethodNotAllowed,
    #[error("`{content_type}` is not a supported content type. Supported content types are `application/json` and `application/graphql`.")]
    UnsupportedContentType { content_type: String },
    #[error("Request body is invalid JSON.")]
    InvalidJsonBody,
    #[error("Variables are invalid JSON.")]
    InvalidVariablesJson,
    #[error("`variables` must be a JSON object but was not.")]
    VariablesNotObject,
    #[error("`{header}` header value of `{value}` is invalid")]
    InvalidTimeoutHeader { header: String, value: String },
}

impl HttpError {
    pub fn status(&self) -> u16 {
        match self {
            HttpError::MethodNotAllowed => 405,
            HttpError::UnsupportedContentType { .. } => 415,
            HttpError::InvalidJsonBody
            | HttpError::InvalidVariablesJson
            | HttpError::VariablesNotObject
            | HttpError::InvalidTimeoutHeader { .. } => 400,
        }
    }

    pub fn into_response(self) -> HttpResponse {
        HttpResponse::error(self.status(), self.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphQlRequestBody {
    pub query: String,
    pub variables: Option<Value>,
    pub operation_name: Option<String>,
}

/// Parses a request into its GraphQL document form (spec.md §4.I).
pub fn parse(request: &HttpRequest) -> Result<GraphQlRequestBody, HttpError> {
    match request.method.to_ascii_uppercase().as_str() {
        "GET" => parse_get(request),
        "POST" => parse_post(request),
        _ => Err(HttpError::MethodNotAllowed),
    }
}

fn parse_get(request: &HttpRequest) -> Result<GraphQlRequestBody, HttpError> {
    let query = request.query_params.get("query").cloned().unwrap_or_default();
    let variables = match request.query_params.get("variables") {
        Some(raw) if !raw.is_empty() => {
            let value: Value = serde_json::from_str(raw).map_err(|_| HttpError::InvalidVariablesJson)?;
            Some(require_object(value)?)
        }
        _ => None,
    };
    let operation_name = non_empty(request.query_params.get("operationName").cloned());
    Ok(GraphQlRequestBody {
        query,
        variables,
        operation_name,
    })
}

fn parse_post(request: &HttpRequest) -> Result<GraphQlRequestBody, HttpError> {
    let content_type = request.header("Content-Type").unwrap_or("").to_string();
    let media_type = content_type.split(';').next().unwrap_or("").trim();
    if media_type.eq_ignore_ascii_case("application/json") {
        let body: Value =
            serde_json::from_slice(&request.body).map_err(|_| HttpError::InvalidJsonBody)?;
        let query = body
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let variables = match body.get("variables").cloned() {
            Some(Value::Null) | None => None,
            Some(value) => Some(require_object(value)?),
        };
        let operation_name = non_empty(
            body.get("operationName")
                .and_then(Value::as_str)
                .map(str::to_string),
        );
        Ok(GraphQlRequestBody {
            query,
            variables,
            operation_name,
        })
    } else if media_type.eq_ignore_ascii_case("application/graphql") {
        let query = String::from_utf8_lossy(&request.body).to_string();
        Ok(GraphQlRequestBody {
            query,
            variables: None,
            operation_name: None,
        })
    } else {
        Err(HttpError::UnsupportedContentType { content_type })
    }
}

fn require_object(value: Value) -> Result<Value, HttpError> {
    if value.is_object() {
        Ok(value)
    } else {
        Err(HttpError::VariablesNotObject)
    }
}

/// Empty `operationName` is treated as absent (spec.md §4.I).
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// `min(header, configured_max)`, in milliseconds (spec.md §4.I, §8
/// property 6). `None` when no header is present.
pub fn resolve_timeout_ms(request: &HttpRequest, configured_max_ms: u64) -> Result<u64, HttpError> {
    match request.header("ElasticGraph-Request-Timeout-Ms") {
        None => Ok(configured_max_ms),
        Some(raw) => {
            let requested: u64 = raw.parse().map_err(|_| HttpError::InvalidTimeoutHeader {
                header: "ElasticGraph-Request-Timeout-Ms".to_string(),
                value: raw.to_string(),
            })?;
            Ok(requested.min(configured_max_ms))
        }
    }
}

/// Recursively prunes keys with null values from `variables` (spec.md
/// §4.I step 1: lenient schema evolution treats a null variable as absent).
pub fn prune_null_variables(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            for v in map.values_mut() {
                prune_null_variables(v);
            }
        }
        Value::Array(items) => {
            for item in items {
                prune_null_variables(item);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn header_normalization_is_case_and_separator_insensitive() {
        for variant in ["Content-Type", "content-type", "CONTENT-TYPE", "CONTENT_TYPE", "content_type"] {
            assert_eq!(normalize_header_name(variant), "CONTENT-TYPE");
        }
    }

    #[test]
    fn s1_post_json_success_parses_query() {
        let request = HttpRequest::new(
            "POST",
            [("Content-Type".to_string(), "application/json".to_string())],
            HashMap::new(),
            br#"{"query":"query { widgets { __typename } }"}"#.to_vec(),
        );
        let parsed = parse(&request).unwrap();
        assert_eq!(parsed.query, "query { widgets { __typename } }");
        assert!(parsed.variables.is_none());
    }

    #[test]
    fn s2_post_json_malformed_body() {
        let request = HttpRequest::new(
            "POST",
            [("Content-Type".to_string(), "application/json".to_string())],
            HashMap::new(),
            b"not json".to_vec(),
        );
        let err = parse(&request).unwrap_err();
        assert!(matches!(err, HttpError::InvalidJsonBody));
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn s3_post_wrong_content_type_mentions_both_supported_types() {
        let request = HttpRequest::new(
            "POST",
            [("Content-Type".to_string(), "text/json".to_string())],
            HashMap::new(),
            Vec::new(),
        );
        let err = parse(&request).unwrap_err();
        assert_eq!(err.status(), 415);
        assert!(err.to_string().contains("application/json"));
        assert!(err.to_string().contains("application/graphql"));
    }

    #[test]
    fn s4_delete_is_method_not_allowed() {
        let request = HttpRequest::new("DELETE", [], HashMap::new(), Vec::new());
        let err = parse(&request).unwrap_err();
        assert_eq!(err.status(), 405);
    }

    #[test]
    fn get_with_invalid_variables_json() {
        let mut params = HashMap::new();
        params.insert("query".to_string(), "{ widgets { __typename } }".to_string());
        params.insert("variables".to_string(), "not json".to_string());
        let request = HttpRequest::new("GET", [], params, Vec::new());
        let err = parse(&request).unwrap_err();
        assert!(matches!(err, HttpError::InvalidVariablesJson));
    }

    #[test]
    fn variables_present_but_not_an_object_is_rejected() {
        let mut params = HashMap::new();
        params.insert("query".to_string(), "{ widgets { __typename } }".to_string());
        params.insert("variables".to_string(), "[1,2,3]".to_string());
        let request = HttpRequest::new("GET", [], params, Vec::new());
        let err = parse(&request).unwrap_err();
        assert!(matches!(err, HttpError::VariablesNotObject));
    }

    #[test]
    fn empty_operation_name_is_treated_as_absent() {
        let mut params = HashMap::new();
        params.insert("query".to_string(), "{ widgets }".to_string());
        params.insert("operationName".to_string(), String::new());
        let request = HttpRequest::new("GET", [], params, Vec::new());
        let parsed = parse(&request).unwrap();
        assert_eq!(parsed.operation_name, None);
    }

    #[test]
    fn timeout_header_is_capped_at_the_configured_max() {
        let request = HttpRequest::new(
            "POST",
            [("ElasticGraph-Request-Timeout-Ms".to_string(), "50000".to_string())],
            HashMap::new(),
            Vec::new(),
        );
        assert_eq!(resolve_timeout_ms(&request, 10_000).unwrap(), 10_000);
    }

    #[test]
    fn invalid_timeout_header_is_rejected() {
        let request = HttpRequest::new(
            "POST",
            [("ElasticGraph-Request-Timeout-Ms".to_string(), "soon".to_string())],
            HashMap::new(),
            Vec::new(),
        );
        let err = resolve_timeout_ms(&request, 10_000).unwrap_err();
        assert!(matches!(err, HttpError::InvalidTimeoutHeader { .. }));
    }

    #[test]
    fn null_variables_are_pruned_recursively() {
        let mut value = json!({"a": 1, "b": null, "c": {"d": null, "e": 2}});
        prune_null_variables(&mut value);
        assert_eq!(value, json!({"a": 1, "c": {"e": 2}}));
    }
}
