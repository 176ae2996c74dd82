//! HTTP request/response boundary (spec.md §4.I, §6): parsing the three
//! accepted request forms and normalizing headers. No actual listener lives
//! here — the gateway binary crate owns the `axum` wiring; this module is
//! pure parsing so it stays testable without a socket.

pub mod request;

pub use request::{
    normalize_header_name, parse, prune_null_variables, resolve_timeout_ms, GraphQlRequestBody,
    HttpError, HttpRequest, HttpResponse,
};
