//! Gateway library: configuration, the `reqwest`-backed datastore client,
//! the `async-graphql` engine, and the `axum` HTTP app. `main.rs` is a thin
//! wrapper that boots these and calls `axum::serve`, mirroring the
//! teacher's own binary/library split.

pub mod config;
pub mod datastore_client;
pub mod engine;
pub mod http_app;
