//! Query executor and HTTP endpoint glue (spec.md §4.I): the request
//! lifecycle from a parsed HTTP request through the GraphQL engine to a
//! logged, HTTP-shaped response.

pub mod context;
pub mod executor;
pub mod fingerprint;
pub mod graphql_engine;

pub use context::{ClientIdentity, ClientResolution, ClientResolver, ExecutorContext, HeaderClientResolver};
pub use executor::QueryExecutor;
pub use fingerprint::{LruQueryFingerprintCache, NoopQueryFingerprintCache, QueryFingerprintCache};
pub use graphql_engine::{EngineResult, GraphQlEngine};
