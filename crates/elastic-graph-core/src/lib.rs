//! Pure-computation core of the gateway: schema model, cursor codec,
//! field-path tracking, filter compilation, query building, search routing,
//! response shaping, and relation joins. No I/O lives here; the gateway
//! binary crate drives HTTP and the datastore client around it.

pub mod cursor;
pub mod errors;
pub mod executor;
pub mod field_path;
pub mod filter;
pub mod http;
pub mod query;
pub mod relation;
pub mod response;
pub mod router;
pub mod schema;
pub mod schema_element_names;

pub use cursor::{DecodedCursor, Factory as CursorFactory, NullFactory as NullCursorFactory};
pub use executor::{EngineResult, ExecutorContext, GraphQlEngine, QueryExecutor};
pub use field_path::FieldPath;
pub use schema::SchemaModel;
pub use schema_element_names::SchemaElementNames;
