//! Relation join / nested-resolver glue (spec.md §4.J): turns a parent
//! document's relation field into the query needed to fetch the related
//! document(s), and normalizes what comes back.

pub mod join;

pub use join::{Cardinality, RelationJoin};
