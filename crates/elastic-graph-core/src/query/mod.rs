//! Datastore query builder (spec.md §4.F): the value representing a single
//! logical datastore query, ready for the search router to batch and send.

pub mod builder;

pub use builder::{DatastoreQuery, DatastoreQueryBuilder};
