//! Filter compilation (spec.md §4.D, §4.E): turns a GraphQL filter argument
//! into the datastore's boolean query DSL, resolving field keys to their
//! `name_in_index` spelling and enum leaves to their datastore value as it
//! walks the tree.

pub mod compiler;

pub use compiler::FilterCompiler;
