//! The schema model (spec.md §3, §4.B): types, fields, enum values, and the
//! `SchemaModel` registry that resolves lookups between them.

pub mod enums;
pub mod fields;
pub mod model;
pub mod types;

pub use enums::{EnumValue, EnumValueMetadata, SortOrder};
pub use fields::{AggregationComputation, Field, ListStorage, RelationDirection, RelationMetadata};
pub use model::{SchemaModel, SchemaModelBuilder};
pub use types::{CategoryTags, IndexDefinition, Type, TypeDefinition, TypeKind, TypeName};
