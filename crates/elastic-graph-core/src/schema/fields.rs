//! `Field` (spec.md §3): a resolved field on an object/interface type, plus
//! whatever relation/aggregation metadata the schema-artifact generator
//! attached to it.

use super::model::SchemaModel;
use super::types::{Type, TypeName};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationDirection {
    In,
    Out,
}

/// How a list field is mapped in the datastore index (spec.md §4.E). Drives
/// whether `any_satisfy` opens a `nested` query scope or filters in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStorage {
    Nested,
    Flattened,
}

/// Relation metadata attached to a field whose resolved type is another
/// indexed document (spec.md §3, §4.J).
#[derive(Debug, Clone)]
pub struct RelationMetadata {
    pub foreign_key: String,
    pub direction: RelationDirection,
    /// An extra filter clause (already compiled, or a raw DSL fragment) the
    /// relation always applies on top of the join key, e.g. restricting an
    /// inbound relation to non-deleted documents.
    pub additional_filter: Option<serde_json::Value>,
    /// Paths the foreign key is nested under on the far side of the join,
    /// if the related type indexes the key inside a `nested` sub-document.
    pub foreign_key_nested_paths: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum AggregationComputation {
    Count,
    Sum { source_field: String },
    Min { source_field: String },
    Max { source_field: String },
    Avg { source_field: String },
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub parent_type: TypeName,
    pub resolved_type: Type,
    /// Defaults to `name`; filter/sort compilation must consult this
    /// exclusively once a field's GraphQL name diverges from it (spec.md §3
    /// invariant).
    pub name_in_index: String,
    pub relation: Option<RelationMetadata>,
    pub aggregation: Option<AggregationComputation>,
    /// `None` for non-list fields; defaults to `Nested` for list fields built
    /// via [`Field::new`], overridden with [`Field::with_list_storage`].
    pub list_storage: Option<ListStorage>,
}

impl Field {
    pub fn new(name: impl Into<String>, parent_type: TypeName, resolved_type: Type) -> Self {
        let name = name.into();
        let list_storage = resolved_type.is_list().then_some(ListStorage::Nested);
        Field {
            name_in_index: name.clone(),
            name,
            parent_type,
            resolved_type,
            relation: None,
            aggregation: None,
            list_storage,
        }
    }

    pub fn with_name_in_index(mut self, name_in_index: impl Into<String>) -> Self {
        self.name_in_index = name_in_index.into();
        self
    }

    pub fn with_relation(mut self, relation: RelationMetadata) -> Self {
        self.relation = Some(relation);
        self
    }

    pub fn with_list_storage(mut self, storage: ListStorage) -> Self {
        self.list_storage = Some(storage);
        self
    }

    /// The minimal index-field projection needed to resolve this field
    /// (spec.md §3):
    /// - empty for embedded objects and relay edges/connections — those are
    ///   resolved entirely from sibling fields already in the document;
    /// - the foreign key for outbound relations;
    /// - `id` plus, for a self-referential type, the foreign key, for
    ///   inbound relations (the remote side is queried by the local `id`,
    ///   but a self-referential inbound relation may also need the foreign
    ///   key locally to disambiguate);
    /// - otherwise, `[name_in_index]`.
    pub fn index_field_names_for_resolution(&self, schema: &SchemaModel) -> Vec<String> {
        let unwrapped = schema.fully_unwrap(&self.resolved_type);
        if schema.is_embedded_object(&unwrapped)
            || schema.is_relay_edge(&unwrapped)
            || schema.is_relay_connection(&self.resolved_type)
        {
            return Vec::new();
        }
        if let Some(relation) = &self.relation {
            return match relation.direction {
                RelationDirection::Out => vec![relation.foreign_key.clone()],
                RelationDirection::In => {
                    let mut names = vec!["id".to_string()];
                    if unwrapped == Type::Named(self.parent_type.clone()) {
                        names.push(relation.foreign_key.clone());
                    }
                    names
                }
            };
        }
        vec![self.name_in_index.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::model::test_support::widget_schema;

    #[test]
    fn plain_field_resolves_via_name_in_index() {
        let schema = widget_schema();
        let field = Field::new("createdAt", TypeName::from("Widget"), Type::named("String"))
            .with_name_in_index("created_at");
        assert_eq!(field.index_field_names_for_resolution(&schema), vec!["created_at"]);
    }

    #[test]
    fn outbound_relation_resolves_via_foreign_key() {
        let schema = widget_schema();
        let field = Field::new("manufacturer", TypeName::from("Widget"), Type::named("Manufacturer"))
            .with_relation(RelationMetadata {
                foreign_key: "manufacturer_id".to_string(),
                direction: RelationDirection::Out,
                additional_filter: None,
                foreign_key_nested_paths: Vec::new(),
            });
        assert_eq!(
            field.index_field_names_for_resolution(&schema),
            vec!["manufacturer_id"]
        );
    }

    #[test]
    fn inbound_relation_resolves_via_id() {
        let schema = widget_schema();
        let field = Field::new("parts", TypeName::from("Widget"), Type::named("Part").list())
            .with_relation(RelationMetadata {
                foreign_key: "widget_id".to_string(),
                direction: RelationDirection::In,
                additional_filter: None,
                foreign_key_nested_paths: Vec::new(),
            });
        assert_eq!(field.index_field_names_for_resolution(&schema), vec!["id"]);
    }
}
