//! The schema model (spec.md §4.B): resolves type and field lookups, exposes
//! kind predicates, and provides `search_index_definitions` for any type,
//! following union/interface membership and aggregation-to-source-document
//! delegation. Built once at process start from pre-generated schema
//! artifacts and immutable thereafter (spec.md §3 Lifecycle); every lookup
//! is memoized.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use strsim::levenshtein;

use crate::errors::NotFoundError;

use super::enums::{EnumValue, EnumValueMetadata};
use super::fields::{Field, ListStorage, RelationDirection, RelationMetadata};
use super::types::{CategoryTags, IndexDefinition, Type, TypeDefinition, TypeKind, TypeName};

const MAX_SUGGESTIONS: usize = 3;

#[derive(Debug)]
pub struct SchemaModel {
    types: HashMap<TypeName, TypeDefinition>,
    fields: HashMap<(TypeName, String), Field>,
    enum_values: HashMap<(TypeName, String), EnumValue>,
    /// Memoized per spec.md §4.B ("memoize every lookup"). The schema is
    /// immutable after construction, so a type's search indices never
    /// change after the first resolution.
    search_index_cache: DashMap<TypeName, Arc<Vec<IndexDefinition>>>,
}

impl SchemaModel {
    pub fn builder() -> SchemaModelBuilder {
        SchemaModelBuilder::default()
    }

    pub fn type_definition(&self, name: &str) -> Result<&TypeDefinition, NotFoundError> {
        self.types
            .get(name)
            .ok_or_else(|| self.not_found("type", name, self.types.keys().map(|k| k.as_ref())))
    }

    pub fn field(&self, type_name: &str, field_name: &str) -> Result<&Field, NotFoundError> {
        self.fields
            .get(&(TypeName::from(type_name), field_name.to_string()))
            .ok_or_else(|| {
                self.not_found(
                    "field",
                    &format!("{type_name}.{field_name}"),
                    self.fields
                        .keys()
                        .filter(|(t, _)| t.as_ref() == type_name)
                        .map(|(_, f)| f.as_str()),
                )
            })
    }

    pub fn enum_value(&self, type_name: &str, value_name: &str) -> Result<&EnumValue, NotFoundError> {
        self.enum_values
            .get(&(TypeName::from(type_name), value_name.to_string()))
            .ok_or_else(|| {
                self.not_found(
                    "enum value",
                    &format!("{type_name}.{value_name}"),
                    self.enum_values
                        .keys()
                        .filter(|(t, _)| t.as_ref() == type_name)
                        .map(|(_, v)| v.as_str()),
                )
            })
    }

    fn not_found<'a>(
        &self,
        kind: &'static str,
        name: &str,
        candidates: impl Iterator<Item = &'a str>,
    ) -> NotFoundError {
        let mut scored: Vec<(usize, &str)> =
            candidates.map(|c| (levenshtein(name, c), c)).collect();
        scored.sort_by_key(|(distance, _)| *distance);
        let suggestions = scored
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|(_, name)| name.to_string())
            .collect();
        NotFoundError {
            kind,
            name: name.to_string(),
            suggestions,
        }
    }

    // -- Wrapping arithmetic that needs schema lookups (spec.md §4.B) --

    /// Strips `List`/`NonNull` wrappers, and — if the resulting named type
    /// is a relay connection — continues into `edges.node` and strips
    /// again, repeating until a non-connection named type is reached.
    pub fn fully_unwrap(&self, ty: &Type) -> Type {
        let bare = Type::Named(ty.strip_wrappers().clone());
        match self.type_definition(bare.strip_wrappers()) {
            Ok(def) if def.category.relay_connection => {
                let edges = self
                    .field(&def.name, "edges")
                    .expect("a relay connection type always has an `edges` field");
                let node = self
                    .field(edges.resolved_type.strip_wrappers(), "node")
                    .expect("a relay edge type always has a `node` field");
                self.fully_unwrap(&node.resolved_type)
            }
            _ => bare,
        }
    }

    pub fn is_object(&self, ty: &Type) -> bool {
        self.kind_of(ty) == Some(TypeKind::Object)
    }

    pub fn is_abstract(&self, ty: &Type) -> bool {
        matches!(self.kind_of(ty), Some(TypeKind::Interface) | Some(TypeKind::Union))
    }

    /// Auto-unwraps non-null but never list (spec.md §4.B convention).
    pub fn is_collection(&self, ty: &Type) -> bool {
        ty.is_list()
    }

    pub fn is_embedded_object(&self, ty: &Type) -> bool {
        self.is_object(ty) && !self.is_indexed_document(ty)
    }

    pub fn is_indexed_document(&self, ty: &Type) -> bool {
        match self.type_definition(ty.strip_non_null().strip_wrappers()) {
            Ok(def) => !def.index_definitions.is_empty() || def.aggregation_source_type.is_some(),
            Err(_) => false,
        }
    }

    pub fn is_relay_connection(&self, ty: &Type) -> bool {
        self.category_of(ty).map(|c| c.relay_connection).unwrap_or(false)
    }

    pub fn is_relay_edge(&self, ty: &Type) -> bool {
        self.category_of(ty).map(|c| c.relay_edge).unwrap_or(false)
    }

    fn kind_of(&self, ty: &Type) -> Option<TypeKind> {
        self.type_definition(ty.strip_non_null().strip_wrappers())
            .ok()
            .map(|d| d.kind)
    }

    fn category_of(&self, ty: &Type) -> Option<CategoryTags> {
        self.type_definition(ty.strip_non_null().strip_wrappers())
            .ok()
            .map(|d| d.category)
    }

    /// `true` iff every backing index is configured without a queryable
    /// cluster (spec.md §4.B). Aggregation types delegate to their source
    /// document type so queryability tracks the underlying data.
    pub fn hidden_from_queries_type(&self, type_name: &str) -> bool {
        match self.type_definition(type_name) {
            Ok(def) if def.aggregation_source_type.is_some() => {
                self.hidden_from_queries_type(def.aggregation_source_type.as_ref().unwrap())
            }
            Ok(def) => {
                let indices = self.search_index_definitions(type_name);
                !indices.is_empty() && indices.iter().all(|idx| idx.queryable_cluster.is_none())
            }
            Err(_) => false,
        }
    }

    pub fn hidden_from_queries_field(&self, type_name: &str, field_name: &str) -> bool {
        match self.field(type_name, field_name) {
            Ok(field) => {
                let unwrapped = self.fully_unwrap(&field.resolved_type);
                self.hidden_from_queries_type(unwrapped.strip_wrappers())
            }
            Err(_) => false,
        }
    }

    /// Resolves the backing search indices for any type: its own, the union
    /// of its members' for interfaces/unions, or its source document type's
    /// for `indexed_aggregation` types (spec.md §4.B). Memoized.
    pub fn search_index_definitions(&self, type_name: &str) -> Arc<Vec<IndexDefinition>> {
        if let Some(cached) = self.search_index_cache.get(type_name) {
            return Arc::clone(&cached);
        }
        let resolved = Arc::new(self.compute_search_index_definitions(type_name));
        self.search_index_cache
            .insert(TypeName::from(type_name), Arc::clone(&resolved));
        resolved
    }

    fn compute_search_index_definitions(&self, type_name: &str) -> Vec<IndexDefinition> {
        let Ok(def) = self.type_definition(type_name) else {
            return Vec::new();
        };
        if let Some(source) = &def.aggregation_source_type {
            return self.compute_search_index_definitions(source);
        }
        if !def.index_definitions.is_empty() {
            return def.index_definitions.clone();
        }
        def.member_types
            .iter()
            .flat_map(|member| self.search_index_definitions(member).as_ref().clone())
            .collect()
    }
}

#[derive(Default)]
pub struct SchemaModelBuilder {
    types: HashMap<TypeName, TypeDefinition>,
    fields: HashMap<(TypeName, String), Field>,
    enum_values: HashMap<(TypeName, String), EnumValue>,
}

impl SchemaModelBuilder {
    pub fn add_type(mut self, def: TypeDefinition) -> Self {
        self.types.insert(def.name.clone(), def);
        self
    }

    pub fn add_field(mut self, field: Field) -> Self {
        self.fields
            .insert((field.parent_type.clone(), field.name.clone()), field);
        self
    }

    pub fn add_enum_value(mut self, value: EnumValue) -> Self {
        self.enum_values
            .insert((value.owning_type.clone(), value.name.clone()), value);
        self
    }

    pub fn build(self) -> SchemaModel {
        SchemaModel {
            types: self.types,
            fields: self.fields,
            enum_values: self.enum_values,
            search_index_cache: DashMap::new(),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;

    /// A small fixed schema used by unit tests across the `schema` and
    /// `filter` modules: `Widget` is an indexed document with a `name`
    /// field, an outbound `manufacturer` relation, and an inbound `parts`
    /// relation; `Manufacturer` and `Part` are indexed documents too.
    pub fn widget_schema() -> SchemaModel {
        SchemaModel::builder()
            .add_type(TypeDefinition {
                name: TypeName::from("Widget"),
                kind: TypeKind::Object,
                category: CategoryTags::default(),
                index_definitions: vec![IndexDefinition {
                    search_index_expression: "widgets".to_string(),
                    queryable_cluster: Some("main".to_string()),
                    uses_custom_routing: false,
                    rollover_timestamp_field: None,
                }],
                member_types: Vec::new(),
                aggregation_source_type: None,
            })
            .add_type(TypeDefinition {
                name: TypeName::from("Manufacturer"),
                kind: TypeKind::Object,
                category: CategoryTags::default(),
                index_definitions: vec![IndexDefinition {
                    search_index_expression: "manufacturers".to_string(),
                    queryable_cluster: Some("main".to_string()),
                    uses_custom_routing: false,
                    rollover_timestamp_field: None,
                }],
                member_types: Vec::new(),
                aggregation_source_type: None,
            })
            .add_type(TypeDefinition {
                name: TypeName::from("Part"),
                kind: TypeKind::Object,
                category: CategoryTags::default(),
                index_definitions: vec![IndexDefinition {
                    search_index_expression: "parts".to_string(),
                    queryable_cluster: Some("main".to_string()),
                    uses_custom_routing: false,
                    rollover_timestamp_field: None,
                }],
                member_types: Vec::new(),
                aggregation_source_type: None,
            })
            .add_field(Field::new(
                "edges",
                TypeName::from("WidgetConnection"),
                Type::named("WidgetEdge").list(),
            ))
            .add_field(Field::new(
                "node",
                TypeName::from("WidgetEdge"),
                Type::named("Widget"),
            ))
            .add_field(Field::new("id", TypeName::from("Widget"), Type::named("ID").non_null()))
            .add_field(
                Field::new("name", TypeName::from("Widget"), Type::named("String"))
                    .with_name_in_index("name"),
            )
            .add_field(
                Field::new("startedAt", TypeName::from("Widget"), Type::named("String"))
                    .with_name_in_index("started_at"),
            )
            .add_field(Field::new(
                "manufacturer",
                TypeName::from("Widget"),
                Type::named("Manufacturer"),
            ).with_relation(RelationMetadata {
                foreign_key: "manufacturer_id".to_string(),
                direction: RelationDirection::Out,
                additional_filter: None,
                foreign_key_nested_paths: Vec::new(),
            }))
            .add_field(
                Field::new("manufacturer_id", TypeName::from("Widget"), Type::named("ID"))
                    .with_name_in_index("manufacturer_id"),
            )
            .add_field(
                Field::new("seasons", TypeName::from("Widget"), Type::named("Season").list())
                    .with_name_in_index("seasons")
                    .with_list_storage(ListStorage::Nested),
            )
            .add_type(TypeDefinition {
                name: TypeName::from("Season"),
                kind: TypeKind::Object,
                category: CategoryTags::default(),
                index_definitions: Vec::new(),
                member_types: Vec::new(),
                aggregation_source_type: None,
            })
            .add_field(
                Field::new("awards", TypeName::from("Season"), Type::named("String").list())
                    .with_name_in_index("awards")
                    .with_list_storage(ListStorage::Nested),
            )
            .add_type(TypeDefinition {
                name: TypeName::from("DistanceUnit"),
                kind: TypeKind::Enum,
                category: CategoryTags::default(),
                index_definitions: Vec::new(),
                member_types: Vec::new(),
                aggregation_source_type: None,
            })
            .add_enum_value(EnumValue {
                name: "MILE".to_string(),
                owning_type: TypeName::from("DistanceUnit"),
                metadata: EnumValueMetadata::DatastoreValue {
                    value: serde_json::json!("mi"),
                    abbreviation: Some("mi".to_string()),
                },
            })
            .add_enum_value(EnumValue {
                name: "KILOMETER".to_string(),
                owning_type: TypeName::from("DistanceUnit"),
                metadata: EnumValueMetadata::DatastoreValue {
                    value: serde_json::json!("km"),
                    abbreviation: Some("km".to_string()),
                },
            })
            .add_type(TypeDefinition {
                name: TypeName::from("WidgetConnection"),
                kind: TypeKind::Object,
                category: CategoryTags {
                    relay_connection: true,
                    ..Default::default()
                },
                index_definitions: Vec::new(),
                member_types: Vec::new(),
                aggregation_source_type: None,
            })
            .add_type(TypeDefinition {
                name: TypeName::from("WidgetEdge"),
                kind: TypeKind::Object,
                category: CategoryTags {
                    relay_edge: true,
                    ..Default::default()
                },
                index_definitions: Vec::new(),
                member_types: Vec::new(),
                aggregation_source_type: None,
            })
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::widget_schema;
    use super::*;

    #[test]
    fn fully_unwrapped_relay_connection_reaches_the_node_type() {
        let schema = widget_schema();
        let ty = Type::named("WidgetConnection").non_null();
        let unwrapped = schema.fully_unwrap(&ty);
        assert_eq!(unwrapped, Type::named("Widget"));
    }

    #[test]
    fn collection_predicate_does_not_auto_unwrap_list() {
        let schema = widget_schema();
        assert!(schema.is_collection(&Type::named("Widget").list()));
        assert!(!schema.is_object(&Type::named("Widget").list()));
        assert!(schema.is_object(&Type::named("Widget").non_null()));
    }

    #[test]
    fn not_found_suggests_closest_known_type() {
        let schema = widget_schema();
        let err = schema.type_definition("Widgt").unwrap_err();
        assert!(err.suggestions.contains(&"Widget".to_string()));
    }

    #[test]
    fn search_index_definitions_are_memoized_and_stable() {
        let schema = widget_schema();
        let first = schema.search_index_definitions("Widget");
        let second = schema.search_index_definitions("Widget");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn hidden_from_queries_when_no_cluster_is_queryable() {
        let schema = SchemaModel::builder()
            .add_type(TypeDefinition {
                name: TypeName::from("Secret"),
                kind: TypeKind::Object,
                category: CategoryTags::default(),
                index_definitions: vec![IndexDefinition {
                    search_index_expression: "secrets".to_string(),
                    queryable_cluster: None,
                    uses_custom_routing: false,
                    rollover_timestamp_field: None,
                }],
                member_types: Vec::new(),
                aggregation_source_type: None,
            })
            .build();
        assert!(schema.hidden_from_queries_type("Secret"));
    }
}
