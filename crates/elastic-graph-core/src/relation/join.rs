//! `RelationJoin` (spec.md §4.J): the query-shape and normalization glue
//! between a parent document's relation field and the remote documents it
//! resolves to.

use serde_json::Value;

use crate::schema::{Field, RelationDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

#[derive(Debug, Clone)]
pub struct RelationJoin {
    /// The field read from the *local* document to build the remote query.
    pub document_id_field_name: String,
    /// The field the remote query filters on.
    pub filter_id_field_name: String,
    pub id_cardinality: Cardinality,
    pub doc_cardinality: Cardinality,
    pub additional_filter: Option<Value>,
    pub foreign_key_nested_paths: Vec<String>,
}

impl RelationJoin {
    /// Builds a join from a field's relation metadata (spec.md §4.J
    /// construction policy). `None` if the field carries no relation.
    pub fn from_field(field: &Field) -> Option<Self> {
        let relation = field.relation.as_ref()?;
        let is_list = field.resolved_type.is_list();
        let join = match relation.direction {
            RelationDirection::Out => RelationJoin {
                document_id_field_name: relation.foreign_key.clone(),
                filter_id_field_name: "id".to_string(),
                id_cardinality: if is_list { Cardinality::Many } else { Cardinality::One },
                doc_cardinality: if is_list { Cardinality::Many } else { Cardinality::One },
                additional_filter: relation.additional_filter.clone(),
                foreign_key_nested_paths: relation.foreign_key_nested_paths.clone(),
            },
            RelationDirection::In => RelationJoin {
                document_id_field_name: "id".to_string(),
                filter_id_field_name: relation.foreign_key.clone(),
                id_cardinality: Cardinality::One,
                doc_cardinality: if is_list { Cardinality::Many } else { Cardinality::One },
                additional_filter: relation.additional_filter.clone(),
                foreign_key_nested_paths: relation.foreign_key_nested_paths.clone(),
            },
        };
        Some(join)
    }

    /// Reads the join key from `document`, normalizing cardinality: warns
    /// (via `warn`) when a scalar is found where a list was expected, or
    /// vice versa, then proceeds with the best-effort normalized form
    /// (spec.md §4.J).
    pub fn extract_id_or_ids_from(&self, document: &Value, mut warn: impl FnMut(String)) -> Vec<Value> {
        let raw = document.get(&self.document_id_field_name).cloned().unwrap_or(Value::Null);
        match (&raw, self.id_cardinality) {
            (Value::Array(values), Cardinality::One) => {
                warn(format!(
                    "expected a scalar `{}` but found a list on document {document}",
                    self.document_id_field_name
                ));
                values.first().cloned().into_iter().collect()
            }
            (Value::Array(values), Cardinality::Many) => values.clone(),
            (Value::Null, _) => Vec::new(),
            (scalar, Cardinality::Many) => {
                warn(format!(
                    "expected a list `{}` but found a scalar on document {document}",
                    self.document_id_field_name
                ));
                vec![scalar.clone()]
            }
            (scalar, Cardinality::One) => vec![scalar.clone()],
        }
    }

    /// Ensures the fetched document list matches `doc_cardinality`: for a
    /// to-one relation that received more than one document, picks a
    /// deterministic minimum rather than an arbitrary one, and warns
    /// (spec.md §4.J).
    pub fn normalize_documents(&self, mut documents: Vec<Value>, mut warn: impl FnMut(String)) -> Vec<Value> {
        if self.doc_cardinality == Cardinality::Many || documents.len() <= 1 {
            return documents;
        }
        documents.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
        warn(format!(
            "to-one relation received {} documents; keeping the lexicographically smallest",
            documents.len()
        ));
        documents.truncate(1);
        documents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RelationMetadata, Type, TypeName};
    use serde_json::json;

    fn outbound_field() -> Field {
        Field::new("manufacturer", TypeName::from("Widget"), Type::named("Manufacturer")).with_relation(
            RelationMetadata {
                foreign_key: "manufacturer_id".to_string(),
                direction: RelationDirection::Out,
                additional_filter: None,
                foreign_key_nested_paths: Vec::new(),
            },
        )
    }

    fn inbound_field() -> Field {
        Field::new("parts", TypeName::from("Widget"), Type::named("Part").list()).with_relation(
            RelationMetadata {
                foreign_key: "widget_id".to_string(),
                direction: RelationDirection::In,
                additional_filter: None,
                foreign_key_nested_paths: Vec::new(),
            },
        )
    }

    #[test]
    fn outbound_join_reads_the_foreign_key_from_the_local_document() {
        let join = RelationJoin::from_field(&outbound_field()).unwrap();
        let mut warnings = Vec::new();
        let ids = join.extract_id_or_ids_from(&json!({"manufacturer_id": "m-1"}), |w| warnings.push(w));
        assert_eq!(ids, vec![json!("m-1")]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn inbound_join_always_has_scalar_id_cardinality() {
        let join = RelationJoin::from_field(&inbound_field()).unwrap();
        assert_eq!(join.id_cardinality, Cardinality::One);
        assert_eq!(join.doc_cardinality, Cardinality::Many);
    }

    #[test]
    fn to_one_relation_with_too_many_documents_keeps_a_deterministic_minimum() {
        let join = RelationJoin::from_field(&outbound_field()).unwrap();
        let mut warnings = Vec::new();
        let docs = join.normalize_documents(
            vec![json!({"id": "z"}), json!({"id": "a"})],
            |w| warnings.push(w),
        );
        assert_eq!(docs, vec![json!({"id": "a"})]);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn scalar_found_where_list_expected_warns_but_still_normalizes() {
        let field = Field::new(
            "manufacturers",
            TypeName::from("Widget"),
            Type::named("Manufacturer").list(),
        )
        .with_relation(RelationMetadata {
            foreign_key: "manufacturer_ids".to_string(),
            direction: RelationDirection::Out,
            additional_filter: None,
            foreign_key_nested_paths: Vec::new(),
        });
        let join = RelationJoin::from_field(&field).unwrap();
        assert_eq!(join.id_cardinality, Cardinality::Many);

        let mut warnings = Vec::new();
        let ids = join.extract_id_or_ids_from(&json!({"manufacturer_ids": "m-1"}), |w| warnings.push(w));
        assert_eq!(ids, vec![json!("m-1")]);
        assert_eq!(warnings.len(), 1);
    }
}
