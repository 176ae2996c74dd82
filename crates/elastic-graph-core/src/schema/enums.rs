//! `EnumValue` (spec.md §3): an enum member plus whatever runtime metadata
//! the schema-artifact generator attached to it — a sort clause for sort
//! enums, or a datastore grouping/unit value for grouping and distance-unit
//! enums.

use serde_json::{json, Value};

use super::types::TypeName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone)]
pub enum EnumValueMetadata {
    /// A sort enum value, e.g. `CREATED_AT_ASC`.
    Sort { field_path: String, order: SortOrder },
    /// A grouping/unit enum value, e.g. a distance unit (`MILE` -> `"mi"`).
    DatastoreValue {
        value: Value,
        /// A short form used by operators like `near`'s `max_distance`
        /// (spec.md §4.E), e.g. `"mi"` for miles.
        abbreviation: Option<String>,
    },
    Plain,
}

#[derive(Debug, Clone)]
pub struct EnumValue {
    pub name: String,
    pub owning_type: TypeName,
    pub metadata: EnumValueMetadata,
}

impl EnumValue {
    /// Materializes a sort enum value into its boolean-query sort clause
    /// (spec.md §3): `{field_path: {order: asc|desc}}`.
    pub fn sort_clause(&self) -> Option<Value> {
        match &self.metadata {
            EnumValueMetadata::Sort { field_path, order } => {
                Some(json!({ field_path.clone(): { "order": order.as_str() } }))
            }
            _ => None,
        }
    }

    pub fn datastore_value(&self) -> Option<&Value> {
        match &self.metadata {
            EnumValueMetadata::DatastoreValue { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn abbreviation(&self) -> Option<&str> {
        match &self.metadata {
            EnumValueMetadata::DatastoreValue { abbreviation, .. } => abbreviation.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_enum_materializes_its_clause() {
        let value = EnumValue {
            name: "CREATED_AT_DESC".to_string(),
            owning_type: TypeName::from("WidgetSortOrder"),
            metadata: EnumValueMetadata::Sort {
                field_path: "created_at".to_string(),
                order: SortOrder::Desc,
            },
        };
        assert_eq!(
            value.sort_clause().unwrap(),
            json!({"created_at": {"order": "desc"}})
        );
    }

    #[test]
    fn unit_enum_exposes_abbreviation() {
        let value = EnumValue {
            name: "MILE".to_string(),
            owning_type: TypeName::from("DistanceUnit"),
            metadata: EnumValueMetadata::DatastoreValue {
                value: json!("mi"),
                abbreviation: Some("mi".to_string()),
            },
        };
        assert_eq!(value.abbreviation(), Some("mi"));
    }
}
