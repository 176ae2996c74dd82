//! `Type` (spec.md §3, §4.B): the wrapped-type arithmetic layer. A GraphQL
//! field's type is a composition of zero or more `List`/`NonNull` wrappers
//! around a single named type, and the two wrappers compose in either
//! order (`[Widget!]` vs `[Widget]!` vs `[Widget!]!`).
//!
//! Predicates follow the convention spelled out in spec.md §4.B: *do*
//! auto-unwrap non-null (a list of Ts and a non-null list of Ts are both
//! "collections"), do *not* auto-unwrap list (a list of objects is not
//! itself an object) — see [`SchemaModel::is_object`] and friends in
//! `super::model`.

use std::sync::Arc;

/// Interned type name; cheap to clone, used as the schema's identity-map key.
pub type TypeName = Arc<str>;

/// A field's type reference: a named type plus zero or more wrappers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Named(TypeName),
    NonNull(Box<Type>),
    List(Box<Type>),
}

impl Type {
    pub fn named(name: impl Into<TypeName>) -> Self {
        Type::Named(name.into())
    }

    pub fn non_null(self) -> Self {
        Type::NonNull(Box::new(self))
    }

    pub fn list(self) -> Self {
        Type::List(Box::new(self))
    }

    pub fn nullable(&self) -> bool {
        !matches!(self, Type::NonNull(_))
    }

    /// Drops exactly one outer non-null layer.
    pub fn unwrap_non_null(&self) -> Type {
        match self {
            Type::NonNull(inner) => (**inner).clone(),
            other => other.clone(),
        }
    }

    /// Drops one list layer, and any outer non-null guarding it. Leaves the
    /// type unchanged if there is no list layer to drop.
    pub fn unwrap_list(&self) -> Type {
        match self {
            Type::List(inner) => (**inner).clone(),
            Type::NonNull(inner) => match inner.as_ref() {
                Type::List(list_inner) => (**list_inner).clone(),
                _ => self.clone(),
            },
            Type::Named(_) => self.clone(),
        }
    }

    /// `true` for any composition that has a list layer, regardless of an
    /// outer non-null (predicates auto-unwrap non-null, never list).
    pub fn is_list(&self) -> bool {
        match self {
            Type::List(_) => true,
            Type::NonNull(inner) => inner.is_list(),
            Type::Named(_) => false,
        }
    }

    /// Strips every outer non-null layer without touching list layers.
    pub fn strip_non_null(&self) -> &Type {
        match self {
            Type::NonNull(inner) => inner.strip_non_null(),
            other => other,
        }
    }

    /// Strips every `List`/`NonNull` wrapper down to the named type. Does
    /// *not* descend into relay connections; see
    /// [`super::model::SchemaModel::fully_unwrap`] for that.
    pub fn strip_wrappers(&self) -> &TypeName {
        match self {
            Type::Named(name) => name,
            Type::NonNull(inner) => inner.strip_wrappers(),
            Type::List(inner) => inner.strip_wrappers(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Scalar,
    Enum,
    Object,
    Interface,
    Union,
    Input,
}

/// Category tags carried on a named type (spec.md §3). These drive search
/// index resolution and relay-connection unwrapping without hard-coding
/// type names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryTags {
    pub relay_connection: bool,
    pub relay_edge: bool,
    pub indexed_aggregation: bool,
    pub scalar_aggregated_values: bool,
}

/// A datastore index (or rolling alias) a type's documents live in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    pub search_index_expression: String,
    /// `None` when the index has been configured without a queryable
    /// cluster; its type is then hidden from queries (spec.md §4.B).
    pub queryable_cluster: Option<String>,
    pub uses_custom_routing: bool,
    pub rollover_timestamp_field: Option<String>,
}

/// The in-memory projection of a single named GraphQL type plus its
/// index/runtime metadata (spec.md §3).
#[derive(Debug, Clone)]
pub struct TypeDefinition {
    pub name: TypeName,
    pub kind: TypeKind,
    pub category: CategoryTags,
    pub index_definitions: Vec<IndexDefinition>,
    /// For union/interface types: the member type names to delegate
    /// `search_index_definitions` resolution to.
    pub member_types: Vec<TypeName>,
    /// For `indexed_aggregation` types: the underlying document type whose
    /// indices and queryability this type defers to (spec.md §4.B).
    pub aggregation_source_type: Option<TypeName>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> Type {
        Type::named("Widget")
    }

    #[test]
    fn unwrap_non_null_drops_exactly_one_layer() {
        let t = widget().non_null();
        assert!(t.unwrap_non_null().nullable());
    }

    #[test]
    fn unwrap_list_drops_list_and_outer_non_null() {
        let t = widget().list().non_null();
        let unwrapped = t.unwrap_list();
        assert_eq!(unwrapped, widget());
    }

    #[test]
    fn unwrap_list_is_identity_without_a_list_layer() {
        let t = widget().non_null();
        assert_eq!(t.unwrap_list(), t);
    }

    #[test]
    fn is_list_auto_unwraps_non_null_but_not_vice_versa() {
        assert!(widget().list().non_null().is_list());
        assert!(widget().non_null().list().is_list());
        assert!(!widget().non_null().is_list());
    }

    #[test]
    fn strip_wrappers_reaches_the_named_type() {
        let t = widget().non_null().list().non_null();
        assert_eq!(&*t.strip_wrappers() as &str, "Widget");
    }
}
