//! `SchemaElementNames` (spec.md §3): a translation layer between the
//! canonical, internal spelling of every filter operator / GraphQL argument
//! and the user-configured wire spelling (snake_case or camelCase).
//!
//! All filter compilation and sort-enum parsing consult this indirection
//! instead of hard-coding a spelling, so a schema author can pick either
//! naming convention for their GraphQL API.

use std::collections::HashMap;

use strum::{EnumIter, IntoEnumIterator};

/// Every canonical name the core needs to translate. Adding a variant here
/// and to [`CanonicalName::default_snake_case`] is the only change needed to
/// introduce a new renameable element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum CanonicalName {
    Filter,
    EqualToAnyOf,
    AnySatisfy,
    Not,
    AllOf,
    AnyOf,
    OrderBy,
    Near,
    TimeOfDay,
    Matches,
    MatchesQuery,
    MatchesPhrase,
    Gt,
    Gte,
    Lt,
    Lte,
    Unit,
    Latitude,
    Longitude,
    MaxDistance,
    Query,
    Phrase,
    AllowedEditsPerTerm,
    RequireAllTerms,
    TimeZone,
    EgLatencySlo,
    Ms,
    Count,
}

impl CanonicalName {
    fn default_snake_case(self) -> &'static str {
        match self {
            CanonicalName::Filter => "filter",
            CanonicalName::EqualToAnyOf => "equal_to_any_of",
            CanonicalName::AnySatisfy => "any_satisfy",
            CanonicalName::Not => "not",
            CanonicalName::AllOf => "all_of",
            CanonicalName::AnyOf => "any_of",
            CanonicalName::OrderBy => "order_by",
            CanonicalName::Near => "near",
            CanonicalName::TimeOfDay => "time_of_day",
            CanonicalName::Matches => "matches",
            CanonicalName::MatchesQuery => "matches_query",
            CanonicalName::MatchesPhrase => "matches_phrase",
            CanonicalName::Gt => "gt",
            CanonicalName::Gte => "gte",
            CanonicalName::Lt => "lt",
            CanonicalName::Lte => "lte",
            CanonicalName::Unit => "unit",
            CanonicalName::Latitude => "latitude",
            CanonicalName::Longitude => "longitude",
            CanonicalName::MaxDistance => "max_distance",
            CanonicalName::Query => "query",
            CanonicalName::Phrase => "phrase",
            CanonicalName::AllowedEditsPerTerm => "allowed_edits_per_term",
            CanonicalName::RequireAllTerms => "require_all_terms",
            CanonicalName::TimeZone => "time_zone",
            CanonicalName::EgLatencySlo => "eg_latency_slo",
            CanonicalName::Ms => "ms",
            CanonicalName::Count => "count",
        }
    }

    fn to_camel_case(snake: &str) -> String {
        let mut result = String::with_capacity(snake.len());
        let mut capitalize_next = false;
        for ch in snake.chars() {
            if ch == '_' {
                capitalize_next = true;
            } else if capitalize_next {
                result.extend(ch.to_uppercase());
                capitalize_next = false;
            } else {
                result.push(ch);
            }
        }
        result
    }
}

/// Wire-spelling convention a schema can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingConvention {
    SnakeCase,
    CamelCase,
}

/// The resolved mapping from canonical name to wire spelling, plus the
/// reverse index used when classifying an incoming filter key.
#[derive(Debug, Clone)]
pub struct SchemaElementNames {
    canonical_to_wire: HashMap<CanonicalName, String>,
    wire_to_canonical: HashMap<String, CanonicalName>,
}

impl SchemaElementNames {
    /// Builds the mapping for a naming convention, applying any explicit
    /// overrides (a schema author may rename an individual element without
    /// switching the whole schema's convention).
    pub fn new(convention: NamingConvention, overrides: &HashMap<&str, &str>) -> Self {
        let mut canonical_to_wire = HashMap::new();
        let mut wire_to_canonical = HashMap::new();
        for name in CanonicalName::iter() {
            let snake = name.default_snake_case();
            let wire = overrides.get(snake).map(|s| s.to_string()).unwrap_or_else(|| {
                match convention {
                    NamingConvention::SnakeCase => snake.to_string(),
                    NamingConvention::CamelCase => CanonicalName::to_camel_case(snake),
                }
            });
            wire_to_canonical.insert(wire.clone(), name);
            canonical_to_wire.insert(name, wire);
        }
        SchemaElementNames {
            canonical_to_wire,
            wire_to_canonical,
        }
    }

    pub fn snake_case() -> Self {
        Self::new(NamingConvention::SnakeCase, &HashMap::new())
    }

    pub fn camel_case() -> Self {
        Self::new(NamingConvention::CamelCase, &HashMap::new())
    }

    /// The user-facing spelling for a canonical element.
    pub fn wire_name(&self, name: CanonicalName) -> &str {
        // Every `CanonicalName` variant is populated at construction time by
        // iterating `CanonicalName::iter()`, so this lookup cannot miss.
        self.canonical_to_wire
            .get(&name)
            .expect("all canonical names are populated at construction")
    }

    /// Resolves an incoming wire key (a filter hash key, a sort-enum
    /// argument name, …) back to its canonical meaning, if any.
    pub fn resolve(&self, wire_name: &str) -> Option<CanonicalName> {
        self.wire_to_canonical.get(wire_name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_round_trips() {
        let names = SchemaElementNames::snake_case();
        assert_eq!(names.wire_name(CanonicalName::EqualToAnyOf), "equal_to_any_of");
        assert_eq!(
            names.resolve("equal_to_any_of"),
            Some(CanonicalName::EqualToAnyOf)
        );
    }

    #[test]
    fn camel_case_translates() {
        let names = SchemaElementNames::camel_case();
        assert_eq!(names.wire_name(CanonicalName::EqualToAnyOf), "equalToAnyOf");
        assert_eq!(names.wire_name(CanonicalName::AnySatisfy), "anySatisfy");
        assert_eq!(
            names.resolve("equalToAnyOf"),
            Some(CanonicalName::EqualToAnyOf)
        );
    }

    #[test]
    fn explicit_override_wins_over_convention() {
        let mut overrides = HashMap::new();
        overrides.insert("time_of_day", "timeOfDayLocal");
        let names = SchemaElementNames::new(NamingConvention::CamelCase, &overrides);
        assert_eq!(names.wire_name(CanonicalName::TimeOfDay), "timeOfDayLocal");
    }

    #[test]
    fn unknown_wire_name_resolves_to_none() {
        let names = SchemaElementNames::snake_case();
        assert_eq!(names.resolve("totally_unknown"), None);
    }
}
